//! # polybridge core
//!
//! Plain data shared by every layer of the polygon bridge:
//!
//! - [`vertex`] - the canonical GPU [`Vertex`] and the two legacy input formats
//! - [`layer`] - texture layer descriptors attached to static meshes and polys
//! - [`flags`] - legacy per-polygon render flags
//! - [`fan`] - fan triangulation of convex polygons
//! - [`math`] - legacy transforms and the matrices derived from them
//! - [`profiling`] - optional Tracy instrumentation macros

pub mod fan;
pub mod flags;
pub mod layer;
pub mod math;
pub mod profiling;
pub mod vertex;

pub use fan::{fan_triangles, triangulate_fan};
pub use flags::PolyFlags;
pub use layer::{LayerDescriptor, MAX_LAYERS, TextureId};
pub use math::{Mat4, MatrixKind, Transform, Vec3};
pub use vertex::{HwVertex, TlVertex, Vertex};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core version once at start-up.
pub fn init() {
    log::info!("polybridge core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
