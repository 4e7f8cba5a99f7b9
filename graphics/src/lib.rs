//! # polybridge graphics
//!
//! Frame-synchronized polygon batching between a legacy immediate-mode
//! driver interface and an explicit GPU API.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GpuBackend`] - capability trait for the device, queue, pipelines and surface
//! - [`DummyBackend`] - headless backend with an inspectable command log
//! - [`FramePipeline`] - per-slot fence targets and the single blocking wait
//! - [`DynamicBatch`] - fan polygons staged and drawn once per frame
//! - [`StaticBufferCache`] - handle-addressed persistent vertex buffers
//! - [`SceneDriver`] - the begin-scene / end-scene sequence tying them together
//! - [`LegacyDriver`] - the host's boolean function table over [`SceneDriver`]
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use polybridge_core::{PolyFlags, TlVertex};
//! use polybridge_graphics::{DriverConfig, DummyBackend, SceneDriver, SceneOptions};
//!
//! let mut driver = SceneDriver::new(Arc::new(DummyBackend::new()), DriverConfig::default())?;
//! driver.init()?;
//!
//! driver.begin_scene(SceneOptions::cleared())?;
//! let quad = [
//!     TlVertex::at(0.0, 0.0, 0.5),
//!     TlVertex::at(1.0, 0.0, 0.5),
//!     TlVertex::at(1.0, 1.0, 0.5),
//!     TlVertex::at(0.0, 1.0, 0.5),
//! ];
//! driver.add_polygon(&quad, PolyFlags::empty())?;
//! driver.end_scene()?;
//!
//! driver.shutdown()?;
//! # Ok::<(), polybridge_graphics::GraphicsError>(())
//! ```

pub mod backend;
pub mod batch;
pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod sync;
pub mod types;

// Re-export main types for convenience
pub use backend::{BufferId, DummyBackend, DummyGpu, GpuBackend, GpuBuffer, GpuCommand, Submission};
pub use batch::{BatchStats, DynamicBatch};
pub use cache::{INVALID_HANDLE, StaticBufferCache, StaticBufferInfo};
pub use config::DriverConfig;
pub use driver::{LegacyDriver, SceneDriver, SceneOptions, ScenePhase, SceneStats};
pub use error::GraphicsError;
pub use pipeline::FramePipeline;
pub use sync::Fence;
pub use types::{BufferDescriptor, BufferUsage, PipelineVariant, ResourceState, ScissorRect, Viewport};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the graphics version once at start-up.
pub fn init() {
    log::info!("polybridge graphics v{} initialized", VERSION);
}
