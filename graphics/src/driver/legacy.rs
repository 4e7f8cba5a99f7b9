//! Flat boolean driver surface expected by the host engine.
//!
//! The host calls the bridge through a table of plain functions that report
//! success as `bool` (static buffer creation returns a handle, 0 on failure).
//! [`LegacyDriver`] is that table as a trait. Errors are logged here, at the
//! boundary, and never cross it as panics.

use polybridge_core::math::{MatrixKind, Transform};
use polybridge_core::{HwVertex, LayerDescriptor, PolyFlags, TlVertex};

use crate::cache::INVALID_HANDLE;
use crate::error::GraphicsError;
use crate::types::Viewport;

use super::{SceneDriver, SceneOptions};

/// The host engine's driver interface.
pub trait LegacyDriver {
    fn init(&mut self) -> bool;
    fn shutdown(&mut self) -> bool;
    fn reset(&mut self) -> bool;

    fn begin_scene(
        &mut self,
        clear: bool,
        clear_depth: bool,
        wireframe: bool,
        viewport: Option<Viewport>,
    ) -> bool;
    fn end_scene(&mut self) -> bool;
    fn begin_batch(&mut self) -> bool;
    fn end_batch(&mut self) -> bool;

    fn render_gouraud_poly(&mut self, points: &[TlVertex], flags: u32) -> bool;
    fn render_world_poly(&mut self, points: &[TlVertex], layers: &[LayerDescriptor], flags: u32)
    -> bool;
    fn render_misc_texture_poly(
        &mut self,
        points: &[TlVertex],
        layer: Option<LayerDescriptor>,
        flags: u32,
    ) -> bool;

    /// Returns the new handle, or 0 on failure.
    fn add_static_buffer(&mut self, vertices: &[HwVertex], layers: &[LayerDescriptor], flags: u32)
    -> u32;
    fn remove_static_buffer(&mut self, handle: u32) -> bool;
    fn render_static_buffer(
        &mut self,
        handle: u32,
        start_vertex: u32,
        vertex_count: u32,
        transform: Option<&Transform>,
    ) -> bool;

    fn set_matrix(&mut self, kind: MatrixKind, transform: &Transform) -> bool;
    fn get_matrix(&self, kind: MatrixKind) -> Transform;
}

/// Log a failed call and collapse the result to success/failure.
fn report(operation: &str, result: Result<(), GraphicsError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            log::error!("{} failed: {}", operation, err);
            false
        }
    }
}

impl LegacyDriver for SceneDriver {
    fn init(&mut self) -> bool {
        report("init", SceneDriver::init(self))
    }

    fn shutdown(&mut self) -> bool {
        report("shutdown", SceneDriver::shutdown(self))
    }

    fn reset(&mut self) -> bool {
        report("reset", SceneDriver::reset(self))
    }

    fn begin_scene(
        &mut self,
        clear: bool,
        clear_depth: bool,
        wireframe: bool,
        viewport: Option<Viewport>,
    ) -> bool {
        let options = SceneOptions {
            clear,
            clear_depth,
            wireframe,
            viewport,
        };
        report("begin_scene", SceneDriver::begin_scene(self, options))
    }

    fn end_scene(&mut self) -> bool {
        report("end_scene", SceneDriver::end_scene(self))
    }

    fn begin_batch(&mut self) -> bool {
        report("begin_batch", SceneDriver::begin_batch(self))
    }

    fn end_batch(&mut self) -> bool {
        report("end_batch", SceneDriver::end_batch(self))
    }

    fn render_gouraud_poly(&mut self, points: &[TlVertex], flags: u32) -> bool {
        report(
            "render_gouraud_poly",
            self.add_polygon(points, PolyFlags::from_raw(flags)),
        )
    }

    fn render_world_poly(
        &mut self,
        points: &[TlVertex],
        layers: &[LayerDescriptor],
        flags: u32,
    ) -> bool {
        report(
            "render_world_poly",
            self.add_world_poly(points, layers, PolyFlags::from_raw(flags)),
        )
    }

    fn render_misc_texture_poly(
        &mut self,
        points: &[TlVertex],
        layer: Option<LayerDescriptor>,
        flags: u32,
    ) -> bool {
        report(
            "render_misc_texture_poly",
            self.add_misc_texture_poly(points, layer, PolyFlags::from_raw(flags)),
        )
    }

    fn add_static_buffer(
        &mut self,
        vertices: &[HwVertex],
        layers: &[LayerDescriptor],
        flags: u32,
    ) -> u32 {
        match self.create_static_buffer(vertices, layers, PolyFlags::from_raw(flags)) {
            Ok(handle) => handle,
            Err(err) => {
                log::error!("add_static_buffer failed: {}", err);
                INVALID_HANDLE
            }
        }
    }

    fn remove_static_buffer(&mut self, handle: u32) -> bool {
        report(
            "remove_static_buffer",
            SceneDriver::remove_static_buffer(self, handle),
        )
    }

    fn render_static_buffer(
        &mut self,
        handle: u32,
        start_vertex: u32,
        vertex_count: u32,
        transform: Option<&Transform>,
    ) -> bool {
        report(
            "render_static_buffer",
            SceneDriver::render_static_buffer(self, handle, start_vertex, vertex_count, transform),
        )
    }

    fn set_matrix(&mut self, kind: MatrixKind, transform: &Transform) -> bool {
        SceneDriver::set_matrix(self, kind, transform);
        true
    }

    fn get_matrix(&self, kind: MatrixKind) -> Transform {
        SceneDriver::get_matrix(self, kind)
    }
}
