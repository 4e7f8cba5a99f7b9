//! Render pass driver.
//!
//! [`SceneDriver`] ties the frame pipeline, the dynamic batch and the static
//! buffer cache to one backend and runs the per-frame sequence:
//!
//! ```text
//! begin_scene                                  end_scene
//! ──────────────────────────────────────────   ───────────────────────────────────────
//! 1. slot = begin_frame()   (may block)        5. flush dynamic batch
//! 2. reset slot's command list                 6. target → present, close + submit
//! 3. viewport, target → render, clears         7. present
//!    ─── 4. add_polygon / render_static ───    8. end_frame(slot)
//! ```
//!
//! Calls outside their phase are rejected with [`GraphicsError::OutOfOrder`]
//! instead of reaching the GPU:
//!
//! ```text
//! Uninitialized ──init──► Idle ──begin_scene──► Recording
//!       ▲                  │  ◄───end_scene────     │
//!       └────shutdown──────┴────────────────────────┘
//! ```

pub mod legacy;

use std::sync::Arc;
use std::time::Duration;

use polybridge_core::math::{self, Mat4, MatrixKind, Transform};
use polybridge_core::{HwVertex, LayerDescriptor, PolyFlags, TlVertex};

use crate::backend::{GpuBackend, GpuCommand};
use crate::batch::{BatchStats, DynamicBatch};
use crate::cache::{StaticBufferCache, StaticBufferInfo};
use crate::config::DriverConfig;
use crate::error::GraphicsError;
use crate::pipeline::FramePipeline;
use crate::types::{PipelineVariant, ResourceState, ScissorRect, Viewport};

pub use legacy::LegacyDriver;

/// Lifecycle phase of a [`SceneDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenePhase {
    Uninitialized,
    /// Initialized, between scenes.
    Idle,
    /// Between `begin_scene` and `end_scene`.
    Recording,
}

impl ScenePhase {
    /// Lower-case name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Idle => "idle",
            Self::Recording => "recording a scene",
        }
    }
}

/// Per-scene options requested by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneOptions {
    /// Clear the target to the configured color and reset the polygon counter.
    pub clear: bool,
    /// Clear depth to the configured value.
    pub clear_depth: bool,
    /// Draw the whole scene with the wireframe pipeline.
    pub wireframe: bool,
    /// Viewport for this scene, overriding the configured one.
    pub viewport: Option<Viewport>,
}

impl SceneOptions {
    /// Clear color and depth, solid fill, default viewport.
    pub fn cleared() -> Self {
        Self {
            clear: true,
            clear_depth: true,
            ..Self::default()
        }
    }

    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }
}

/// Frame counters kept by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Scenes that reached `end_scene`.
    pub frames: u64,
    /// Scenes whose `end_scene` reported an error.
    pub failed_frames: u64,
    /// Static buffer draws recorded.
    pub static_draws: u64,
}

struct OpenScene {
    slot: usize,
    image: usize,
    pipeline: PipelineVariant,
}

/// Drives the per-frame sequence against one backend.
pub struct SceneDriver {
    backend: Arc<dyn GpuBackend>,
    config: DriverConfig,
    pipeline: FramePipeline,
    batch: DynamicBatch,
    cache: StaticBufferCache,
    phase: ScenePhase,
    scene: Option<OpenScene>,
    matrices: [Mat4; 3],
    rendered_polys: u64,
    stats: SceneStats,
}

impl std::fmt::Debug for SceneDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneDriver")
            .field("backend", &self.backend.name())
            .field("phase", &self.phase)
            .field("pipeline", &self.pipeline)
            .field("rendered_polys", &self.rendered_polys)
            .finish_non_exhaustive()
    }
}

impl SceneDriver {
    /// Build a driver in the [`ScenePhase::Uninitialized`] phase.
    pub fn new(backend: Arc<dyn GpuBackend>, config: DriverConfig) -> Result<Self, GraphicsError> {
        config.validate()?;

        let pipeline =
            FramePipeline::new(config.frames_in_flight)?.with_wait_timeout(config.fence_timeout);
        let batch = DynamicBatch::new(config.frames_in_flight, config.staging_reserve)
            .with_buffer_limit(config.max_buffer_size);
        let cache = StaticBufferCache::new().with_buffer_limit(config.max_buffer_size);

        Ok(Self {
            backend,
            config,
            pipeline,
            batch,
            cache,
            phase: ScenePhase::Uninitialized,
            scene: None,
            matrices: [Mat4::identity(); 3],
            rendered_polys: 0,
            stats: SceneStats::default(),
        })
    }

    fn expect_phase(&self, operation: &'static str, allowed: &[ScenePhase]) -> Result<(), GraphicsError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(GraphicsError::OutOfOrder {
                operation,
                phase: self.phase.name(),
            })
        }
    }

    fn scene_state(&self, operation: &'static str) -> Result<&OpenScene, GraphicsError> {
        self.scene.as_ref().ok_or(GraphicsError::OutOfOrder {
            operation,
            phase: self.phase.name(),
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Open the driver for scenes.
    pub fn init(&mut self) -> Result<(), GraphicsError> {
        self.expect_phase("init", &[ScenePhase::Uninitialized])?;

        if self.backend.image_count() == 0 {
            return Err(GraphicsError::InitializationFailed(
                "presentation surface has no images".to_string(),
            ));
        }

        self.batch.init();
        self.cache.init();
        self.phase = ScenePhase::Idle;

        let (width, height) = self.backend.target_size();
        log::info!(
            "Scene driver initialized on {} ({}x{}, {} frames in flight)",
            self.backend.name(),
            width,
            height,
            self.pipeline.frames_in_flight()
        );
        Ok(())
    }

    /// Wait for the GPU and release every buffer. Safe to call more than once.
    ///
    /// Buffers are released even when the drain fails; the drain error is
    /// returned afterwards.
    pub fn shutdown(&mut self) -> Result<(), GraphicsError> {
        if self.phase == ScenePhase::Uninitialized {
            return Ok(());
        }

        let drained = self.release_all();
        self.phase = ScenePhase::Uninitialized;

        log::info!(
            "Scene driver shut down after {} frames",
            self.stats.frames
        );
        drained
    }

    /// Drain the GPU, tear down the cache and batch, and re-open them.
    ///
    /// Static buffer handles issued before the reset are gone; new handles
    /// keep counting up.
    pub fn reset(&mut self) -> Result<(), GraphicsError> {
        self.expect_phase("reset", &[ScenePhase::Idle, ScenePhase::Recording])?;

        let drained = self.release_all();
        self.batch.init();
        self.cache.init();
        self.phase = ScenePhase::Idle;

        log::info!("Scene driver reset");
        drained
    }

    fn release_all(&mut self) -> Result<(), GraphicsError> {
        if self.scene.take().is_some() {
            log::warn!("Discarding the scene that was still recording");
            self.pipeline.abandon_frame();
        }

        let drained = self.pipeline.drain_all(self.backend.as_ref());
        if let Err(err) = &drained {
            log::error!("GPU drain failed ({}), the device no longer owns any buffer", err);
        }
        self.cache.shutdown(self.backend.as_ref());
        self.batch.shutdown(self.backend.as_ref());
        drained
    }

    // ------------------------------------------------------------------
    // Scene boundaries
    // ------------------------------------------------------------------

    /// Start recording a frame. May block until the slot's previous frame is done.
    pub fn begin_scene(&mut self, options: SceneOptions) -> Result<(), GraphicsError> {
        self.expect_phase("begin_scene", &[ScenePhase::Idle])?;
        polybridge_core::profile_scope!("begin_scene");

        let backend = Arc::clone(&self.backend);
        let slot = self.pipeline.begin_frame(backend.as_ref())?;

        self.cache
            .collect_retired(backend.as_ref(), backend.completed_value());

        let image = backend.current_image_index();
        if let Err(err) = self.open_pass(backend.as_ref(), slot, image, &options) {
            self.pipeline.abandon_frame();
            return Err(err);
        }

        if options.clear {
            self.rendered_polys = 0;
        }
        self.scene = Some(OpenScene {
            slot,
            image,
            pipeline: if options.wireframe {
                PipelineVariant::Wireframe
            } else {
                PipelineVariant::Solid
            },
        });
        self.phase = ScenePhase::Recording;
        Ok(())
    }

    fn open_pass(
        &self,
        backend: &dyn GpuBackend,
        slot: usize,
        image: usize,
        options: &SceneOptions,
    ) -> Result<(), GraphicsError> {
        backend.reset_commands(slot)?;

        let viewport = options.viewport.or(self.config.viewport).unwrap_or_else(|| {
            let (width, height) = backend.target_size();
            Viewport::from_dimensions(width, height)
        });
        backend.record(GpuCommand::SetViewport(viewport))?;
        backend.record(GpuCommand::SetScissor(ScissorRect::from_viewport(&viewport)))?;
        backend.record(GpuCommand::TransitionTarget {
            image,
            from: ResourceState::Present,
            to: ResourceState::RenderTarget,
        })?;

        if options.clear {
            backend.record(GpuCommand::ClearColor(self.config.clear_color))?;
        }
        if options.clear_depth {
            backend.record(GpuCommand::ClearDepth(self.config.clear_depth))?;
        }
        Ok(())
    }

    /// Flush, submit and present the frame, then record its fence target.
    ///
    /// The driver is back in [`ScenePhase::Idle`] afterwards even on error.
    /// A failed flush still submits and presents the frame, so the other
    /// draws of the scene are not lost; its error is returned at the end.
    pub fn end_scene(&mut self) -> Result<(), GraphicsError> {
        self.expect_phase("end_scene", &[ScenePhase::Recording])?;
        polybridge_core::profile_scope!("end_scene");

        let Some(scene) = self.scene.take() else {
            return Err(GraphicsError::OutOfOrder {
                operation: "end_scene",
                phase: self.phase.name(),
            });
        };
        self.phase = ScenePhase::Idle;

        let result = self.finish_frame(&scene);
        self.stats.frames += 1;
        if let Err(err) = &result {
            self.stats.failed_frames += 1;
            log::debug!("Frame {} ended with error: {}", self.stats.frames, err);
        }
        polybridge_core::frame_mark!();
        result
    }

    fn finish_frame(&mut self, scene: &OpenScene) -> Result<(), GraphicsError> {
        let backend = Arc::clone(&self.backend);
        let backend = backend.as_ref();

        let flushed = self.batch.flush(backend, scene.slot, scene.pipeline);

        let closed = backend
            .record(GpuCommand::TransitionTarget {
                image: scene.image,
                from: ResourceState::RenderTarget,
                to: ResourceState::Present,
            })
            .and_then(|()| backend.submit(scene.slot));
        if let Err(err) = closed {
            self.pipeline.abandon_frame();
            return Err(err);
        }

        // Submitted work gets a fence target even if presenting fails.
        let presented = backend.present();
        let ended = self.pipeline.end_frame(backend, scene.slot);

        flushed?;
        presented?;
        ended?;
        Ok(())
    }

    /// Accepted inside a scene; batching is implicit.
    pub fn begin_batch(&mut self) -> Result<(), GraphicsError> {
        self.expect_phase("begin_batch", &[ScenePhase::Recording])
    }

    /// Accepted inside a scene; batching is implicit.
    pub fn end_batch(&mut self) -> Result<(), GraphicsError> {
        self.expect_phase("end_batch", &[ScenePhase::Recording])
    }

    // ------------------------------------------------------------------
    // Dynamic polygons
    // ------------------------------------------------------------------

    /// Stage a pre-transformed Gouraud-shaded fan polygon.
    pub fn add_polygon(&mut self, points: &[TlVertex], flags: PolyFlags) -> Result<(), GraphicsError> {
        self.expect_phase("add_polygon", &[ScenePhase::Recording])?;
        self.batch.add_polygon(points, flags)?;
        self.rendered_polys += 1;
        Ok(())
    }

    /// Stage a layered world polygon.
    pub fn add_world_poly(
        &mut self,
        points: &[TlVertex],
        layers: &[LayerDescriptor],
        flags: PolyFlags,
    ) -> Result<(), GraphicsError> {
        self.expect_phase("add_world_poly", &[ScenePhase::Recording])?;
        self.batch.add_world_poly(points, layers, flags)?;
        self.rendered_polys += 1;
        Ok(())
    }

    /// Stage a single-texture polygon.
    pub fn add_misc_texture_poly(
        &mut self,
        points: &[TlVertex],
        layer: Option<LayerDescriptor>,
        flags: PolyFlags,
    ) -> Result<(), GraphicsError> {
        self.expect_phase("add_misc_texture_poly", &[ScenePhase::Recording])?;
        self.batch.add_misc_texture_poly(points, layer, flags)?;
        self.rendered_polys += 1;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Static buffers
    // ------------------------------------------------------------------

    /// Upload a static mesh and return its handle. Allowed inside or outside a scene.
    pub fn create_static_buffer(
        &mut self,
        vertices: &[HwVertex],
        layers: &[LayerDescriptor],
        flags: PolyFlags,
    ) -> Result<u32, GraphicsError> {
        self.expect_phase(
            "create_static_buffer",
            &[ScenePhase::Idle, ScenePhase::Recording],
        )?;
        self.cache
            .create(self.backend.as_ref(), vertices, layers, flags)
    }

    /// Remove a static mesh. Its buffer is released once the GPU has finished with it.
    pub fn remove_static_buffer(&mut self, handle: u32) -> Result<(), GraphicsError> {
        self.expect_phase(
            "remove_static_buffer",
            &[ScenePhase::Idle, ScenePhase::Recording],
        )?;
        let completed = self.backend.completed_value();
        self.cache.remove(self.backend.as_ref(), handle, completed)
    }

    /// Draw a vertex range of a static mesh.
    ///
    /// `transform`, when given, replaces the world matrix for this draw. The
    /// draw constant is `world * view * projection`.
    pub fn render_static_buffer(
        &mut self,
        handle: u32,
        start_vertex: u32,
        vertex_count: u32,
        transform: Option<&Transform>,
    ) -> Result<(), GraphicsError> {
        self.expect_phase("render_static_buffer", &[ScenePhase::Recording])?;
        let pipeline = self.scene_state("render_static_buffer")?.pipeline;

        let world = transform.map_or(self.matrices[MatrixKind::World.index()], Transform::to_matrix);
        let constants = math::mat4_to_rows(&math::world_view_projection(
            &world,
            &self.matrices[MatrixKind::View.index()],
            &self.matrices[MatrixKind::Projection.index()],
        ));

        self.cache.render(
            self.backend.as_ref(),
            handle,
            start_vertex,
            vertex_count,
            Some(&constants),
            pipeline,
            self.pipeline.pending_value(),
        )?;
        if vertex_count > 0 {
            self.stats.static_draws += 1;
            self.rendered_polys += u64::from(vertex_count / 3);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Matrices
    // ------------------------------------------------------------------

    /// Store a world, view or projection transform.
    pub fn set_matrix(&mut self, kind: MatrixKind, transform: &Transform) {
        self.matrices[kind.index()] = transform.to_matrix();
    }

    /// Read back a stored transform.
    pub fn get_matrix(&self, kind: MatrixKind) -> Transform {
        Transform::from_matrix(&self.matrices[kind.index()])
    }

    /// The stored 4x4 matrix of a kind.
    pub fn matrix(&self, kind: MatrixKind) -> &Mat4 {
        &self.matrices[kind.index()]
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn phase(&self) -> ScenePhase {
        self.phase
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    /// Slot of the scene being recorded.
    pub fn current_slot(&self) -> Option<usize> {
        self.scene.as_ref().map(|scene| scene.slot)
    }

    /// Polygons submitted since the last scene that began with `clear`.
    pub fn rendered_polys(&self) -> u64 {
        self.rendered_polys
    }

    /// Vertices staged for the current scene's dynamic draw.
    pub fn staged_vertex_count(&self) -> usize {
        self.batch.staged_vertex_count()
    }

    pub fn batch_stats(&self) -> BatchStats {
        self.batch.stats()
    }

    pub fn stats(&self) -> SceneStats {
        self.stats
    }

    /// Metadata of a live static buffer.
    pub fn static_buffer_info(&self, handle: u32) -> Option<StaticBufferInfo> {
        self.cache.info(handle)
    }

    /// Live static buffers.
    pub fn static_buffer_count(&self) -> usize {
        self.cache.len()
    }

    /// Removed static buffers still waiting for the GPU.
    pub fn retired_static_buffers(&self) -> usize {
        self.cache.retired_count()
    }

    /// Total time spent blocked waiting for frame slots.
    pub fn blocked_time(&self) -> Duration {
        self.pipeline.blocked_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, DummyGpu};
    use polybridge_core::Vec3;

    fn driver() -> (SceneDriver, DummyGpu) {
        let backend = DummyBackend::new();
        let gpu = backend.gpu();
        let mut driver = SceneDriver::new(Arc::new(backend), DriverConfig::default()).unwrap();
        driver.init().unwrap();
        (driver, gpu)
    }

    fn triangle() -> [TlVertex; 3] {
        [
            TlVertex::at(0.0, 0.0, 0.5),
            TlVertex::at(1.0, 0.0, 0.5),
            TlVertex::at(0.0, 1.0, 0.5),
        ]
    }

    fn mesh(n: usize) -> Vec<HwVertex> {
        (0..n)
            .map(|i| HwVertex::new([i as f32, 0.0, 0.0], 0xFF80_8080, [0.0, 0.0], [0.0, 0.0]))
            .collect()
    }

    #[test]
    fn test_phase_transitions() {
        let backend = DummyBackend::new();
        let mut driver = SceneDriver::new(Arc::new(backend), DriverConfig::default()).unwrap();
        assert_eq!(driver.phase(), ScenePhase::Uninitialized);

        driver.init().unwrap();
        assert_eq!(driver.phase(), ScenePhase::Idle);

        driver.begin_scene(SceneOptions::default()).unwrap();
        assert_eq!(driver.phase(), ScenePhase::Recording);

        driver.end_scene().unwrap();
        assert_eq!(driver.phase(), ScenePhase::Idle);

        driver.shutdown().unwrap();
        assert_eq!(driver.phase(), ScenePhase::Uninitialized);
        driver.shutdown().unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DriverConfig::default().with_frames_in_flight(1);
        assert!(SceneDriver::new(Arc::new(DummyBackend::new()), config).is_err());
    }

    #[test]
    fn test_out_of_order_calls_rejected() {
        let (mut driver, _gpu) = driver();

        assert!(matches!(
            driver.end_scene(),
            Err(GraphicsError::OutOfOrder { operation: "end_scene", .. })
        ));
        assert!(matches!(
            driver.add_polygon(&triangle(), PolyFlags::empty()),
            Err(GraphicsError::OutOfOrder { .. })
        ));
        assert!(driver.render_static_buffer(1, 0, 3, None).is_err());
        assert!(driver.begin_batch().is_err());
        assert!(driver.init().is_err());

        driver.begin_scene(SceneOptions::default()).unwrap();
        assert!(matches!(
            driver.begin_scene(SceneOptions::default()),
            Err(GraphicsError::OutOfOrder { operation: "begin_scene", .. })
        ));
        driver.begin_batch().unwrap();
        driver.end_batch().unwrap();
        driver.end_scene().unwrap();
    }

    #[test]
    fn test_begin_scene_records_pass_setup() {
        let (mut driver, gpu) = driver();

        driver
            .begin_scene(SceneOptions::cleared().with_viewport(Viewport::new(0.0, 0.0, 320.0, 200.0)))
            .unwrap();
        driver.end_scene().unwrap();

        let commands = gpu.last_submission().unwrap().commands;
        assert_eq!(
            commands,
            vec![
                GpuCommand::SetViewport(Viewport::new(0.0, 0.0, 320.0, 200.0)),
                GpuCommand::SetScissor(ScissorRect::new(0, 0, 320, 200)),
                GpuCommand::TransitionTarget {
                    image: 0,
                    from: ResourceState::Present,
                    to: ResourceState::RenderTarget,
                },
                GpuCommand::ClearColor([0.0, 0.0, 0.0, 1.0]),
                GpuCommand::ClearDepth(1.0),
                GpuCommand::TransitionTarget {
                    image: 0,
                    from: ResourceState::RenderTarget,
                    to: ResourceState::Present,
                },
            ]
        );
        assert_eq!(gpu.present_count(), 1);
        assert_eq!(gpu.signals(), vec![1]);
    }

    #[test]
    fn test_default_viewport_covers_target() {
        let (mut driver, gpu) = driver();
        driver.begin_scene(SceneOptions::default()).unwrap();
        driver.end_scene().unwrap();

        let commands = gpu.last_submission().unwrap().commands;
        assert_eq!(
            commands[0],
            GpuCommand::SetViewport(Viewport::from_dimensions(640, 480))
        );

        let backend = DummyBackend::new().with_target_size(320, 200);
        let gpu = backend.gpu();
        let mut driver = SceneDriver::new(Arc::new(backend), DriverConfig::default()).unwrap();
        driver.init().unwrap();
        driver.begin_scene(SceneOptions::default()).unwrap();
        driver.end_scene().unwrap();

        let commands = gpu.last_submission().unwrap().commands;
        assert_eq!(
            commands[0],
            GpuCommand::SetViewport(Viewport::from_dimensions(320, 200))
        );
    }

    #[test]
    fn test_rendered_polys_reset_on_clear() {
        let (mut driver, _gpu) = driver();

        driver.begin_scene(SceneOptions::default()).unwrap();
        driver.add_polygon(&triangle(), PolyFlags::empty()).unwrap();
        driver.end_scene().unwrap();

        driver.begin_scene(SceneOptions::default()).unwrap();
        driver.add_polygon(&triangle(), PolyFlags::empty()).unwrap();
        driver.end_scene().unwrap();
        assert_eq!(driver.rendered_polys(), 2);

        driver.begin_scene(SceneOptions::cleared()).unwrap();
        assert_eq!(driver.rendered_polys(), 0);
        driver.end_scene().unwrap();
    }

    #[test]
    fn test_wireframe_selects_pipeline() {
        let (mut driver, gpu) = driver();
        let handle = driver.create_static_buffer(&mesh(3), &[], PolyFlags::empty()).unwrap();

        driver
            .begin_scene(SceneOptions::default().with_wireframe(true))
            .unwrap();
        driver.add_polygon(&triangle(), PolyFlags::empty()).unwrap();
        driver.render_static_buffer(handle, 0, 3, None).unwrap();
        driver.end_scene().unwrap();

        let pipelines: Vec<_> = gpu
            .last_submission()
            .unwrap()
            .commands
            .into_iter()
            .filter_map(|c| match c {
                GpuCommand::SetPipeline(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(pipelines, vec![PipelineVariant::Wireframe; 2]);
    }

    #[test]
    fn test_static_draw_uses_transform_constant() {
        let (mut driver, gpu) = driver();
        let handle = driver.create_static_buffer(&mesh(3), &[], PolyFlags::empty()).unwrap();
        driver.set_matrix(
            MatrixKind::View,
            &Transform::from_translation(Vec3::new(0.0, 0.0, 10.0)),
        );

        driver.begin_scene(SceneOptions::default()).unwrap();
        let xform = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        driver.render_static_buffer(handle, 0, 3, Some(&xform)).unwrap();
        driver.end_scene().unwrap();

        let constants = gpu
            .last_submission()
            .unwrap()
            .commands
            .into_iter()
            .find_map(|c| match c {
                GpuCommand::SetConstants(m) => Some(m),
                _ => None,
            })
            .unwrap();
        assert_eq!(&constants[12..16], &[1.0, 2.0, 13.0, 1.0]);
    }

    #[test]
    fn test_matrix_roundtrip() {
        let (mut driver, _gpu) = driver();
        assert_eq!(driver.get_matrix(MatrixKind::Projection), Transform::IDENTITY);

        let xform = Transform::from_translation(Vec3::new(4.0, 5.0, 6.0));
        driver.set_matrix(MatrixKind::World, &xform);
        assert_eq!(driver.get_matrix(MatrixKind::World), xform);
        assert_eq!(driver.matrix(MatrixKind::World)[(3, 0)], 4.0);
    }

    #[test]
    fn test_remove_during_scene_defers_release() {
        let (mut driver, gpu) = driver();
        let handle = driver.create_static_buffer(&mesh(3), &[], PolyFlags::empty()).unwrap();

        driver.begin_scene(SceneOptions::default()).unwrap();
        driver.render_static_buffer(handle, 0, 3, None).unwrap();
        driver.remove_static_buffer(handle).unwrap();
        assert_eq!(driver.retired_static_buffers(), 1);
        assert_eq!(gpu.live_buffers(), 1);
        driver.end_scene().unwrap();

        driver.begin_scene(SceneOptions::default()).unwrap();
        assert_eq!(driver.retired_static_buffers(), 0);
        assert_eq!(gpu.live_buffers(), 0);
        driver.end_scene().unwrap();
    }

    #[test]
    fn test_failed_present_returns_to_idle() {
        let (mut driver, gpu) = driver();

        driver.begin_scene(SceneOptions::default()).unwrap();
        gpu.set_fail_present(true);
        assert_eq!(driver.end_scene(), Err(GraphicsError::SurfaceLost));
        assert_eq!(driver.phase(), ScenePhase::Idle);
        assert_eq!(driver.stats().failed_frames, 1);
        assert_eq!(driver.pipeline().slot_fence_value(0), Some(1));

        gpu.set_fail_present(false);
        driver.begin_scene(SceneOptions::default()).unwrap();
        driver.end_scene().unwrap();
    }

    #[test]
    fn test_reset_releases_and_reopens() {
        let (mut driver, gpu) = driver();
        let first = driver.create_static_buffer(&mesh(3), &[], PolyFlags::empty()).unwrap();
        driver.begin_scene(SceneOptions::default()).unwrap();
        driver.add_polygon(&triangle(), PolyFlags::empty()).unwrap();

        driver.reset().unwrap();
        assert_eq!(driver.phase(), ScenePhase::Idle);
        assert_eq!(driver.staged_vertex_count(), 0);
        assert_eq!(driver.static_buffer_count(), 0);
        assert_eq!(gpu.live_buffers(), 0);

        let second = driver.create_static_buffer(&mesh(3), &[], PolyFlags::empty()).unwrap();
        assert!(second > first);
        driver.begin_scene(SceneOptions::default()).unwrap();
        driver.end_scene().unwrap();
    }

    #[test]
    fn test_shutdown_drains_and_releases() {
        let (mut driver, gpu) = driver();
        driver.create_static_buffer(&mesh(3), &[], PolyFlags::empty()).unwrap();
        driver.begin_scene(SceneOptions::default()).unwrap();
        driver.add_polygon(&triangle(), PolyFlags::empty()).unwrap();
        driver.end_scene().unwrap();

        driver.shutdown().unwrap();
        assert_eq!(gpu.live_buffers(), 0);
        assert_eq!(gpu.completed_value(), 2);
        assert!(driver.create_static_buffer(&mesh(3), &[], PolyFlags::empty()).is_err());
    }
}
