//! Dynamic batch accumulator.
//!
//! Per-frame polygons arrive one at a time as convex fans. Each is expanded
//! into a flat triangle list in a CPU staging list; once per frame
//! [`DynamicBatch::flush`] uploads the whole list and issues a single
//! non-indexed draw.
//!
//! # Buffers
//!
//! Every frame slot owns its own dynamic vertex buffer:
//!
//! ```text
//! slot 0: [buffer A ──────────]        grown to the largest frame seen in slot 0
//! slot 1: [buffer B ────────────────]  grown to the largest frame seen in slot 1
//! ```
//!
//! A slot is only flushed again after the frame pipeline has observed the
//! fence of its previous frame, so the CPU never writes a buffer the GPU may
//! still be reading. Buffers only grow, and only to the exact byte size of the
//! staging list that did not fit.

use polybridge_core::{LayerDescriptor, PolyFlags, TlVertex, Vertex, fan_triangles, math};

use crate::backend::{GpuBackend, GpuBuffer, GpuCommand};
use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, PipelineVariant};

/// Counters kept by the accumulator over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Polygons accepted into the staging list.
    pub polygons: u64,
    /// Triangles handed to the GPU by successful flushes.
    pub triangles: u64,
    /// Draw calls issued.
    pub draws: u64,
    /// Flushes that failed and dropped their staged geometry.
    pub failed_flushes: u64,
    /// Dynamic buffer reallocations.
    pub buffer_grows: u64,
}

/// Accumulates per-frame dynamic polygons and draws them in one call.
#[derive(Debug)]
pub struct DynamicBatch {
    staging: Vec<Vertex>,
    slot_buffers: Vec<Option<GpuBuffer>>,
    reserve: usize,
    buffer_limit: Option<u64>,
    initialized: bool,
    stats: BatchStats,
}

impl DynamicBatch {
    /// Create an initialized accumulator for `frames_in_flight` slots.
    ///
    /// `reserve` is the staging capacity, in vertices, allocated up front.
    pub fn new(frames_in_flight: usize, reserve: usize) -> Self {
        Self {
            staging: Vec::with_capacity(reserve),
            slot_buffers: (0..frames_in_flight).map(|_| None).collect(),
            reserve,
            buffer_limit: None,
            initialized: true,
            stats: BatchStats::default(),
        }
    }

    /// Refuse to grow a slot buffer beyond `limit` bytes.
    pub fn with_buffer_limit(mut self, limit: Option<u64>) -> Self {
        self.buffer_limit = limit;
        self
    }

    /// Re-open the accumulator after [`shutdown`](Self::shutdown).
    pub fn init(&mut self) {
        if !self.initialized {
            self.staging.reserve(self.reserve);
            self.initialized = true;
        }
    }

    /// Release every slot buffer and drop staged geometry.
    ///
    /// The GPU must be idle. Safe to call more than once.
    pub fn shutdown(&mut self, backend: &dyn GpuBackend) {
        for buffer in self.slot_buffers.iter_mut().filter_map(Option::take) {
            backend.destroy_buffer(buffer);
        }
        self.staging.clear();
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Stage a convex fan polygon as `points.len() - 2` triangles.
    ///
    /// Triangle `i - 2` is `(p0, p[i-1], p[i])` for `i` in `2..n`.
    pub fn add_polygon(&mut self, points: &[TlVertex], flags: PolyFlags) -> Result<(), GraphicsError> {
        if !self.initialized {
            return Err(GraphicsError::NotInitialized);
        }
        if points.len() < 3 {
            return Err(GraphicsError::InvalidParameter(format!(
                "a polygon needs at least 3 points, got {}",
                points.len()
            )));
        }

        self.staging.reserve((points.len() - 2) * 3);
        for tri in fan_triangles(points.len()) {
            self.staging.extend(tri.iter().map(|&i| Vertex::from(&points[i])));
        }
        self.stats.polygons += 1;

        log::trace!(
            "Staged {}-point polygon (flags {:#x}), {} vertices pending",
            points.len(),
            flags.bits(),
            self.staging.len()
        );
        Ok(())
    }

    /// Stage a world polygon. Layers do not change the dynamic vertex format.
    pub fn add_world_poly(
        &mut self,
        points: &[TlVertex],
        layers: &[LayerDescriptor],
        flags: PolyFlags,
    ) -> Result<(), GraphicsError> {
        let layers = polybridge_core::layer::clamp_layers(layers);
        log::trace!("World polygon with {} layers", layers.len());
        self.add_polygon(points, flags)
    }

    /// Stage a single-texture polygon (sprites, HUD, decals).
    pub fn add_misc_texture_poly(
        &mut self,
        points: &[TlVertex],
        layer: Option<LayerDescriptor>,
        flags: PolyFlags,
    ) -> Result<(), GraphicsError> {
        log::trace!("Misc texture polygon, texture {:?}", layer.and_then(|l| l.texture));
        self.add_polygon(points, flags)
    }

    /// Upload the staged triangles into `slot`'s buffer and draw them.
    ///
    /// Returns the number of vertices drawn. An empty staging list is a
    /// successful no-op that touches no buffer. The staging list is empty when
    /// this returns, whether the flush succeeded or not.
    pub fn flush(
        &mut self,
        backend: &dyn GpuBackend,
        slot: usize,
        pipeline: PipelineVariant,
    ) -> Result<usize, GraphicsError> {
        if !self.initialized {
            return Err(GraphicsError::NotInitialized);
        }
        if self.staging.is_empty() {
            return Ok(0);
        }

        polybridge_core::profile_scope!("dynamic_batch_flush");
        polybridge_core::profile_plot!("staged_vertices", self.staging.len());
        let result = self.upload_and_draw(backend, slot, pipeline);
        let count = self.staging.len();
        self.staging.clear();

        match result {
            Ok(()) => {
                self.stats.draws += 1;
                self.stats.triangles += (count / 3) as u64;
                Ok(count)
            }
            Err(err) => {
                self.stats.failed_flushes += 1;
                log::debug!("Dropped {} staged vertices after failed flush: {}", count, err);
                Err(err)
            }
        }
    }

    fn upload_and_draw(
        &mut self,
        backend: &dyn GpuBackend,
        slot: usize,
        pipeline: PipelineVariant,
    ) -> Result<(), GraphicsError> {
        let bytes: &[u8] = bytemuck::cast_slice(&self.staging);
        let size = bytes.len() as u64;
        let vertex_count = u32::try_from(self.staging.len()).map_err(|_| {
            GraphicsError::InvalidParameter("too many staged vertices for one draw".to_string())
        })?;

        let frames = self.slot_buffers.len();
        let Some(entry) = self.slot_buffers.get_mut(slot) else {
            return Err(GraphicsError::InvalidParameter(format!(
                "slot {slot} out of range for {frames} frames in flight"
            )));
        };

        if entry.as_ref().is_none_or(|buffer| buffer.size() < size) {
            if self.buffer_limit.is_some_and(|limit| size > limit) {
                return Err(GraphicsError::OutOfMemory);
            }
            if let Some(old) = entry.take() {
                log::debug!(
                    "Growing dynamic buffer of slot {} from {} to {} bytes",
                    slot,
                    old.size(),
                    size
                );
                backend.destroy_buffer(old);
            }
            let descriptor =
                BufferDescriptor::vertices(size).with_label(format!("dynamic vertices slot {slot}"));
            *entry = Some(backend.create_buffer(&descriptor)?);
            self.stats.buffer_grows += 1;
        }

        let Some(buffer) = entry.as_ref() else {
            return Err(GraphicsError::ResourceCreationFailed(
                "dynamic buffer missing after allocation".to_string(),
            ));
        };

        backend.write_buffer(buffer, 0, bytes)?;
        backend.record(GpuCommand::SetPipeline(pipeline))?;
        backend.record(GpuCommand::SetConstants(math::mat4_to_rows(
            &math::Mat4::identity(),
        )))?;
        backend.record(GpuCommand::SetVertexBuffer {
            buffer: buffer.id(),
            stride: Vertex::STRIDE,
            size,
        })?;
        backend.record(GpuCommand::Draw {
            first_vertex: 0,
            vertex_count,
        })?;

        log::trace!("Flushed {} dynamic vertices through slot {}", vertex_count, slot);
        Ok(())
    }

    /// Vertices waiting for the next flush.
    pub fn staged_vertex_count(&self) -> usize {
        self.staging.len()
    }

    /// The staging list itself.
    pub fn staged_vertices(&self) -> &[Vertex] {
        &self.staging
    }

    /// Byte capacity of a slot's dynamic buffer, 0 when none is allocated.
    pub fn slot_capacity(&self, slot: usize) -> u64 {
        self.slot_buffers
            .get(slot)
            .and_then(Option::as_ref)
            .map_or(0, GpuBuffer::size)
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use rstest::rstest;

    fn fan(n: usize) -> Vec<TlVertex> {
        (0..n).map(|i| TlVertex::at(i as f32, 0.0, 0.0)).collect()
    }

    fn open(backend: &DummyBackend, slot: usize) {
        backend.reset_commands(slot).unwrap();
    }

    #[rstest]
    #[case::triangle(3)]
    #[case::quad(4)]
    #[case::pentagon(5)]
    #[case::octagon(8)]
    fn test_fan_staging(#[case] n: usize) {
        let mut batch = DynamicBatch::new(2, 16);
        batch.add_polygon(&fan(n), PolyFlags::empty()).unwrap();

        let staged = batch.staged_vertices();
        assert_eq!(staged.len(), (n - 2) * 3);
        for (t, tri) in staged.chunks(3).enumerate() {
            let i = t + 2;
            assert_eq!(tri[0].position[0], 0.0);
            assert_eq!(tri[1].position[0], (i - 1) as f32);
            assert_eq!(tri[2].position[0], i as f32);
        }
    }

    #[rstest]
    #[case::empty(0)]
    #[case::point(1)]
    #[case::line(2)]
    fn test_degenerate_polygon_rejected(#[case] n: usize) {
        let mut batch = DynamicBatch::new(2, 16);
        assert!(matches!(
            batch.add_polygon(&fan(n), PolyFlags::empty()),
            Err(GraphicsError::InvalidParameter(_))
        ));
        assert_eq!(batch.staged_vertex_count(), 0);
    }

    #[test]
    fn test_add_after_shutdown_fails() {
        let backend = DummyBackend::new();
        let mut batch = DynamicBatch::new(2, 16);
        batch.shutdown(&backend);
        assert_eq!(
            batch.add_polygon(&fan(3), PolyFlags::empty()),
            Err(GraphicsError::NotInitialized)
        );
        batch.init();
        assert!(batch.add_polygon(&fan(3), PolyFlags::empty()).is_ok());
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let backend = DummyBackend::new();
        let gpu = backend.gpu();
        let mut batch = DynamicBatch::new(2, 16);

        assert_eq!(batch.flush(&backend, 0, PipelineVariant::Solid), Ok(0));
        assert_eq!(gpu.created_buffers(), 0);
        assert_eq!(batch.slot_capacity(0), 0);
    }

    #[test]
    fn test_flush_uploads_and_draws() {
        let backend = DummyBackend::new();
        let gpu = backend.gpu();
        let mut batch = DynamicBatch::new(2, 16);
        open(&backend, 0);

        batch.add_polygon(&fan(4), PolyFlags::empty()).unwrap();
        let expected: Vec<Vertex> = batch.staged_vertices().to_vec();
        assert_eq!(batch.flush(&backend, 0, PipelineVariant::Wireframe), Ok(6));
        assert_eq!(batch.staged_vertex_count(), 0);
        assert_eq!(batch.slot_capacity(0), Vertex::byte_size(6));

        backend.submit(0).unwrap();
        let submission = gpu.last_submission().unwrap();
        assert_eq!(submission.draws(), vec![(0, 6)]);
        assert_eq!(
            submission.commands[0],
            GpuCommand::SetPipeline(PipelineVariant::Wireframe)
        );

        let GpuCommand::SetVertexBuffer { buffer, stride, size } = submission.commands[2] else {
            panic!("expected a vertex buffer binding");
        };
        assert_eq!(stride, Vertex::STRIDE);
        assert_eq!(size, Vertex::byte_size(6));
        let uploaded = gpu.buffer_contents(buffer).unwrap();
        assert_eq!(uploaded.as_slice(), bytemuck::cast_slice::<Vertex, u8>(&expected));
    }

    #[test]
    fn test_slot_buffers_grow_only() {
        let backend = DummyBackend::new();
        let mut batch = DynamicBatch::new(2, 16);

        open(&backend, 0);
        batch.add_polygon(&fan(6), PolyFlags::empty()).unwrap();
        batch.flush(&backend, 0, PipelineVariant::Solid).unwrap();
        let large = batch.slot_capacity(0);

        open(&backend, 0);
        batch.add_polygon(&fan(3), PolyFlags::empty()).unwrap();
        batch.flush(&backend, 0, PipelineVariant::Solid).unwrap();
        assert_eq!(batch.slot_capacity(0), large);

        open(&backend, 0);
        batch.add_polygon(&fan(10), PolyFlags::empty()).unwrap();
        batch.flush(&backend, 0, PipelineVariant::Solid).unwrap();
        assert_eq!(batch.slot_capacity(0), Vertex::byte_size(24));
        assert_eq!(batch.stats().buffer_grows, 2);
        assert_eq!(backend.gpu().live_buffers(), 1);
    }

    #[test]
    fn test_slots_have_separate_buffers() {
        let backend = DummyBackend::new();
        let mut batch = DynamicBatch::new(2, 16);

        for slot in 0..2 {
            open(&backend, slot);
            batch.add_polygon(&fan(3), PolyFlags::empty()).unwrap();
            batch.flush(&backend, slot, PipelineVariant::Solid).unwrap();
        }
        assert_eq!(backend.gpu().live_buffers(), 2);
        assert_eq!(batch.slot_capacity(1), Vertex::byte_size(3));
    }

    #[test]
    fn test_failed_flush_clears_staging() {
        let backend = DummyBackend::new();
        let gpu = backend.gpu();
        let mut batch = DynamicBatch::new(2, 16);
        open(&backend, 0);

        batch.add_polygon(&fan(5), PolyFlags::empty()).unwrap();
        gpu.fail_next_allocations(1);
        assert_eq!(
            batch.flush(&backend, 0, PipelineVariant::Solid),
            Err(GraphicsError::OutOfMemory)
        );
        assert_eq!(batch.staged_vertex_count(), 0);
        assert_eq!(batch.stats().failed_flushes, 1);

        batch.add_polygon(&fan(3), PolyFlags::empty()).unwrap();
        assert_eq!(batch.flush(&backend, 0, PipelineVariant::Solid), Ok(3));
        backend.submit(0).unwrap();
        assert_eq!(gpu.last_submission().unwrap().draws(), vec![(0, 3)]);
    }

    #[test]
    fn test_buffer_limit() {
        let backend = DummyBackend::new();
        let mut batch = DynamicBatch::new(2, 16).with_buffer_limit(Some(Vertex::byte_size(3)));
        open(&backend, 0);

        batch.add_polygon(&fan(4), PolyFlags::empty()).unwrap();
        assert_eq!(
            batch.flush(&backend, 0, PipelineVariant::Solid),
            Err(GraphicsError::OutOfMemory)
        );
        batch.add_polygon(&fan(3), PolyFlags::empty()).unwrap();
        assert_eq!(batch.flush(&backend, 0, PipelineVariant::Solid), Ok(3));
    }

    #[test]
    fn test_layered_variants_share_staging() {
        let mut batch = DynamicBatch::new(2, 16);
        let layers = [LayerDescriptor::default(); 3];
        batch
            .add_world_poly(&fan(4), &layers, PolyFlags::empty())
            .unwrap();
        batch
            .add_misc_texture_poly(&fan(3), None, PolyFlags::ALPHA)
            .unwrap();
        assert_eq!(batch.staged_vertex_count(), 9);
        assert_eq!(batch.stats().polygons, 2);
    }
}
