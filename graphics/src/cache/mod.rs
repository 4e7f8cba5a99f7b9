//! Static buffer cache.
//!
//! Persistent geometry is converted to [`Vertex`] once, uploaded into its own
//! GPU buffer and registered under an opaque handle. Drawing a static buffer
//! is a direct handle lookup with no staging step.
//!
//! # Handles
//!
//! Handles come from a counter that starts at 1 and only moves forward, also
//! across [`shutdown`](StaticBufferCache::shutdown) and re-initialization.
//! Handle 0 ([`INVALID_HANDLE`]) is never issued, and a removed handle is
//! never issued again, so a stale handle always fails lookup.
//!
//! # Deferred release
//!
//! Every draw stamps the entry with the fence value of the frame that reads
//! it. Removing an entry whose stamp the GPU has not reached yet moves its
//! buffer to a retirement list:
//!
//! ```text
//! remove(h) ──► stamp <= completed ? ──yes──► destroy now
//!                        │
//!                        no
//!                        ▼
//!               retired (stamp, buffer) ──► collect_retired(completed) ──► destroy
//! ```
//!
//! The handle is unregistered immediately either way.

use std::collections::HashMap;

use polybridge_core::layer::clamp_layers;
use polybridge_core::{HwVertex, LayerDescriptor, PolyFlags, Vertex};

use crate::backend::{GpuBackend, GpuBuffer, GpuCommand};
use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, PipelineVariant};

/// Handle value that never refers to a static buffer.
pub const INVALID_HANDLE: u32 = 0;

#[derive(Debug)]
struct StaticEntry {
    buffer: GpuBuffer,
    vertex_count: u32,
    layers: Vec<LayerDescriptor>,
    flags: PolyFlags,
    /// Fence value of the last frame that drew this entry, 0 if never drawn.
    last_used: u64,
}

/// Descriptive metadata of a cached static buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticBufferInfo {
    pub vertex_count: u32,
    pub layers: Vec<LayerDescriptor>,
    pub flags: PolyFlags,
    /// Size of the GPU buffer in bytes.
    pub size: u64,
}

/// Owns every static vertex buffer, keyed by handle.
#[derive(Debug)]
pub struct StaticBufferCache {
    entries: HashMap<u32, StaticEntry>,
    retired: Vec<(u64, GpuBuffer)>,
    next_handle: u32,
    buffer_limit: Option<u64>,
    initialized: bool,
}

impl Default for StaticBufferCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticBufferCache {
    /// Create an empty, initialized cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            retired: Vec::new(),
            next_handle: 1,
            buffer_limit: None,
            initialized: true,
        }
    }

    /// Refuse static buffers larger than `limit` bytes.
    pub fn with_buffer_limit(mut self, limit: Option<u64>) -> Self {
        self.buffer_limit = limit;
        self
    }

    /// Re-open the cache after [`shutdown`](Self::shutdown). Handles keep counting up.
    pub fn init(&mut self) {
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Convert, upload and register a static mesh. Returns its handle.
    ///
    /// Layer lists longer than [`MAX_LAYERS`](polybridge_core::MAX_LAYERS)
    /// are truncated.
    pub fn create(
        &mut self,
        backend: &dyn GpuBackend,
        vertices: &[HwVertex],
        layers: &[LayerDescriptor],
        flags: PolyFlags,
    ) -> Result<u32, GraphicsError> {
        if !self.initialized {
            return Err(GraphicsError::NotInitialized);
        }
        if vertices.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "a static buffer needs at least one vertex".to_string(),
            ));
        }
        let vertex_count = u32::try_from(vertices.len()).map_err(|_| {
            GraphicsError::InvalidParameter("too many vertices for a static buffer".to_string())
        })?;

        let handle = self.next_handle;
        let Some(next_handle) = handle.checked_add(1) else {
            return Err(GraphicsError::ResourceCreationFailed(
                "static buffer handles exhausted".to_string(),
            ));
        };

        let converted: Vec<Vertex> = vertices.iter().map(Vertex::from).collect();
        let bytes: &[u8] = bytemuck::cast_slice(&converted);
        if self
            .buffer_limit
            .is_some_and(|limit| bytes.len() as u64 > limit)
        {
            return Err(GraphicsError::OutOfMemory);
        }

        let descriptor = BufferDescriptor::vertices(bytes.len() as u64)
            .with_label(format!("static buffer {handle}"));
        let buffer = backend.create_buffer(&descriptor)?;
        if let Err(err) = backend.write_buffer(&buffer, 0, bytes) {
            backend.destroy_buffer(buffer);
            return Err(err);
        }

        self.next_handle = next_handle;
        self.entries.insert(
            handle,
            StaticEntry {
                buffer,
                vertex_count,
                layers: clamp_layers(layers),
                flags,
                last_used: 0,
            },
        );

        log::debug!(
            "Created static buffer {} ({} vertices, {} bytes)",
            handle,
            vertex_count,
            bytes.len()
        );
        Ok(handle)
    }

    /// Unregister a static buffer and release it once the GPU is done with it.
    ///
    /// `completed` is the fence value the GPU has reached.
    pub fn remove(
        &mut self,
        backend: &dyn GpuBackend,
        handle: u32,
        completed: u64,
    ) -> Result<(), GraphicsError> {
        let entry = self
            .entries
            .remove(&handle)
            .ok_or(GraphicsError::UnknownHandle(handle))?;

        if entry.last_used <= completed {
            backend.destroy_buffer(entry.buffer);
            log::debug!("Removed static buffer {}", handle);
        } else {
            log::debug!(
                "Retiring static buffer {} until fence value {} (completed: {})",
                handle,
                entry.last_used,
                completed
            );
            self.retired.push((entry.last_used, entry.buffer));
        }
        Ok(())
    }

    /// Draw `vertex_count` vertices of a static buffer starting at `start_vertex`.
    ///
    /// `constants` is uploaded before the draw when given. `frame_value` is
    /// the fence value the current frame will signal. A zero count succeeds
    /// without recording anything.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        backend: &dyn GpuBackend,
        handle: u32,
        start_vertex: u32,
        vertex_count: u32,
        constants: Option<&[f32; 16]>,
        pipeline: PipelineVariant,
        frame_value: u64,
    ) -> Result<(), GraphicsError> {
        let entry = self
            .entries
            .get_mut(&handle)
            .ok_or(GraphicsError::UnknownHandle(handle))?;

        let end = start_vertex.checked_add(vertex_count);
        if end.is_none_or(|end| end > entry.vertex_count) {
            return Err(GraphicsError::InvalidParameter(format!(
                "range {}+{} exceeds the {} vertices of static buffer {}",
                start_vertex, vertex_count, entry.vertex_count, handle
            )));
        }
        if vertex_count == 0 {
            return Ok(());
        }

        backend.record(GpuCommand::SetPipeline(pipeline))?;
        if let Some(constants) = constants {
            backend.record(GpuCommand::SetConstants(*constants))?;
        }
        backend.record(GpuCommand::SetVertexBuffer {
            buffer: entry.buffer.id(),
            stride: Vertex::STRIDE,
            size: entry.buffer.size(),
        })?;
        backend.record(GpuCommand::Draw {
            first_vertex: start_vertex,
            vertex_count,
        })?;
        entry.last_used = entry.last_used.max(frame_value);

        log::trace!(
            "Drew static buffer {} [{}, {})",
            handle,
            start_vertex,
            start_vertex + vertex_count
        );
        Ok(())
    }

    /// Release retired buffers the GPU has finished with. Returns how many.
    pub fn collect_retired(&mut self, backend: &dyn GpuBackend, completed: u64) -> usize {
        let before = self.retired.len();
        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.retired)
            .into_iter()
            .partition(|(value, _)| *value <= completed);
        self.retired = pending;
        for (_, buffer) in done {
            backend.destroy_buffer(buffer);
        }
        let released = before - self.retired.len();
        if released > 0 {
            log::debug!("Released {} retired static buffers", released);
        }
        released
    }

    /// Release every buffer, live and retired, and close the cache.
    ///
    /// The GPU must be idle. Safe to call more than once.
    pub fn shutdown(&mut self, backend: &dyn GpuBackend) {
        let live = self.entries.len();
        for (_, entry) in self.entries.drain() {
            backend.destroy_buffer(entry.buffer);
        }
        for (_, buffer) in self.retired.drain(..) {
            backend.destroy_buffer(buffer);
        }
        if self.initialized {
            log::debug!("Static buffer cache shut down ({} buffers released)", live);
        }
        self.initialized = false;
    }

    /// Whether `handle` refers to a live entry.
    pub fn contains(&self, handle: u32) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Metadata of a live entry.
    pub fn info(&self, handle: u32) -> Option<StaticBufferInfo> {
        self.entries.get(&handle).map(|entry| StaticBufferInfo {
            vertex_count: entry.vertex_count,
            layers: entry.layers.clone(),
            flags: entry.flags,
            size: entry.buffer.size(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffers waiting for the GPU before release.
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }
}
