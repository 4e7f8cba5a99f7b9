//! GPU backend abstraction layer.
//!
//! The bridge never talks to a graphics API directly. Everything it needs from
//! the device, the queue, the pipeline provider and the presentation surface
//! goes through the [`GpuBackend`] trait:
//!
//! - buffer creation, CPU writes and explicit release
//! - command stream reset, recording and submission
//! - the presentation image rotation and present
//! - one timeline fence signaled by the queue
//!
//! # Available Backends
//!
//! - [`dummy`]: headless backend that records what it is asked to do. Its
//!   fence can complete on signal or be driven by hand from a test or a
//!   simulated GPU thread.

pub mod dummy;

use std::time::Duration;

use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, PipelineVariant, ResourceState, ScissorRect, Viewport};

pub use dummy::{DummyBackend, DummyGpu, Submission};

/// Backend-assigned identifier of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Exclusive handle to a GPU buffer.
///
/// Not `Clone`: every buffer has exactly one owner, which hands it back to
/// [`GpuBackend::destroy_buffer`] to release it.
#[derive(Debug, PartialEq, Eq)]
pub struct GpuBuffer {
    id: BufferId,
    size: u64,
}

impl GpuBuffer {
    /// Wrap a backend buffer. Only backends create these.
    pub fn new(id: BufferId, size: u64) -> Self {
        Self { id, size }
    }

    /// Backend identifier, used when binding the buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A command recorded into the open command stream.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    /// Clear the current target image to an RGBA color.
    ClearColor([f32; 4]),
    /// Clear the depth buffer.
    ClearDepth(f32),
    SetPipeline(PipelineVariant),
    /// Per-draw constants: a row-major 4x4 matrix.
    SetConstants([f32; 16]),
    SetVertexBuffer {
        buffer: BufferId,
        stride: u64,
        size: u64,
    },
    /// Non-indexed triangle list draw.
    Draw {
        first_vertex: u32,
        vertex_count: u32,
    },
    TransitionTarget {
        image: usize,
        from: ResourceState,
        to: ResourceState,
    },
}

/// GPU backend trait for abstracting different GPU APIs.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create a buffer resource.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError>;

    /// Map, copy `data` at `offset`, unmap.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8])
    -> Result<(), GraphicsError>;

    /// Release a buffer.
    fn destroy_buffer(&self, buffer: GpuBuffer);

    /// Reset the command allocator and list of a frame slot and open it for recording.
    fn reset_commands(&self, slot: usize) -> Result<(), GraphicsError>;

    /// Record a command into the open command list.
    fn record(&self, command: GpuCommand) -> Result<(), GraphicsError>;

    /// Close the open command list of `slot` and submit it to the queue.
    fn submit(&self, slot: usize) -> Result<(), GraphicsError>;

    /// Number of images in the presentation surface.
    fn image_count(&self) -> usize;

    /// Index of the image the next frame renders into.
    fn current_image_index(&self) -> usize;

    /// Size of the presentation images in pixels.
    fn target_size(&self) -> (u32, u32);

    /// Present the current image.
    fn present(&self) -> Result<(), GraphicsError>;

    /// Ask the queue to write `value` to the fence once prior work completes.
    fn signal(&self, value: u64) -> Result<(), GraphicsError>;

    /// The last fence value the GPU has written.
    fn completed_value(&self) -> u64;

    /// Block until the fence reaches `value`.
    ///
    /// `None` waits without bound; `Some` fails with [`GraphicsError::Timeout`]
    /// when it elapses first.
    fn wait_for_value(&self, value: u64, timeout: Option<Duration>) -> Result<(), GraphicsError>;
}
