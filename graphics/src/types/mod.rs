//! Common types and descriptors for GPU resources and commands.
//!
//! This module contains usage flags, descriptor structs and the small value
//! types recorded into a command stream.

mod buffer;
mod common;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{PipelineVariant, ResourceState, ScissorRect, Viewport};
