//! Buffer requests handed to a [`GpuBackend`](crate::GpuBackend).

use bitflags::bitflags;

bitflags! {
    /// How a requested buffer will be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const CONSTANT = 1 << 1;
        /// Filled by a copy on the GPU timeline.
        const COPY_DST = 1 << 2;
        /// Written directly by the CPU through a mapping.
        const MAP_WRITE = 1 << 3;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Size, usage and an optional debug name for a buffer allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    /// Bytes; must be non-zero.
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            size,
            usage,
            ..Self::default()
        }
    }

    /// A vertex buffer the CPU maps and fills, as used for both dynamic and
    /// static geometry.
    pub fn vertices(size: u64) -> Self {
        Self::new(size, BufferUsage::VERTEX | BufferUsage::MAP_WRITE)
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_descriptor() {
        let desc = BufferDescriptor::vertices(264).with_label("quad");
        assert_eq!(desc.size, 264);
        assert!(desc.usage.contains(BufferUsage::VERTEX | BufferUsage::MAP_WRITE));
        assert!(!desc.usage.contains(BufferUsage::CONSTANT));
        assert_eq!(desc.label.as_deref(), Some("quad"));
    }
}
