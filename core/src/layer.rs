//! Texture layer descriptors.

/// Maximum number of texture layers a mesh or polygon can carry.
pub const MAX_LAYERS: usize = 2;

/// Opaque texture identifier owned by the host's texture manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// One texture layer of a polygon or static mesh.
///
/// The bridge never dereferences the texture; layers are stored so the host
/// can query them back and so a texturing pipeline can bind them later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayerDescriptor {
    /// Texture bound to this layer, `None` for an untextured layer.
    pub texture: Option<TextureId>,
    /// Host-defined layer flags, passed through untouched.
    pub flags: u32,
}

impl LayerDescriptor {
    /// Create a layer referencing a texture.
    pub fn textured(texture: TextureId) -> Self {
        Self {
            texture: Some(texture),
            flags: 0,
        }
    }

    /// Set the layer flags.
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

/// Copy at most [`MAX_LAYERS`] layers, logging when the input is truncated.
pub fn clamp_layers(layers: &[LayerDescriptor]) -> Vec<LayerDescriptor> {
    if layers.len() > MAX_LAYERS {
        log::debug!(
            "Truncating {} texture layers to the supported {}",
            layers.len(),
            MAX_LAYERS
        );
    }
    layers.iter().take(MAX_LAYERS).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_layers_truncates() {
        let layers = [
            LayerDescriptor::textured(TextureId(1)),
            LayerDescriptor::textured(TextureId(2)),
            LayerDescriptor::textured(TextureId(3)),
        ];
        let clamped = clamp_layers(&layers);
        assert_eq!(clamped.len(), MAX_LAYERS);
        assert_eq!(clamped[1].texture, Some(TextureId(2)));
    }

    #[test]
    fn test_clamp_layers_keeps_short_lists() {
        let layers = [LayerDescriptor::default().with_flags(7)];
        let clamped = clamp_layers(&layers);
        assert_eq!(clamped, vec![LayerDescriptor {
            texture: None,
            flags: 7
        }]);
    }
}
