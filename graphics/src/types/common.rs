//! Small value types recorded into the command stream.

/// Rectangle of the target the scene is rasterized into, plus its depth range.
///
/// A host viewport request maps onto this one to one. When a scene gives none,
/// the driver covers the whole presentation target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Default for Viewport {
    /// An empty viewport. Not valid on its own.
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl Viewport {
    /// A viewport with the full `[0, 1]` depth range.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// The whole of a `width` x `height` target.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn with_depth_range(self, min_depth: f32, max_depth: f32) -> Self {
        Self {
            min_depth,
            max_depth,
            ..self
        }
    }

    /// Whether the viewport covers a non-empty area.
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Integer clip rectangle; the driver always clips to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The scissor rectangle covering a viewport.
    pub fn from_viewport(viewport: &Viewport) -> Self {
        Self::new(
            viewport.x as i32,
            viewport.y as i32,
            viewport.width.max(0.0) as u32,
            viewport.height.max(0.0) as u32,
        )
    }
}

/// Pipeline state selected per draw.
///
/// The pipeline objects themselves come from the pipeline provider; the
/// bridge only chooses between the two variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineVariant {
    #[default]
    Solid,
    Wireframe,
}

/// State of a presentation target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Owned by the presentation engine.
    Present,
    /// Bound as the color attachment of the current pass.
    RenderTarget,
}
