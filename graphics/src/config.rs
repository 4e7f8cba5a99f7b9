//! Driver configuration.

use std::time::Duration;

use crate::error::GraphicsError;
use crate::pipeline::MIN_FRAMES_IN_FLIGHT;
use crate::types::Viewport;

/// Settings for a [`SceneDriver`](crate::driver::SceneDriver).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use polybridge_graphics::DriverConfig;
///
/// let config = DriverConfig::default()
///     .with_frames_in_flight(3)
///     .with_fence_timeout(Some(Duration::from_secs(2)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Frame slots in flight (default: 2).
    pub frames_in_flight: usize,
    /// Staging list capacity reserved up front, in vertices (default: 10 000).
    pub staging_reserve: usize,
    /// Diagnostic bound on the frame-slot wait (default: none, wait forever).
    /// Shutdown and reset always drain without a bound.
    pub fence_timeout: Option<Duration>,
    /// Color used when a scene begins with `clear` (default: opaque black).
    pub clear_color: [f32; 4],
    /// Depth used when a scene begins with `clear_depth` (default: 1.0).
    pub clear_depth: f32,
    /// Viewport used when a scene does not give one (default: the full target).
    pub viewport: Option<Viewport>,
    /// Largest single buffer allocation allowed (default: unlimited).
    pub max_buffer_size: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            staging_reserve: 10_000,
            fence_timeout: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
            viewport: None,
            max_buffer_size: None,
        }
    }
}

impl DriverConfig {
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    pub fn with_staging_reserve(mut self, vertices: usize) -> Self {
        self.staging_reserve = vertices;
        self
    }

    pub fn with_fence_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fence_timeout = timeout;
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_clear_depth(mut self, depth: f32) -> Self {
        self.clear_depth = depth;
        self
    }

    pub fn with_viewport(mut self, viewport: Option<Viewport>) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_max_buffer_size(mut self, bytes: Option<u64>) -> Self {
        self.max_buffer_size = bytes;
        self
    }

    /// Check every field for a usable value.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if self.frames_in_flight < MIN_FRAMES_IN_FLIGHT {
            return Err(GraphicsError::InvalidParameter(format!(
                "frames_in_flight must be at least {MIN_FRAMES_IN_FLIGHT}, got {}",
                self.frames_in_flight
            )));
        }
        if !(0.0..=1.0).contains(&self.clear_depth) {
            return Err(GraphicsError::InvalidParameter(format!(
                "clear_depth must be in [0, 1], got {}",
                self.clear_depth
            )));
        }
        if self.fence_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(GraphicsError::InvalidParameter(
                "fence_timeout must be non-zero".to_string(),
            ));
        }
        if let Some(viewport) = &self.viewport
            && !viewport.is_valid()
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "viewport must have a positive size, got {}x{}",
                viewport.width, viewport.height
            )));
        }
        if self.max_buffer_size == Some(0) {
            return Err(GraphicsError::InvalidParameter(
                "max_buffer_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
