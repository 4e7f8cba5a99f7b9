//! Command line arguments for the headless runner.
//!
//! Uses clap for parsing with:
//! - Help text (`--help`)
//! - Validation and clear error messages
//! - A mapping onto [`DriverConfig`]

use std::time::Duration;

use clap::Parser;
use polybridge_graphics::DriverConfig;

/// polybridge headless runner arguments.
///
/// # Examples
///
/// ```bash
/// # Show help
/// ./polybridge-app --help
///
/// # Three frames in flight against a slow GPU
/// ./polybridge-app --frames-in-flight 3 --gpu-latency-ms 20
///
/// # Fail instead of hanging if the GPU stops answering
/// ./polybridge-app --fence-timeout-ms 500
/// ```
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "polybridge-app",
    about = "Drive the polygon bridge with a scripted scene",
    long_about = "Runs a scripted sequence of scenes through the scene driver on a \
        headless backend.\n\n\
        A simulated GPU thread completes every submitted frame after \
        --gpu-latency-ms, so the frame pipeline blocks exactly as it would \
        against a real queue. A summary of frames, draws, triangles and time \
        spent waiting on fences is logged at the end.",
    version
)]
pub struct RunnerArgs {
    /// Number of scenes to render before exiting.
    #[arg(long, default_value = "120")]
    pub frames: u64,

    /// Frame slots the CPU may run ahead of the GPU (at least 2).
    #[arg(long, default_value = "2")]
    pub frames_in_flight: usize,

    /// Time the simulated GPU takes to finish each submitted frame.
    #[arg(long, default_value = "4")]
    pub gpu_latency_ms: u64,

    /// Dynamic polygons staged in every scene.
    #[arg(long, default_value = "256")]
    pub polys_per_frame: usize,

    /// Static meshes created up front and drawn every scene.
    #[arg(long, default_value = "4")]
    pub static_meshes: usize,

    /// Draw every scene with the wireframe pipeline.
    #[arg(long)]
    pub wireframe: bool,

    /// Give up on a fence wait after this many milliseconds.
    #[arg(long)]
    pub fence_timeout_ms: Option<u64>,
}

impl Default for RunnerArgs {
    fn default() -> Self {
        Self {
            frames: 120,
            frames_in_flight: 2,
            gpu_latency_ms: 4,
            polys_per_frame: 256,
            static_meshes: 4,
            wireframe: false,
            fence_timeout_ms: None,
        }
    }
}

impl RunnerArgs {
    /// Driver settings derived from the flags.
    pub fn to_config(&self) -> DriverConfig {
        DriverConfig::default()
            .with_frames_in_flight(self.frames_in_flight)
            .with_staging_reserve(self.polys_per_frame.max(1) * 6)
            .with_fence_timeout(self.fence_timeout_ms.map(Duration::from_millis))
    }

    pub fn gpu_latency(&self) -> Duration {
        Duration::from_millis(self.gpu_latency_ms)
    }
}
