//! # polybridge app
//!
//! Headless runner for the polygon bridge.
//!
//! ## Overview
//!
//! - [`RunnerArgs`] - command line flags and their [`DriverConfig`](polybridge_graphics::DriverConfig) mapping
//! - [`SimulatedGpu`] - a thread that completes fence values after a fixed latency
//! - [`run`] - the scripted scene loop, returning a [`RunSummary`]
//!
//! ## Example
//!
//! ```no_run
//! use polybridge_app::{RunnerArgs, run};
//!
//! let summary = run(&RunnerArgs::default())?;
//! log::info!("{summary}");
//! # Ok::<(), polybridge_graphics::GraphicsError>(())
//! ```

mod args;
mod runner;

pub use args::RunnerArgs;
pub use runner::{RunSummary, SimulatedGpu, run};

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the runner version once at start-up.
pub fn init() {
    log::info!("polybridge app v{} initialized", VERSION);
}
