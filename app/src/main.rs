use std::process::ExitCode;

use clap::Parser;
use polybridge_app::RunnerArgs;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    polybridge_core::profiling::start();
    polybridge_core::init();
    polybridge_graphics::init();
    polybridge_app::init();

    let args = RunnerArgs::parse();
    log::info!(
        "Running {} frames, {} in flight, {}ms GPU latency",
        args.frames,
        args.frames_in_flight,
        args.gpu_latency_ms
    );

    match polybridge_app::run(&args) {
        Ok(summary) => {
            log::info!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("Run failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
