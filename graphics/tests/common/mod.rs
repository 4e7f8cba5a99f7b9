//! Shared fixtures for the scene driver integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use polybridge_core::{HwVertex, TlVertex};
use polybridge_graphics::{DriverConfig, DummyBackend, DummyGpu, SceneDriver};

/// Route `log` output through the test harness. Safe to call from every test.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A screen-space quad; expands to two triangles.
pub fn quad() -> [TlVertex; 4] {
    [
        TlVertex::at(0.0, 0.0, 0.5),
        TlVertex::at(64.0, 0.0, 0.5),
        TlVertex::at(64.0, 64.0, 0.5),
        TlVertex::at(0.0, 64.0, 0.5),
    ]
}

pub fn triangle() -> [TlVertex; 3] {
    [
        TlVertex::at(0.0, 0.0, 0.5).with_color(1.0, 0.0, 0.0, 1.0),
        TlVertex::at(32.0, 0.0, 0.5).with_color(0.0, 1.0, 0.0, 1.0),
        TlVertex::at(0.0, 32.0, 0.5).with_color(0.0, 0.0, 1.0, 1.0),
    ]
}

/// A static mesh of `count` vertices along the x axis.
pub fn mesh(count: usize) -> Vec<HwVertex> {
    (0..count)
        .map(|i| HwVertex::new([i as f32, 0.0, 0.0], 0xFFFF_FFFF, [0.0, 0.0], [0.0, 0.0]))
        .collect()
}

/// An initialized driver over a fresh dummy backend.
///
/// With `manual` the fence only advances when the test completes values
/// through the returned [`DummyGpu`]; fence waits then time out after 50ms.
pub fn driver_with(frames: usize, manual: bool) -> (SceneDriver, DummyGpu) {
    init_logger();

    let mut backend = DummyBackend::new().with_image_count(frames);
    let mut config = DriverConfig::default().with_frames_in_flight(frames);
    if manual {
        backend = backend.with_manual_fence();
        config = config.with_fence_timeout(Some(Duration::from_millis(50)));
    }
    let gpu = backend.gpu();

    let mut driver = SceneDriver::new(Arc::new(backend), config).unwrap();
    driver.init().unwrap();
    (driver, gpu)
}
