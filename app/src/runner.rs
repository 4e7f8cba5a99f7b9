//! Scripted scene loop against a simulated GPU.
//!
//! ```text
//!  main thread                          GPU thread
//!  ───────────                          ──────────
//!  begin_scene ── waits on slot fence ◄── complete(value) after latency
//!  add polys / static draws                 ▲
//!  end_scene ──► signal(value) ─────────────┘
//! ```
//!
//! The backend runs with a manual fence, so every fence value is completed
//! by [`SimulatedGpu`] in submission order, one latency apart.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use polybridge_core::math::{MatrixKind, Transform};
use polybridge_core::{HwVertex, LayerDescriptor, PolyFlags, TextureId, TlVertex, Vec3};
use polybridge_graphics::{DummyBackend, DummyGpu, GraphicsError, SceneDriver, SceneOptions};

use crate::args::RunnerArgs;

const POLL_INTERVAL: Duration = Duration::from_micros(500);

/// One static mesh is removed and rebuilt every this many frames.
const MESH_REBUILD_INTERVAL: u64 = 30;

// ============================================================================
// Simulated GPU
// ============================================================================

/// A thread that plays the GPU for a [`DummyBackend`] with a manual fence.
pub struct SimulatedGpu {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<u64>>,
}

impl SimulatedGpu {
    /// Start completing the backend's fence values, each `latency` after the previous one.
    pub fn spawn(gpu: DummyGpu, latency: Duration) -> Result<Self, GraphicsError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("simulated-gpu".to_string())
                .spawn(move || gpu_loop(&gpu, latency, &stop))
                .map_err(|err| {
                    GraphicsError::InitializationFailed(format!(
                        "cannot spawn the simulated GPU thread: {}",
                        err
                    ))
                })?
        };
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Stop the thread after completing everything queued. Returns the number
    /// of fence values it completed.
    pub fn stop(mut self) -> u64 {
        self.stop.store(true, Ordering::Release);
        self.thread
            .take()
            .and_then(|thread| thread.join().ok())
            .unwrap_or(0)
    }
}

impl Drop for SimulatedGpu {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn gpu_loop(gpu: &DummyGpu, latency: Duration, stop: &AtomicBool) -> u64 {
    let mut queue: VecDeque<(u64, Instant)> = VecDeque::new();
    let mut seen = 0;
    let mut completions = 0;

    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();

        if let Some(value) = gpu.last_signaled()
            && value > seen
        {
            // The queue executes in order: work starts when the previous frame is done.
            let start = queue.back().map_or(now, |&(_, due)| due.max(now));
            queue.push_back((value, start + latency));
            seen = value;
        }

        while let Some(&(value, due)) = queue.front() {
            if due > now {
                break;
            }
            queue.pop_front();
            gpu.complete(value);
            completions += 1;
        }

        thread::sleep(POLL_INTERVAL);
    }

    gpu.complete_all();
    log::debug!("Simulated GPU stopped after {} completions", completions);
    completions
}

// ============================================================================
// Summary
// ============================================================================

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub failed_frames: u64,
    /// Batch draws plus static buffer draws.
    pub draws: u64,
    /// Triangles drawn from dynamic polygons.
    pub triangles: u64,
    pub static_draws: u64,
    pub meshes_rebuilt: u64,
    /// Time `begin_scene` spent waiting on frame fences.
    pub blocked: Duration,
    pub elapsed: Duration,
    pub gpu_completions: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames ({} failed), {} draws ({} static), {} triangles, \
             {} meshes rebuilt, blocked {:.2?} of {:.2?}",
            self.frames,
            self.failed_frames,
            self.draws,
            self.static_draws,
            self.triangles,
            self.meshes_rebuilt,
            self.blocked,
            self.elapsed
        )
    }
}

// ============================================================================
// Scene script
// ============================================================================

struct SceneScript {
    polys_per_frame: usize,
    wireframe: bool,
    mesh: Vec<HwVertex>,
    handles: Vec<u32>,
    layers: [LayerDescriptor; 2],
    rebuilt: u64,
}

impl SceneScript {
    fn new(args: &RunnerArgs) -> Self {
        Self {
            polys_per_frame: args.polys_per_frame,
            wireframe: args.wireframe,
            mesh: ring_mesh(8),
            handles: Vec::with_capacity(args.static_meshes),
            layers: [
                LayerDescriptor::textured(TextureId(1)),
                LayerDescriptor::textured(TextureId(2)).with_flags(1),
            ],
            rebuilt: 0,
        }
    }

    fn setup(&mut self, driver: &mut SceneDriver, meshes: usize) -> Result<(), GraphicsError> {
        driver.set_matrix(
            MatrixKind::View,
            &Transform::from_translation(Vec3::new(0.0, 0.0, 10.0)),
        );
        for _ in 0..meshes {
            let handle = driver.create_static_buffer(&self.mesh, &self.layers, PolyFlags::empty())?;
            self.handles.push(handle);
        }
        Ok(())
    }

    fn frame(&mut self, driver: &mut SceneDriver, index: u64) -> Result<(), GraphicsError> {
        polybridge_core::profile_scope!("scripted_frame");

        driver.begin_scene(SceneOptions::cleared().with_wireframe(self.wireframe))?;
        driver.begin_batch()?;
        for i in 0..self.polys_per_frame {
            let poly = polygon(i, index);
            match i % 3 {
                0 => driver.add_polygon(&poly, PolyFlags::empty())?,
                1 => driver.add_world_poly(&poly, &self.layers, PolyFlags::empty())?,
                _ => driver.add_misc_texture_poly(&poly, Some(self.layers[0]), PolyFlags::empty())?,
            }
        }
        driver.end_batch()?;

        let count = self.mesh.len() as u32;
        for (n, &handle) in self.handles.iter().enumerate() {
            let transform =
                Transform::from_translation(Vec3::new(n as f32 * 2.0, 0.0, index as f32 * 0.01));
            driver.render_static_buffer(handle, 0, count, Some(&transform))?;
        }
        driver.end_scene()?;

        if index % MESH_REBUILD_INTERVAL == MESH_REBUILD_INTERVAL - 1 && !self.handles.is_empty() {
            let slot = (index / MESH_REBUILD_INTERVAL) as usize % self.handles.len();
            driver.remove_static_buffer(self.handles[slot])?;
            self.handles[slot] =
                driver.create_static_buffer(&self.mesh, &self.layers, PolyFlags::empty())?;
            self.rebuilt += 1;
        }
        Ok(())
    }
}

/// A convex polygon of 3 to 6 points that drifts with the frame index.
fn polygon(i: usize, frame: u64) -> Vec<TlVertex> {
    let points = 3 + i % 4;
    let cx = (i % 32) as f32 * 20.0 + (frame % 60) as f32;
    let cy = (i / 32) as f32 * 20.0;
    let shade = (i % 8) as f32 / 8.0;

    (0..points)
        .map(|p| {
            let angle = p as f32 / points as f32 * std::f32::consts::TAU;
            TlVertex::at(cx + angle.cos() * 8.0, cy + angle.sin() * 8.0, 0.5)
                .with_color(shade, 1.0 - shade, 0.5, 1.0)
                .with_uv(angle.cos() * 0.5 + 0.5, angle.sin() * 0.5 + 0.5)
        })
        .collect()
}

/// A flat ring of `segments` triangles around the origin.
fn ring_mesh(segments: usize) -> Vec<HwVertex> {
    let point = |s: usize| {
        let angle = s as f32 / segments as f32 * std::f32::consts::TAU;
        [angle.cos(), angle.sin(), 0.0]
    };
    (0..segments)
        .flat_map(|s| {
            [
                HwVertex::new([0.0, 0.0, 0.0], 0xFFFF_FFFF, [0.5, 0.5], [0.0, 0.0]),
                HwVertex::new(point(s), 0xFF80_80FF, [0.0, 0.0], [0.0, 0.0]),
                HwVertex::new(point(s + 1), 0xFF80_80FF, [1.0, 0.0], [0.0, 0.0]),
            ]
        })
        .collect()
}

// ============================================================================
// Entry point
// ============================================================================

/// Run the scripted scene loop and report what happened.
///
/// The driver is always shut down, and the simulated GPU stopped, before
/// returning; the first error met is returned.
pub fn run(args: &RunnerArgs) -> Result<RunSummary, GraphicsError> {
    polybridge_core::profile_function!();

    let backend = DummyBackend::new()
        .with_image_count(args.frames_in_flight)
        .with_manual_fence();
    let gpu = backend.gpu();
    let mut driver = SceneDriver::new(Arc::new(backend), args.to_config())?;
    let simulated = SimulatedGpu::spawn(gpu, args.gpu_latency())?;

    let started = Instant::now();
    let mut script = SceneScript::new(args);
    let rendered = driver
        .init()
        .and_then(|()| script.setup(&mut driver, args.static_meshes))
        .and_then(|()| (0..args.frames).try_for_each(|index| script.frame(&mut driver, index)));

    let stats = driver.stats();
    let batch = driver.batch_stats();
    let blocked = driver.blocked_time();

    let shutdown = driver.shutdown();
    let elapsed = started.elapsed();
    let gpu_completions = simulated.stop();

    rendered?;
    shutdown?;

    Ok(RunSummary {
        frames: stats.frames,
        failed_frames: stats.failed_frames,
        draws: batch.draws + stats.static_draws,
        triangles: batch.triangles,
        static_draws: stats.static_draws,
        meshes_rebuilt: script.rebuilt,
        blocked,
        elapsed,
        gpu_completions,
    })
}
