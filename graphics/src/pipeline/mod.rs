//! Frame pipeline for managing multiple frames in flight.
//!
//! This module provides [`FramePipeline`], which coordinates CPU-GPU
//! synchronization across frame slots, letting the CPU record frame N+1 while
//! the GPU still executes frame N.
//!
//! # Frame Overlap (Pipelining)
//!
//! With 2 frames in flight, the CPU and GPU work in parallel:
//!
//! ```text
//! Frame 0: [CPU record] [submit] ───────────────────────────────────────────►
//!                                [GPU execute frame 0] ─────────────────────►
//!
//! Frame 1:               [CPU record] [submit] ─────────────────────────────►
//!                                              [GPU execute frame 1] ───────►
//!
//! Frame 2:                            [wait F0] [CPU record] [submit] ──────►
//!                                                            [GPU exec F2] ─►
//!
//! Time ─────────────────────────────────────────────────────────────────────►
//! ```
//!
//! - The CPU waits only when it is about to reuse a slot whose previous frame
//!   the GPU has not finished. This is the only blocking point per frame.
//! - Frame K+2 waits on frame K, never on frame K+1.
//!
//! # Fence values
//!
//! One timeline fence serves every slot. Each [`end_frame`](FramePipeline::end_frame)
//! asks the queue to signal the next counter value and records it as the
//! slot's target:
//!
//! ```text
//! frames_in_flight = 2
//!
//! Slot 0: [value 1] ──► [value 3] ──► [value 5] ──►
//! Slot 1: [value 2] ──► [value 4] ──► [value 6] ──►
//! ```
//!
//! Slot selection follows the presentation surface's current image index,
//! since back-buffer order is decided by the surface, not by us.
//!
//! # Graceful Shutdown
//!
//! Call [`FramePipeline::drain_all`] before releasing any GPU resource. It
//! signals one more value and blocks until the GPU reaches it.

use std::time::{Duration, Instant};

use crate::backend::GpuBackend;
use crate::error::GraphicsError;

/// Minimum number of slots that still lets the CPU and GPU overlap.
pub const MIN_FRAMES_IN_FLIGHT: usize = 2;

/// Manages multiple frames in flight for CPU-GPU parallelism.
///
/// # Thread Safety
///
/// `FramePipeline` is **not thread-safe**. It should be owned by the single
/// thread that submits frames.
#[derive(Debug)]
pub struct FramePipeline {
    /// Fence target of the last frame recorded into each slot. 0 = never used.
    slot_values: Vec<u64>,

    /// Value the next `end_frame` or `drain_all` will signal.
    next_value: u64,

    /// Slot returned by the last `begin_frame` that has not ended yet.
    open_slot: Option<usize>,

    /// Optional bound on the wait in `begin_frame`.
    wait_timeout: Option<Duration>,

    /// Total frames started (for debugging/profiling).
    frame_count: u64,

    /// Time spent blocked in `begin_frame`.
    blocked: Duration,
}

impl FramePipeline {
    /// Create a pipeline with `frames_in_flight` slots.
    ///
    /// Fails with [`GraphicsError::InvalidParameter`] when fewer than
    /// [`MIN_FRAMES_IN_FLIGHT`] slots are requested.
    ///
    /// # Example
    ///
    /// ```
    /// use polybridge_graphics::pipeline::FramePipeline;
    ///
    /// let pipeline = FramePipeline::new(2).unwrap();
    /// assert_eq!(pipeline.frames_in_flight(), 2);
    /// assert!(FramePipeline::new(1).is_err());
    /// ```
    pub fn new(frames_in_flight: usize) -> Result<Self, GraphicsError> {
        if frames_in_flight < MIN_FRAMES_IN_FLIGHT {
            return Err(GraphicsError::InvalidParameter(format!(
                "frames_in_flight must be at least {MIN_FRAMES_IN_FLIGHT}, got {frames_in_flight}"
            )));
        }

        Ok(Self {
            slot_values: vec![0; frames_in_flight],
            next_value: 1,
            open_slot: None,
            wait_timeout: None,
            frame_count: 0,
            blocked: Duration::ZERO,
        })
    }

    /// Bound the fence waits. Elapsing yields [`GraphicsError::Timeout`].
    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Begin a new frame and return its slot.
    ///
    /// Blocks while the GPU has not finished the previous frame recorded into
    /// the selected slot.
    pub fn begin_frame(&mut self, backend: &dyn GpuBackend) -> Result<usize, GraphicsError> {
        if self.open_slot.is_some() {
            return Err(GraphicsError::OutOfOrder {
                operation: "begin_frame",
                phase: "a frame is open",
            });
        }

        let slot = backend.current_image_index() % self.frames_in_flight();
        let target = self.slot_values[slot];

        if target > backend.completed_value() {
            log::trace!(
                "Slot {} waits for fence value {} (completed: {})",
                slot,
                target,
                backend.completed_value()
            );
            let start = Instant::now();
            let waited = backend.wait_for_value(target, self.wait_timeout);
            let elapsed = start.elapsed();
            self.blocked += elapsed;
            polybridge_core::profile_plot!("fence_wait_ms", elapsed.as_secs_f64() * 1000.0);
            waited?;
        }

        self.open_slot = Some(slot);
        self.frame_count += 1;

        log::trace!("Begin frame {} (slot {})", self.frame_count, slot);

        Ok(slot)
    }

    /// End the frame open in `slot`.
    ///
    /// Asks the queue to signal a new fence value, records it as the slot's
    /// target and advances the counter. Does not block. Returns the value.
    pub fn end_frame(&mut self, backend: &dyn GpuBackend, slot: usize) -> Result<u64, GraphicsError> {
        if self.open_slot != Some(slot) {
            return Err(GraphicsError::InvalidParameter(format!(
                "slot {slot} is not the open frame (open: {:?})",
                self.open_slot
            )));
        }
        self.open_slot = None;

        let value = self.next_value;
        backend.signal(value)?;
        self.slot_values[slot] = value;
        self.next_value += 1;

        log::trace!(
            "End frame {} (slot {}, fence value {})",
            self.frame_count,
            slot,
            value
        );

        Ok(value)
    }

    /// Close the open frame without recording a fence target.
    ///
    /// Used when the frame failed before anything was submitted.
    pub fn abandon_frame(&mut self) {
        if let Some(slot) = self.open_slot.take() {
            log::debug!("Abandoned frame {} (slot {})", self.frame_count, slot);
        }
    }

    /// Signal one more value and wait for the GPU to reach it.
    ///
    /// Afterwards every slot is idle. Blocking and unconditional: the wait
    /// timeout only bounds `begin_frame`, never the drain.
    pub fn drain_all(&mut self, backend: &dyn GpuBackend) -> Result<(), GraphicsError> {
        let value = self.next_value;
        log::trace!("Draining GPU (fence value {})", value);

        backend.signal(value)?;
        self.next_value += 1;
        backend.wait_for_value(value, None)?;

        log::trace!("GPU idle");
        Ok(())
    }

    /// Get the number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.slot_values.len()
    }

    /// Fence value the open (or next) frame will signal.
    pub fn pending_value(&self) -> u64 {
        self.next_value
    }

    /// Highest value handed to the queue so far, 0 before the first frame.
    pub fn last_signaled_value(&self) -> u64 {
        self.next_value - 1
    }

    /// Slot of the frame between `begin_frame` and `end_frame`, if any.
    pub fn open_slot(&self) -> Option<usize> {
        self.open_slot
    }

    /// Fence target recorded for a slot, `None` for an invalid index.
    pub fn slot_fence_value(&self, slot: usize) -> Option<u64> {
        self.slot_values.get(slot).copied()
    }

    /// Get the total number of frames started.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Total time spent blocked in `begin_frame`.
    pub fn blocked_time(&self) -> Duration {
        self.blocked
    }

    /// Check if a specific frame slot is ready (non-blocking).
    ///
    /// An invalid slot index is never ready.
    pub fn is_slot_ready(&self, backend: &dyn GpuBackend, slot: usize) -> bool {
        self.slot_values
            .get(slot)
            .is_some_and(|&value| value <= backend.completed_value())
    }

    /// Check if all frame slots are ready (non-blocking).
    pub fn is_idle(&self, backend: &dyn GpuBackend) -> bool {
        let completed = backend.completed_value();
        self.slot_values.iter().all(|&value| value <= completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use rstest::rstest;

    /// One full frame: begin, end, present (which rotates the image index).
    fn run_frame(pipeline: &mut FramePipeline, backend: &DummyBackend) -> (usize, u64) {
        let slot = pipeline.begin_frame(backend).unwrap();
        let value = pipeline.end_frame(backend, slot).unwrap();
        backend.present().unwrap();
        (slot, value)
    }

    #[test]
    fn test_new() {
        let pipeline = FramePipeline::new(2).unwrap();
        assert_eq!(pipeline.frames_in_flight(), 2);
        assert_eq!(pipeline.frame_count(), 0);
        assert_eq!(pipeline.pending_value(), 1);
        assert_eq!(pipeline.last_signaled_value(), 0);
        assert_eq!(pipeline.open_slot(), None);
    }

    #[rstest]
    #[case::zero(0)]
    #[case::one(1)]
    fn test_too_few_slots_rejected(#[case] frames: usize) {
        assert!(matches!(
            FramePipeline::new(frames),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[rstest]
    #[case::double(2)]
    #[case::triple(3)]
    fn test_slots_follow_presentation(#[case] frames: usize) {
        let backend = DummyBackend::new().with_image_count(frames);
        let mut pipeline = FramePipeline::new(frames).unwrap();

        for frame in 0..(frames * 2) {
            let (slot, value) = run_frame(&mut pipeline, &backend);
            assert_eq!(slot, frame % frames);
            assert_eq!(value, frame as u64 + 1);
        }
        assert_eq!(pipeline.frame_count(), frames as u64 * 2);
    }

    #[test]
    fn test_end_frame_records_slot_value() {
        let backend = DummyBackend::new();
        let mut pipeline = FramePipeline::new(2).unwrap();

        run_frame(&mut pipeline, &backend);
        run_frame(&mut pipeline, &backend);
        assert_eq!(pipeline.slot_fence_value(0), Some(1));
        assert_eq!(pipeline.slot_fence_value(1), Some(2));
        assert_eq!(pipeline.slot_fence_value(2), None);
        assert_eq!(backend.gpu().signals(), vec![1, 2]);
    }

    #[test]
    fn test_begin_twice_is_out_of_order() {
        let backend = DummyBackend::new();
        let mut pipeline = FramePipeline::new(2).unwrap();

        pipeline.begin_frame(&backend).unwrap();
        assert!(matches!(
            pipeline.begin_frame(&backend),
            Err(GraphicsError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn test_end_frame_rejects_wrong_slot() {
        let backend = DummyBackend::new();
        let mut pipeline = FramePipeline::new(2).unwrap();

        assert!(pipeline.end_frame(&backend, 0).is_err());

        let slot = pipeline.begin_frame(&backend).unwrap();
        assert!(pipeline.end_frame(&backend, slot + 1).is_err());
        assert_eq!(pipeline.end_frame(&backend, slot), Ok(1));
    }

    #[test]
    fn test_abandon_frame_records_nothing() {
        let backend = DummyBackend::new();
        let mut pipeline = FramePipeline::new(2).unwrap();

        pipeline.begin_frame(&backend).unwrap();
        pipeline.abandon_frame();
        assert_eq!(pipeline.open_slot(), None);
        assert_eq!(pipeline.slot_fence_value(0), Some(0));
        assert_eq!(pipeline.pending_value(), 1);
        assert!(backend.gpu().signals().is_empty());
    }

    #[test]
    fn test_slot_readiness_with_lagging_gpu() {
        let backend = DummyBackend::new().with_manual_fence();
        let gpu = backend.gpu();
        let mut pipeline = FramePipeline::new(2).unwrap();

        assert!(pipeline.is_idle(&backend));
        run_frame(&mut pipeline, &backend);
        run_frame(&mut pipeline, &backend);

        assert!(!pipeline.is_slot_ready(&backend, 0));
        assert!(!pipeline.is_idle(&backend));
        assert!(!pipeline.is_slot_ready(&backend, 7));

        gpu.complete(1);
        assert!(pipeline.is_slot_ready(&backend, 0));
        assert!(!pipeline.is_slot_ready(&backend, 1));

        gpu.complete(2);
        assert!(pipeline.is_idle(&backend));
    }

    #[test]
    fn test_begin_frame_timeout() {
        let backend = DummyBackend::new().with_manual_fence();
        let mut pipeline = FramePipeline::new(2)
            .unwrap()
            .with_wait_timeout(Some(Duration::from_millis(10)));

        run_frame(&mut pipeline, &backend);
        run_frame(&mut pipeline, &backend);

        assert_eq!(pipeline.begin_frame(&backend), Err(GraphicsError::Timeout));
        assert_eq!(pipeline.open_slot(), None);
        assert!(pipeline.blocked_time() >= Duration::from_millis(10));

        backend.gpu().complete(1);
        assert_eq!(pipeline.begin_frame(&backend), Ok(0));
    }

    #[test]
    fn test_drain_all_waits_for_everything() {
        let backend = DummyBackend::new();
        let mut pipeline = FramePipeline::new(2).unwrap();

        run_frame(&mut pipeline, &backend);
        pipeline.drain_all(&backend).unwrap();

        assert_eq!(backend.completed_value(), 2);
        assert_eq!(pipeline.pending_value(), 3);
        assert!(pipeline.is_idle(&backend));
    }

    #[test]
    fn test_drain_all_outlasts_wait_timeout() {
        let backend = DummyBackend::new().with_manual_fence();
        let mut pipeline = FramePipeline::new(2)
            .unwrap()
            .with_wait_timeout(Some(Duration::from_millis(10)));

        run_frame(&mut pipeline, &backend);

        let gpu = backend.gpu();
        let worker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            gpu.complete(2);
        });

        assert_eq!(pipeline.drain_all(&backend), Ok(()));
        assert_eq!(backend.completed_value(), 2);
        worker.join().unwrap();
    }
}
