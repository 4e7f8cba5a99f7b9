//! CPU-GPU synchronization primitives.
//!
//! [`Fence`] is a timeline fence: a single counter that only moves forward.
//! Work submitted to the GPU is tagged with the value the GPU will write when
//! it finishes, and the CPU waits for "counter >= value" instead of tracking
//! one binary fence per submission.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct FenceState {
    completed: Mutex<u64>,
    signaled: Condvar,
}

/// Monotonically increasing CPU-GPU completion counter.
///
/// Clones share the same counter, so one clone can be handed to the thread
/// that plays the GPU while another is waited on.
///
/// # Example
///
/// ```
/// use polybridge_graphics::sync::Fence;
///
/// let fence = Fence::new();
/// let gpu = fence.clone();
/// std::thread::spawn(move || gpu.signal(3));
/// fence.wait_for(3);
/// assert!(fence.is_complete(3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Fence {
    state: Arc<FenceState>,
}

impl Fence {
    /// Create a fence with completed value 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The highest value signaled so far.
    pub fn completed_value(&self) -> u64 {
        *self.state.completed.lock()
    }

    /// Whether the counter has reached `value` (non-blocking).
    pub fn is_complete(&self, value: u64) -> bool {
        self.completed_value() >= value
    }

    /// Advance the counter to `value` and wake waiters.
    ///
    /// Signaling a value lower than the current one is ignored.
    pub fn signal(&self, value: u64) {
        let mut completed = self.state.completed.lock();
        if value > *completed {
            *completed = value;
            self.state.signaled.notify_all();
        }
    }

    /// Block until the counter reaches `value`.
    pub fn wait_for(&self, value: u64) {
        let mut completed = self.state.completed.lock();
        while *completed < value {
            self.state.signaled.wait(&mut completed);
        }
    }

    /// Block until the counter reaches `value` or `timeout` elapses.
    ///
    /// Returns `true` if the value was reached.
    pub fn wait_for_timeout(&self, value: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut completed = self.state.completed.lock();
        while *completed < value {
            if self
                .state
                .signaled
                .wait_until(&mut completed, deadline)
                .timed_out()
            {
                return *completed >= value;
            }
        }
        true
    }
}
