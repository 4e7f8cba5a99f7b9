//! Dummy GPU backend for testing and headless runs.
//!
//! This backend doesn't perform actual GPU operations. It keeps every buffer
//! in host memory and logs every command list it is asked to submit, so tests
//! can inspect exactly what the bridge recorded.
//!
//! The fence either completes as soon as it is signaled (the default) or is
//! left for someone else to complete through a [`DummyGpu`] handle, which is
//! how tests and the headless runner simulate a GPU that lags behind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::sync::Fence;
use crate::types::BufferDescriptor;

use super::{BufferId, GpuBackend, GpuBuffer, GpuCommand};

/// One submitted command list.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Frame slot the list was recorded for.
    pub slot: usize,
    pub commands: Vec<GpuCommand>,
}

impl Submission {
    /// `(first_vertex, vertex_count)` of every draw in the list.
    pub fn draws(&self) -> Vec<(u32, u32)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                GpuCommand::Draw {
                    first_vertex,
                    vertex_count,
                } => Some((*first_vertex, *vertex_count)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug)]
struct DummyState {
    image_count: usize,
    image_index: usize,
    target_size: (u32, u32),
    auto_complete: bool,
    allocation_limit: Option<u64>,
    fail_next_allocations: u32,
    fail_next_writes: u32,
    fail_present: bool,
    device_lost: bool,
    next_buffer_id: u64,
    buffers: HashMap<BufferId, Vec<u8>>,
    created_buffers: u64,
    open: Option<(usize, Vec<GpuCommand>)>,
    submissions: Vec<Submission>,
    presents: u64,
    signals: Vec<u64>,
}

impl Default for DummyState {
    fn default() -> Self {
        Self {
            image_count: 2,
            image_index: 0,
            target_size: (640, 480),
            auto_complete: true,
            allocation_limit: None,
            fail_next_allocations: 0,
            fail_next_writes: 0,
            fail_present: false,
            device_lost: false,
            next_buffer_id: 1,
            buffers: HashMap::new(),
            created_buffers: 0,
            open: None,
            submissions: Vec::new(),
            presents: 0,
            signals: Vec::new(),
        }
    }
}

impl DummyState {
    fn check_device(&self) -> Result<(), GraphicsError> {
        if self.device_lost {
            Err(GraphicsError::DeviceLost)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<DummyState>,
    fence: Fence,
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    shared: Arc<Shared>,
}

impl DummyBackend {
    /// Create a new dummy backend: two 640x480 images, auto-completing fence.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
        }
    }

    /// Set the number of presentation images.
    pub fn with_image_count(self, count: usize) -> Self {
        self.shared.state.lock().image_count = count.max(1);
        self
    }

    /// Set the presentation image size.
    pub fn with_target_size(self, width: u32, height: u32) -> Self {
        self.shared.state.lock().target_size = (width, height);
        self
    }

    /// Leave fence completion to a [`DummyGpu`] handle.
    pub fn with_manual_fence(self) -> Self {
        self.shared.state.lock().auto_complete = false;
        self
    }

    /// Fail any single allocation larger than `limit` bytes with `OutOfMemory`.
    pub fn with_allocation_limit(self, limit: Option<u64>) -> Self {
        self.shared.state.lock().allocation_limit = limit;
        self
    }

    /// Handle for inspecting the backend and driving its fence.
    pub fn gpu(&self) -> DummyGpu {
        DummyGpu {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError> {
        let mut state = self.shared.state.lock();
        state.check_device()?;

        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size must be non-zero".to_string(),
            ));
        }
        if state.fail_next_allocations > 0 {
            state.fail_next_allocations -= 1;
            log::trace!("DummyBackend: injected allocation failure");
            return Err(GraphicsError::OutOfMemory);
        }
        if let Some(limit) = state.allocation_limit
            && descriptor.size > limit
        {
            return Err(GraphicsError::OutOfMemory);
        }

        let id = BufferId(state.next_buffer_id);
        state.next_buffer_id += 1;
        state.created_buffers += 1;
        state.buffers.insert(id, vec![0u8; descriptor.size as usize]);

        log::trace!(
            "DummyBackend: creating buffer {:?} (id: {}, size: {})",
            descriptor.label,
            id.0,
            descriptor.size
        );
        Ok(GpuBuffer::new(id, descriptor.size))
    }

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let mut state = self.shared.state.lock();
        state.check_device()?;

        if state.fail_next_writes > 0 {
            state.fail_next_writes -= 1;
            return Err(GraphicsError::ResourceCreationFailed(
                "failed to map buffer".to_string(),
            ));
        }

        let Some(contents) = state.buffers.get_mut(&buffer.id()) else {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer {} was destroyed",
                buffer.id().0
            )));
        };
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                contents.len()
            )));
        }
        contents[start..end].copy_from_slice(data);

        log::trace!(
            "DummyBackend: write_buffer id={} offset={} len={}",
            buffer.id().0,
            offset,
            data.len()
        );
        Ok(())
    }

    fn destroy_buffer(&self, buffer: GpuBuffer) {
        let mut state = self.shared.state.lock();
        if state.buffers.remove(&buffer.id()).is_none() {
            log::warn!("DummyBackend: buffer {} destroyed twice", buffer.id().0);
        } else {
            log::trace!("DummyBackend: destroyed buffer {}", buffer.id().0);
        }
    }

    fn reset_commands(&self, slot: usize) -> Result<(), GraphicsError> {
        let mut state = self.shared.state.lock();
        state.check_device()?;
        if let Some((open_slot, commands)) = &state.open {
            log::warn!(
                "DummyBackend: discarding {} unsubmitted commands of slot {}",
                commands.len(),
                open_slot
            );
        }
        state.open = Some((slot, Vec::new()));
        Ok(())
    }

    fn record(&self, command: GpuCommand) -> Result<(), GraphicsError> {
        let mut state = self.shared.state.lock();
        let Some((_, commands)) = state.open.as_mut() else {
            return Err(GraphicsError::InvalidParameter(
                "no command list is open".to_string(),
            ));
        };
        log::trace!("DummyBackend: record {:?}", command);
        commands.push(command);
        Ok(())
    }

    fn submit(&self, slot: usize) -> Result<(), GraphicsError> {
        let mut state = self.shared.state.lock();
        state.check_device()?;
        match state.open.take() {
            Some((open_slot, commands)) if open_slot == slot => {
                log::trace!(
                    "DummyBackend: submitting {} commands for slot {}",
                    commands.len(),
                    slot
                );
                state.submissions.push(Submission { slot, commands });
                Ok(())
            }
            Some((open_slot, commands)) => {
                state.open = Some((open_slot, commands));
                Err(GraphicsError::InvalidParameter(format!(
                    "slot {slot} has no open command list (open: {open_slot})"
                )))
            }
            None => Err(GraphicsError::InvalidParameter(
                "no command list is open".to_string(),
            )),
        }
    }

    fn image_count(&self) -> usize {
        self.shared.state.lock().image_count
    }

    fn current_image_index(&self) -> usize {
        self.shared.state.lock().image_index
    }

    fn target_size(&self) -> (u32, u32) {
        self.shared.state.lock().target_size
    }

    fn present(&self) -> Result<(), GraphicsError> {
        let mut state = self.shared.state.lock();
        state.check_device()?;
        if state.fail_present {
            return Err(GraphicsError::SurfaceLost);
        }
        state.presents += 1;
        state.image_index = (state.image_index + 1) % state.image_count;
        Ok(())
    }

    fn signal(&self, value: u64) -> Result<(), GraphicsError> {
        let auto_complete = {
            let mut state = self.shared.state.lock();
            state.check_device()?;
            state.signals.push(value);
            state.auto_complete
        };

        // No real GPU work, so the value can complete immediately
        if auto_complete {
            self.shared.fence.signal(value);
        }
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        self.shared.fence.completed_value()
    }

    fn wait_for_value(&self, value: u64, timeout: Option<Duration>) -> Result<(), GraphicsError> {
        self.shared.state.lock().check_device()?;
        match timeout {
            None => {
                self.shared.fence.wait_for(value);
                Ok(())
            }
            Some(timeout) => {
                if self.shared.fence.wait_for_timeout(value, timeout) {
                    Ok(())
                } else {
                    Err(GraphicsError::Timeout)
                }
            }
        }
    }
}

/// Control and inspection handle for a [`DummyBackend`].
///
/// Cloneable and `Send`, so it can complete fence values from another thread
/// while the backend itself is owned by a driver.
#[derive(Debug, Clone)]
pub struct DummyGpu {
    shared: Arc<Shared>,
}

impl DummyGpu {
    /// Complete every fence value up to and including `value`.
    pub fn complete(&self, value: u64) {
        log::trace!("DummyGpu: completing fence value {}", value);
        self.shared.fence.signal(value);
    }

    /// Complete everything signaled so far.
    pub fn complete_all(&self) {
        if let Some(value) = self.last_signaled() {
            self.complete(value);
        }
    }

    /// Switch automatic completion on or off. Turning it on completes all pending values.
    pub fn set_auto_complete(&self, enabled: bool) {
        self.shared.state.lock().auto_complete = enabled;
        if enabled {
            self.complete_all();
        }
    }

    /// Shared fence, for a thread that plays the GPU.
    pub fn fence(&self) -> Fence {
        self.shared.fence.clone()
    }

    pub fn completed_value(&self) -> u64 {
        self.shared.fence.completed_value()
    }

    /// The highest value the queue was asked to signal.
    pub fn last_signaled(&self) -> Option<u64> {
        self.shared.state.lock().signals.iter().copied().max()
    }

    /// Every signal request in order.
    pub fn signals(&self) -> Vec<u64> {
        self.shared.state.lock().signals.clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.shared.state.lock().submissions.clone()
    }

    pub fn last_submission(&self) -> Option<Submission> {
        self.shared.state.lock().submissions.last().cloned()
    }

    pub fn present_count(&self) -> u64 {
        self.shared.state.lock().presents
    }

    pub fn image_index(&self) -> usize {
        self.shared.state.lock().image_index
    }

    /// Buffers created and not yet destroyed.
    pub fn live_buffers(&self) -> usize {
        self.shared.state.lock().buffers.len()
    }

    /// Buffers created over the backend's lifetime.
    pub fn created_buffers(&self) -> u64 {
        self.shared.state.lock().created_buffers
    }

    /// Current contents of a live buffer.
    pub fn buffer_contents(&self, id: BufferId) -> Option<Vec<u8>> {
        self.shared.state.lock().buffers.get(&id).cloned()
    }

    /// Fail the next `count` buffer creations with `OutOfMemory`.
    pub fn fail_next_allocations(&self, count: u32) {
        self.shared.state.lock().fail_next_allocations = count;
    }

    /// Fail the next `count` buffer writes.
    pub fn fail_next_writes(&self, count: u32) {
        self.shared.state.lock().fail_next_writes = count;
    }

    /// Change the per-allocation byte limit; `None` removes it.
    pub fn set_allocation_limit(&self, limit: Option<u64>) {
        self.shared.state.lock().allocation_limit = limit;
    }

    /// Make `present` fail with `SurfaceLost`.
    pub fn set_fail_present(&self, fail: bool) {
        self.shared.state.lock().fail_present = fail;
    }

    /// Make every queue operation fail with `DeviceLost` from now on.
    pub fn lose_device(&self) {
        self.shared.state.lock().device_lost = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PipelineVariant;

    #[test]
    fn test_buffer_lifecycle() {
        let backend = DummyBackend::new();
        let gpu = backend.gpu();

        let buffer = backend
            .create_buffer(&BufferDescriptor::vertices(8).with_label("test"))
            .unwrap();
        backend.write_buffer(&buffer, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(
            gpu.buffer_contents(buffer.id()),
            Some(vec![0, 0, 0, 0, 1, 2, 3, 4])
        );

        assert!(backend.write_buffer(&buffer, 6, &[0; 4]).is_err());

        backend.destroy_buffer(buffer);
        assert_eq!(gpu.live_buffers(), 0);
        assert_eq!(gpu.created_buffers(), 1);
    }

    #[test]
    fn test_zero_sized_buffer_rejected() {
        let backend = DummyBackend::new();
        let result = backend.create_buffer(&BufferDescriptor::vertices(0));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_allocation_failure_injection() {
        let backend = DummyBackend::new().with_allocation_limit(Some(64));
        let gpu = backend.gpu();

        assert_eq!(
            backend.create_buffer(&BufferDescriptor::vertices(65)),
            Err(GraphicsError::OutOfMemory)
        );

        gpu.fail_next_allocations(1);
        assert_eq!(
            backend.create_buffer(&BufferDescriptor::vertices(8)),
            Err(GraphicsError::OutOfMemory)
        );
        assert!(backend.create_buffer(&BufferDescriptor::vertices(8)).is_ok());

        gpu.set_allocation_limit(None);
        assert!(backend.create_buffer(&BufferDescriptor::vertices(65)).is_ok());
        gpu.set_allocation_limit(Some(16));
        assert_eq!(
            backend.create_buffer(&BufferDescriptor::vertices(17)),
            Err(GraphicsError::OutOfMemory)
        );
    }

    #[test]
    fn test_record_requires_open_list() {
        let backend = DummyBackend::new();
        assert!(
            backend
                .record(GpuCommand::SetPipeline(PipelineVariant::Solid))
                .is_err()
        );

        backend.reset_commands(1).unwrap();
        backend
            .record(GpuCommand::Draw {
                first_vertex: 0,
                vertex_count: 3,
            })
            .unwrap();
        assert!(backend.submit(0).is_err());
        backend.submit(1).unwrap();

        let submission = backend.gpu().last_submission().unwrap();
        assert_eq!(submission.slot, 1);
        assert_eq!(submission.draws(), vec![(0, 3)]);
    }

    #[test]
    fn test_present_rotates_images() {
        let backend = DummyBackend::new().with_image_count(3);
        assert_eq!(backend.current_image_index(), 0);
        for expected in [1, 2, 0] {
            backend.present().unwrap();
            assert_eq!(backend.current_image_index(), expected);
        }
        assert_eq!(backend.gpu().present_count(), 3);
    }

    #[test]
    fn test_auto_complete_fence() {
        let backend = DummyBackend::new();
        backend.signal(4).unwrap();
        assert_eq!(backend.completed_value(), 4);
        backend.wait_for_value(4, None).unwrap();
    }

    #[test]
    fn test_manual_fence() {
        let backend = DummyBackend::new().with_manual_fence();
        let gpu = backend.gpu();

        backend.signal(1).unwrap();
        backend.signal(2).unwrap();
        assert_eq!(backend.completed_value(), 0);
        assert_eq!(
            backend.wait_for_value(1, Some(Duration::from_millis(5))),
            Err(GraphicsError::Timeout)
        );

        gpu.complete(1);
        backend.wait_for_value(1, Some(Duration::from_millis(5))).unwrap();
        assert_eq!(gpu.last_signaled(), Some(2));

        gpu.complete_all();
        assert_eq!(backend.completed_value(), 2);
    }

    #[test]
    fn test_device_lost() {
        let backend = DummyBackend::new();
        backend.gpu().lose_device();
        assert_eq!(backend.signal(1), Err(GraphicsError::DeviceLost));
        assert_eq!(backend.present(), Err(GraphicsError::DeviceLost));
        assert_eq!(
            backend.wait_for_value(0, None),
            Err(GraphicsError::DeviceLost)
        );
    }
}
