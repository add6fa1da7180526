use std::sync::Mutex;

use crate::backend::{BackendError, CommandBuffer};
use crate::sync::lock;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ListState {
    Idle,
    Recording,
    Ended,
}

impl ListState {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Ended => "ended",
        }
    }
}

/// A group command list recorded by many workers at once.
///
/// Each `record` call gets its own native encoder; the finished buffers are
/// ordered by slot at `end`, so submission follows slot order regardless of
/// which worker finished first.
pub struct WgpuCommandList {
    label: String,
    device: wgpu::Device,
    state: Mutex<ListState>,
    slots: Mutex<Vec<(usize, wgpu::CommandBuffer)>>,
}

impl WgpuCommandList {
    pub(crate) fn new(device: wgpu::Device, label: &str) -> Self {
        Self {
            label: label.to_string(),
            device,
            state: Mutex::new(ListState::Idle),
            slots: Mutex::new(Vec::new()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn invalid(&self, actual: ListState, expected: ListState) -> BackendError {
        BackendError::InvalidState {
            label: self.label.clone(),
            actual: actual.name(),
            expected: expected.name(),
        }
    }

    /// Takes the ended buffers in slot order and returns the list to idle.
    pub(crate) fn take_finished(&self) -> Result<Vec<wgpu::CommandBuffer>, BackendError> {
        let mut state = lock(&self.state);
        if *state != ListState::Ended {
            return Err(self.invalid(*state, ListState::Ended));
        }
        *state = ListState::Idle;
        Ok(std::mem::take(&mut *lock(&self.slots))
            .into_iter()
            .map(|(_, cb)| cb)
            .collect())
    }
}

impl CommandBuffer for WgpuCommandList {
    type Encoder = wgpu::CommandEncoder;

    fn begin(&self) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        if *state == ListState::Recording {
            return Err(self.invalid(*state, ListState::Idle));
        }
        // An ended but never submitted cycle is discarded.
        lock(&self.slots).clear();
        *state = ListState::Recording;
        Ok(())
    }

    fn record<R>(
        &self,
        slot: usize,
        f: impl FnOnce(&mut wgpu::CommandEncoder) -> R,
    ) -> Result<R, BackendError> {
        {
            let state = lock(&self.state);
            if *state != ListState::Recording {
                return Err(self.invalid(*state, ListState::Recording));
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&self.label),
            });
        let out = f(&mut encoder);
        lock(&self.slots).push((slot, encoder.finish()));
        Ok(out)
    }

    fn end(&self) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        if *state != ListState::Recording {
            return Err(self.invalid(*state, ListState::Recording));
        }
        lock(&self.slots).sort_by_key(|(slot, _)| *slot);
        *state = ListState::Ended;
        Ok(())
    }
}
