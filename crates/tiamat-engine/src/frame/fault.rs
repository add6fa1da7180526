use std::fmt::Display;
use std::sync::{Arc, Mutex};

use crate::sync::lock;

use super::FrameError;

/// First-wins fault slot shared between the render and window threads.
#[derive(Clone, Default)]
pub struct WindowFault {
    slot: Arc<Mutex<Option<String>>>,
}

impl WindowFault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `fault` unless one is already recorded.
    pub fn record(&self, fault: impl Display) {
        let mut slot = lock(&self.slot);
        if slot.is_none() {
            *slot = Some(fault.to_string());
        }
    }

    pub fn is_faulted(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Returns the recorded fault as an error without clearing it.
    pub fn raise_if_faulted(&self) -> Result<(), FrameError> {
        match lock(&self.slot).as_ref() {
            Some(msg) => Err(FrameError::Window(msg.clone())),
            None => Ok(()),
        }
    }

    pub fn take(&self) -> Option<String> {
        lock(&self.slot).take()
    }
}
