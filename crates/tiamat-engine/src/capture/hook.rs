use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use super::CapturedFrame;

pub(crate) struct HookShared {
    tx: Sender<Arc<CapturedFrame>>,
    rx: Receiver<Arc<CapturedFrame>>,
    frame_skip: AtomicU32,
    counter: AtomicU64,
    dropped: AtomicU64,
}

impl HookShared {
    /// Advances the per-hook frame counter; `true` if this frame should be captured.
    pub(crate) fn tick(&self) -> bool {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let every = self.frame_skip.load(Ordering::Relaxed) as u64 + 1;
        n % every == 0
    }

    /// Pushes a frame, dropping the oldest queued one when full.
    pub(crate) fn push(&self, frame: Arc<CapturedFrame>) {
        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(f)) => {
                    if self.rx.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        log::warn!("frame hook queue full; dropped oldest frame");
                    }
                    frame = f;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// Consumer handle of a frame-capture stream.
///
/// Dropping the handle detaches the hook.
pub struct FrameHook {
    shared: Arc<HookShared>,
}

impl FrameHook {
    pub(crate) fn new(capacity: usize, frame_skip: u32) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            shared: Arc::new(HookShared {
                tx,
                rx,
                frame_skip: AtomicU32::new(frame_skip),
                counter: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<HookShared> {
        &self.shared
    }

    /// Returns the oldest queued frame without blocking.
    pub fn next_frame(&self) -> Option<Arc<CapturedFrame>> {
        self.shared.rx.try_recv().ok()
    }

    pub fn wait_frame(&self, timeout: Duration) -> Option<Arc<CapturedFrame>> {
        self.shared.rx.recv_timeout(timeout).ok()
    }

    /// Captures one frame out of every `frame_skip + 1`.
    pub fn set_frame_skip(&self, frame_skip: u32) {
        self.shared.frame_skip.store(frame_skip, Ordering::Relaxed);
    }

    pub fn frame_skip(&self) -> u32 {
        self.shared.frame_skip.load(Ordering::Relaxed)
    }

    pub fn queued(&self) -> usize {
        self.shared.rx.len()
    }

    /// Frames discarded because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}
