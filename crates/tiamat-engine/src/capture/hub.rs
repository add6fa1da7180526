use std::io::Write;
use std::sync::{Arc, Mutex, Weak};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::backend::BackendError;
use crate::sync::lock;

use super::hook::HookShared;
use super::{CaptureError, CapturedFrame, FrameHook, ScreenshotFormat, encode};

struct ScreenshotRequest {
    writer: Box<dyn Write + Send>,
    format: ScreenshotFormat,
    quality: u8,
    done: oneshot::Sender<Result<(), CaptureError>>,
}

/// Completion of one screenshot request.
pub struct ScreenshotTicket {
    rx: oneshot::Receiver<Result<(), CaptureError>>,
}

impl ScreenshotTicket {
    pub async fn wait(self) -> Result<(), CaptureError> {
        self.rx.await.unwrap_or(Err(CaptureError::Cancelled))
    }

    /// Blocking variant for plain threads.
    pub fn blocking_wait(self) -> Result<(), CaptureError> {
        self.rx.blocking_recv().unwrap_or(Err(CaptureError::Cancelled))
    }
}

/// Capture work collected for one frame.
#[derive(Default)]
pub struct CapturePlan {
    requests: Vec<ScreenshotRequest>,
    hooks: Vec<Arc<HookShared>>,
}

impl CapturePlan {
    /// `true` when this frame needs no readback.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.hooks.is_empty()
    }

    pub fn screenshots(&self) -> usize {
        self.requests.len()
    }

    pub fn hooks(&self) -> usize {
        self.hooks.len()
    }
}

/// Collects screenshot requests and frame hooks from any thread and fulfils
/// them from the render thread's single per-frame readback.
pub struct CaptureHub {
    requests: Mutex<Vec<ScreenshotRequest>>,
    hooks: Mutex<Vec<Weak<HookShared>>>,
    runtime: Handle,
}

impl CaptureHub {
    pub fn new(runtime: Handle) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            runtime,
        }
    }

    /// Queues a screenshot of the next rendered frame.
    ///
    /// `quality` is clamped to 1..=100 and only affects JPEG.
    pub fn take_screenshot<W>(&self, writer: W, format: ScreenshotFormat, quality: u8) -> ScreenshotTicket
    where
        W: Write + Send + 'static,
    {
        let (done, rx) = oneshot::channel();
        lock(&self.requests).push(ScreenshotRequest {
            writer: Box::new(writer),
            format,
            quality: quality.clamp(1, 100),
            done,
        });
        ScreenshotTicket { rx }
    }

    /// Attaches a frame hook holding at most `capacity` frames.
    pub fn add_frame_hook(&self, capacity: usize, frame_skip: u32) -> FrameHook {
        let hook = FrameHook::new(capacity, frame_skip);
        lock(&self.hooks).push(Arc::downgrade(hook.shared()));
        hook
    }

    pub fn pending_screenshots(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn hook_count(&self) -> usize {
        lock(&self.hooks).iter().filter(|h| h.strong_count() > 0).count()
    }

    /// Takes pending requests and the hooks due this frame. Detached hooks are
    /// pruned here.
    pub fn plan(&self) -> CapturePlan {
        let requests = std::mem::take(&mut *lock(&self.requests));
        let mut hooks = Vec::new();
        lock(&self.hooks).retain(|weak| match weak.upgrade() {
            Some(hook) => {
                if hook.tick() {
                    hooks.push(hook);
                }
                true
            }
            None => false,
        });
        CapturePlan { requests, hooks }
    }

    /// Hands the frame's readback to every consumer in `plan`.
    pub fn fulfill(&self, plan: CapturePlan, frame: Result<CapturedFrame, BackendError>) {
        let frame = match frame {
            Ok(frame) => Arc::new(frame),
            Err(err) => {
                log::error!("frame readback failed: {err}");
                let msg = err.to_string();
                for req in plan.requests {
                    let _ = req.done.send(Err(CaptureError::Readback(msg.clone())));
                }
                return;
            }
        };

        for hook in &plan.hooks {
            hook.push(Arc::clone(&frame));
        }

        for req in plan.requests {
            let frame = Arc::clone(&frame);
            let _ = self.runtime.spawn_blocking(move || {
                let ScreenshotRequest {
                    mut writer,
                    format,
                    quality,
                    done,
                } = req;
                let result = encode(&frame, format, quality, &mut *writer);
                if let Err(err) = &result {
                    log::error!("screenshot encode failed: {err}");
                }
                let _ = done.send(result);
            });
        }
    }

    /// Fails every pending request. Used at shutdown.
    pub fn cancel_pending(&self) {
        let requests = std::mem::take(&mut *lock(&self.requests));
        for req in requests {
            let _ = req.done.send(Err(CaptureError::Cancelled));
        }
    }
}
