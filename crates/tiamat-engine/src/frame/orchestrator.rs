use std::sync::Arc;

use tokio::runtime::Handle;

use crate::backend::{Backend, FrameSurface, GpuDevice};
use crate::capture::CaptureHub;
use crate::dispatch::CommandListDispatch;
use crate::draw::{CommandListGroup, DrawManager};
use crate::input::InputSnapshot;

use super::{FrameError, PendingWindowWork};

/// Per-group outcome of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupReport {
    pub group: CommandListGroup,
    /// Priorities handed to the dispatch, in the order they were added.
    pub priorities: Vec<f32>,
    /// Queued operations skipped because they were not ready.
    pub not_ready: usize,
    pub submitted: bool,
}

/// Diagnostics of one `render_frame` pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameReport {
    pub frame_index: u64,
    /// No framebuffer was available; nothing was recorded or presented.
    pub skipped: bool,
    pub groups: Vec<GroupReport>,
    /// A readback was taken for screenshots or frame hooks.
    pub captured: bool,
}

impl FrameReport {
    pub fn drawn(&self) -> usize {
        self.groups.iter().map(|g| g.priorities.len()).sum()
    }
}

type EndOfFrameHook = Box<dyn FnMut(&FrameReport, &InputSnapshot) + Send>;

/// Drives one frame on the render thread: drain queues into dispatches, record
/// all groups concurrently, submit in group order, capture, present.
pub struct FrameOrchestrator<B: Backend, S: FrameSurface<B>> {
    manager: Arc<DrawManager<B>>,
    dispatches: Vec<CommandListDispatch<B>>,
    surface: S,
    capture: Arc<CaptureHub>,
    window_work: Option<Arc<dyn PendingWindowWork>>,
    end_of_frame: Vec<EndOfFrameHook>,
    frame_index: u64,
}

impl<B: Backend, S: FrameSurface<B>> FrameOrchestrator<B, S> {
    pub fn new(manager: Arc<DrawManager<B>>, surface: S, runtime: Handle) -> Self {
        let groups = manager.groups();
        let dispatches = groups
            .iter()
            .map(|g| {
                CommandListDispatch::new(
                    format!("group {}", g.0),
                    manager.device().as_ref(),
                    manager.drawing_lock().clone(),
                    runtime.clone(),
                    groups.expected_ops,
                )
            })
            .collect();

        Self {
            manager,
            dispatches,
            surface,
            capture: Arc::new(CaptureHub::new(runtime)),
            window_work: None,
            end_of_frame: Vec::new(),
            frame_index: 0,
        }
    }

    pub fn with_window_work(mut self, work: Arc<dyn PendingWindowWork>) -> Self {
        self.window_work = Some(work);
        self
    }

    #[inline]
    pub fn manager(&self) -> &Arc<DrawManager<B>> {
        &self.manager
    }

    #[inline]
    pub fn capture(&self) -> &Arc<CaptureHub> {
        &self.capture
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[inline]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Registers a hook run after every presented frame.
    pub fn on_end_of_frame(&mut self, hook: impl FnMut(&FrameReport, &InputSnapshot) + Send + 'static) {
        self.end_of_frame.push(Box::new(hook));
    }

    pub fn resize(&mut self, width: u32, height: u32, scale_factor: f64) {
        self.surface
            .resize(self.manager.device(), width, height, scale_factor);
    }

    /// Renders one frame.
    ///
    /// A dispatch fault aborts only that group's submission: every group is
    /// still awaited and the frame is presented, then the first fault is
    /// returned. Later faults of the same frame are logged.
    pub fn render_frame(
        &mut self,
        delta: f32,
        input: &InputSnapshot,
    ) -> Result<FrameReport, FrameError> {
        self.frame_index += 1;
        let mut report = FrameReport {
            frame_index: self.frame_index,
            ..FrameReport::default()
        };

        if let Some(work) = &self.window_work {
            work.wake_if_pending();
        }

        let device = Arc::clone(self.manager.device());
        let Some(targets) = self.surface.acquire(&device)? else {
            let dropped: usize = self
                .manager
                .groups()
                .iter()
                .map(|g| self.manager.queue().drain(g).len())
                .sum();
            log::warn!(
                "frame {}: no framebuffer, skipped ({} queued draws dropped)",
                self.frame_index,
                dropped
            );
            report.skipped = true;
            return Ok(report);
        };

        let mut fault: Option<FrameError> = None;

        // Drain and start every group.
        for (i, dispatch) in self.dispatches.iter_mut().enumerate() {
            let group = CommandListGroup(i as u8);
            let mut gr = GroupReport {
                group,
                priorities: Vec::new(),
                not_ready: 0,
                submitted: false,
            };
            for queued in self.manager.queue().drain(group) {
                if !queued.op.is_ready() {
                    gr.not_ready += 1;
                    continue;
                }
                gr.priorities.push(queued.priority.0);
                dispatch.add(queued.op);
            }
            dispatch.set_targets(&targets);
            if let Err(source) = dispatch.start(delta) {
                keep_first(&mut fault, FrameError::Dispatch { group, source });
            }
            report.groups.push(gr);
        }

        // Capture work is planned while recording runs.
        let plan = self.capture.plan();

        // Await and submit in group order.
        for (i, dispatch) in self.dispatches.iter_mut().enumerate() {
            let group = CommandListGroup(i as u8);
            match dispatch.wait_for_end() {
                Ok(Some(buffer)) => match device.submit(&buffer) {
                    Ok(()) => report.groups[i].submitted = true,
                    Err(err) => keep_first(&mut fault, err.into()),
                },
                Ok(None) => {}
                Err(source) => keep_first(&mut fault, FrameError::Dispatch { group, source }),
            }
        }

        // Framebuffer handles must not outlive the frame.
        drop(targets);

        if !plan.is_empty() {
            let frame = self.surface.read_back(&device);
            report.captured = frame.is_ok();
            self.capture.fulfill(plan, frame);
        }

        self.surface.present(&device);

        for hook in &mut self.end_of_frame {
            hook(&report, input);
        }

        log::trace!(
            "frame {}: {} draws over {} groups",
            report.frame_index,
            report.drawn(),
            report.groups.len()
        );

        match fault {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Fails outstanding capture requests and releases every operation.
    pub fn shutdown(&mut self, runtime: &Handle) {
        self.capture.cancel_pending();
        runtime.block_on(self.manager.dispose_all());
    }
}

fn keep_first(slot: &mut Option<FrameError>, err: FrameError) {
    log::error!("{err}");
    if slot.is_none() {
        *slot = Some(err);
    }
}
