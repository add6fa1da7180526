use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::backend::{Backend, CommandBuffer, GpuDevice, TargetDescriptor};
use crate::draw::{DrawOperation, DrawingLock};
use crate::error::DrawError;
use crate::sync::lock;

type Ops<B> = Vec<Arc<dyn DrawOperation<B>>>;

/// State handed back from the recording task to the render thread.
struct CycleSlot<B: Backend> {
    fault: Option<DrawError>,
    /// The cycle's (cleared) operation buffer, returned for reuse.
    ops: Ops<B>,
}

/// One recording cycle per frame for one command-list group.
///
/// ```text
/// Idle ──add*/set_targets/start──▶ Recording ──wait_for_end──▶ Idle
/// ```
///
/// `start` and `wait_for_end` block the calling thread; call them from the
/// render thread, never from inside the worker runtime.
pub struct CommandListDispatch<B: Backend> {
    label: String,
    buffer: Arc<B::CommandBuffer>,
    ops: Ops<B>,
    targets: Vec<TargetDescriptor<B>>,
    started: bool,
    gate: Arc<Semaphore>,
    cycle: Arc<Mutex<CycleSlot<B>>>,
    drawing: DrawingLock,
    runtime: Handle,
}

impl<B: Backend> CommandListDispatch<B> {
    pub fn new(
        label: impl Into<String>,
        device: &B::Device,
        drawing: DrawingLock,
        runtime: Handle,
        expected_ops: usize,
    ) -> Self {
        let label = label.into();
        Self {
            buffer: Arc::new(device.create_command_buffer(&label)),
            label,
            ops: Vec::with_capacity(expected_ops),
            targets: Vec::new(),
            started: false,
            gate: Arc::new(Semaphore::new(1)),
            cycle: Arc::new(Mutex::new(CycleSlot {
                fault: None,
                ops: Vec::new(),
            })),
            drawing,
            runtime,
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn buffer(&self) -> &Arc<B::CommandBuffer> {
        &self.buffer
    }

    /// Operations added for the cycle being assembled.
    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn set_targets(&mut self, targets: &[TargetDescriptor<B>]) {
        self.targets.clear();
        self.targets.extend_from_slice(targets);
    }

    pub fn add(&mut self, op: Arc<dyn DrawOperation<B>>) {
        self.ops.push(op);
    }

    /// Starts recording the added operations against every target.
    ///
    /// No-op without operations. Blocks while a previous cycle of this dispatch
    /// is still recording.
    pub fn start(&mut self, delta: f32) -> Result<(), DrawError> {
        if self.ops.is_empty() {
            return Ok(());
        }
        if self.targets.is_empty() {
            self.ops.clear();
            return Err(DrawError::MissingTargets {
                label: self.label.clone(),
            });
        }

        let permit = self
            .runtime
            .block_on(Arc::clone(&self.gate).acquire_owned())
            .map_err(|_| DrawError::GateClosed {
                label: self.label.clone(),
            })?;
        // Taken before spawning so a release issued after `start` returns
        // always waits for this cycle.
        let shared = self.runtime.block_on(self.drawing.shared());

        let ops = std::mem::take(&mut self.ops);
        let targets = std::mem::take(&mut self.targets);
        let buffer = Arc::clone(&self.buffer);
        let cycle = Arc::clone(&self.cycle);
        let label = self.label.clone();

        log::trace!(
            "dispatch `{}`: recording {} ops x {} targets",
            label,
            ops.len(),
            targets.len()
        );

        self.runtime.spawn(async move {
            let _permit = permit;
            let _shared = shared;

            let result = record(&buffer, &ops, &targets, delta).await;

            let mut ops = ops;
            ops.clear();
            drop(targets);

            let mut slot = lock(&cycle);
            slot.ops = ops;
            if let Err(err) = result {
                log::error!("dispatch `{}`: {}", label, err);
                if slot.fault.is_none() {
                    slot.fault = Some(err);
                }
            }
        });

        self.started = true;
        Ok(())
    }

    /// Waits for the started cycle and hands back its command buffer.
    ///
    /// Returns `Ok(None)` when nothing was started, the cycle's first fault if
    /// any, otherwise the ended buffer ready for submission. The operation
    /// buffer is reset in every case.
    pub fn wait_for_end(&mut self) -> Result<Option<Arc<B::CommandBuffer>>, DrawError> {
        self.targets.clear();
        if !std::mem::take(&mut self.started) {
            self.ops.clear();
            return Ok(None);
        }

        let permit = self
            .runtime
            .block_on(self.gate.acquire())
            .map_err(|_| DrawError::GateClosed {
                label: self.label.clone(),
            })?;
        drop(permit);

        let fault = {
            let mut slot = lock(&self.cycle);
            if self.ops.is_empty() {
                std::mem::swap(&mut self.ops, &mut slot.ops);
            }
            slot.fault.take()
        };
        self.ops.clear();

        match fault {
            Some(err) => Err(err),
            None => Ok(Some(Arc::clone(&self.buffer))),
        }
    }
}

/// Begin, fan out one task per (operation, target) pair, join, end.
///
/// Pair `(i, t)` records into slot `i * targets + t`, so the ended buffer
/// replays operations in the order they were added.
async fn record<B: Backend>(
    buffer: &Arc<B::CommandBuffer>,
    ops: &[Arc<dyn DrawOperation<B>>],
    targets: &[TargetDescriptor<B>],
    delta: f32,
) -> Result<(), DrawError> {
    buffer.begin()?;

    let mut tasks = JoinSet::new();
    for (i, op) in ops.iter().enumerate() {
        for (t, target) in targets.iter().enumerate() {
            let op = Arc::clone(op);
            let buffer = Arc::clone(buffer);
            let target = target.clone();
            let slot = i * targets.len() + t;
            tasks.spawn(async move { op.internal_draw(delta, &buffer, &target, slot).await });
        }
    }

    let mut fault = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(DrawError::from_join).and_then(|r| r);
        if let Err(err) = result {
            match fault {
                None => fault = Some(err),
                Some(_) => log::debug!("additional draw fault in the same cycle: {err}"),
            }
        }
    }

    let ended = buffer.end();
    match fault {
        Some(err) => Err(err),
        None => ended.map_err(DrawError::from),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::draw::{DrawManager, DrawOp};
    use crate::testing::{
        SpyBackend, SpyEvent, TestHooks, spy_manager, spy_target, spy_target_named,
        test_runtime,
    };

    type Op = Arc<DrawOp<SpyBackend, TestHooks>>;

    fn dispatch(m: &DrawManager<SpyBackend>, rt: &tokio::runtime::Runtime) -> CommandListDispatch<SpyBackend> {
        CommandListDispatch::new(
            "g0",
            m.device().as_ref(),
            m.drawing_lock().clone(),
            rt.handle().clone(),
            4,
        )
    }

    fn registered(m: &DrawManager<SpyBackend>, rt: &tokio::runtime::Runtime, hooks: TestHooks) -> Op {
        let op = Arc::new(DrawOp::new(hooks));
        rt.block_on(m.add_and_register(op.clone())).unwrap();
        op
    }

    // ── empty cycle ───────────────────────────────────────────────────────

    #[test]
    fn start_without_ops_never_touches_buffer() {
        let rt = test_runtime();
        let m = spy_manager(1);
        let mut d = dispatch(&m, &rt);

        d.start(0.016).unwrap();
        assert!(!d.is_started());
        assert!(d.wait_for_end().unwrap().is_none());
        assert_eq!(d.buffer().begins(), 0);
        assert_eq!(d.buffer().ends(), 0);
    }

    #[test]
    fn start_without_targets_is_fatal() {
        let rt = test_runtime();
        let m = spy_manager(1);
        let mut d = dispatch(&m, &rt);
        d.add(registered(&m, &rt, TestHooks::new("a")));

        let err = d.start(0.016).unwrap_err();
        assert!(matches!(err, DrawError::MissingTargets { .. }));
        assert!(err.is_fatal());
        assert!(d.is_empty());
    }

    // ── recording ─────────────────────────────────────────────────────────

    #[test]
    fn records_every_pair_in_add_order() {
        let rt = test_runtime();
        let m = spy_manager(1);
        let mut d = dispatch(&m, &rt);
        for tag in ["a", "b", "c"] {
            d.add(registered(&m, &rt, TestHooks::new(tag)));
        }
        d.set_targets(&[spy_target_named("l", 1), spy_target_named("r", 1)]);

        d.start(0.016).unwrap();
        let buffer = d.wait_for_end().unwrap().unwrap();

        assert_eq!(buffer.begins(), 1);
        assert_eq!(buffer.ends(), 1);
        assert_eq!(buffer.slots(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(buffer.tags(), vec!["a@l", "a@r", "b@l", "b@r", "c@l", "c@r"]);
        assert!(d.is_empty());
    }

    #[test]
    fn one_op_is_never_drawn_concurrently() {
        let rt = test_runtime();
        let m = spy_manager(1);
        let mut d = dispatch(&m, &rt);
        let op = registered(
            &m,
            &rt,
            TestHooks::new("slow").with_delay(Duration::from_millis(20)),
        );
        d.add(op.clone());
        d.set_targets(&[
            spy_target_named("a", 1),
            spy_target_named("b", 1),
            spy_target_named("c", 1),
        ]);

        d.start(0.0).unwrap();
        d.wait_for_end().unwrap();

        assert_eq!(op.hooks().draws.load(Ordering::SeqCst), 3);
        assert_eq!(op.hooks().overlaps.load(Ordering::SeqCst), 0);
        // One upload for the registration's pending update, shared by all targets.
        assert_eq!(m.device().writes(), 1);
    }

    // ── faults ────────────────────────────────────────────────────────────

    #[test]
    fn fault_is_reported_once_then_cleared() {
        let rt = test_runtime();
        let m = spy_manager(1);
        let mut d = dispatch(&m, &rt);

        for i in 0..6 {
            let hooks = TestHooks::new(format!("op{i}"));
            let hooks = if i == 3 { hooks.failing_draw() } else { hooks };
            d.add(registered(&m, &rt, hooks));
        }
        d.set_targets(&[spy_target()]);
        d.start(0.0).unwrap();
        let err = d.wait_for_end().unwrap_err();
        assert!(matches!(err, DrawError::Hook(_)));
        assert!(err.to_string().contains("op3"));
        assert_eq!(d.buffer().begins(), d.buffer().ends());

        d.add(registered(&m, &rt, TestHooks::new("ok")));
        d.set_targets(&[spy_target()]);
        d.start(0.0).unwrap();
        let buffer = d.wait_for_end().unwrap().unwrap();
        assert_eq!(buffer.tags(), vec!["ok@main"]);
    }

    #[test]
    fn panic_is_captured_as_fault() {
        let rt = test_runtime();
        let m = spy_manager(1);
        let mut d = dispatch(&m, &rt);
        d.add(registered(&m, &rt, TestHooks::new("p").panicking_draw()));
        d.add(registered(&m, &rt, TestHooks::new("q")));
        d.set_targets(&[spy_target()]);

        d.start(0.0).unwrap();
        match d.wait_for_end() {
            Err(DrawError::Panicked(msg)) => assert!(msg.contains("p panicked")),
            other => panic!("expected panic fault, got {:?}", other.map(|b| b.is_some())),
        }
        assert_eq!(d.buffer().ends(), 1);
    }

    #[test]
    fn unregistered_op_faults_the_cycle() {
        let rt = test_runtime();
        let m = spy_manager(1);
        let mut d = dispatch(&m, &rt);
        let op = Arc::new(DrawOp::new(TestHooks::new("raw")));
        m.add(op.clone()).unwrap();
        d.add(op);
        d.set_targets(&[spy_target()]);

        d.start(0.0).unwrap();
        assert!(matches!(d.wait_for_end(), Err(DrawError::NotReady(_))));
    }

    #[test]
    fn op_removed_before_start_is_skipped() {
        let rt = test_runtime();
        let m = spy_manager(1);
        let mut d = dispatch(&m, &rt);
        let kept = registered(&m, &rt, TestHooks::new("kept"));
        let gone = registered(&m, &rt, TestHooks::new("gone"));
        d.add(kept.clone());
        d.add(gone.clone());
        let key = gone.owner().unwrap().key;
        rt.block_on(m.remove(key)).unwrap();
        d.set_targets(&[spy_target()]);

        d.start(0.0).unwrap();
        let buffer = d.wait_for_end().unwrap().unwrap();
        assert_eq!(buffer.tags(), vec!["kept@main"]);
        assert_eq!(gone.hooks().draws.load(Ordering::SeqCst), 0);
        assert_eq!(buffer.begins(), buffer.ends());
    }

    // ── serialization ─────────────────────────────────────────────────────

    #[test]
    fn second_start_waits_for_first_cycle() {
        let rt = test_runtime();
        let m = spy_manager(1);
        let mut d = dispatch(&m, &rt);
        let slow = registered(
            &m,
            &rt,
            TestHooks::new("slow").with_delay(Duration::from_millis(30)),
        );

        d.add(slow.clone());
        d.set_targets(&[spy_target()]);
        d.start(0.0).unwrap();

        d.add(slow.clone());
        d.set_targets(&[spy_target()]);
        d.start(0.0).unwrap();
        d.wait_for_end().unwrap();

        assert_eq!(d.buffer().begins(), 2);
        assert_eq!(d.buffer().ends(), 2);
        let events = m.device().events();
        assert_eq!(
            events,
            vec![
                SpyEvent::Begin("g0".into()),
                SpyEvent::End("g0".into()),
                SpyEvent::Begin("g0".into()),
                SpyEvent::End("g0".into()),
            ]
        );
    }

    #[test]
    fn release_waits_for_in_flight_recording() {
        let rt = test_runtime();
        let m = spy_manager(1);
        let mut d = dispatch(&m, &rt);
        let op = Arc::new(DrawOp::new(
            TestHooks::new("slow").with_delay(Duration::from_millis(30)),
        ));
        let key = rt.block_on(m.add_and_register(op.clone())).unwrap();

        d.add(op);
        d.set_targets(&[spy_target()]);
        d.start(0.0).unwrap();
        rt.block_on(m.remove(key)).unwrap();
        d.wait_for_end().unwrap();

        let events = m.device().events();
        let end = events.iter().position(|e| matches!(e, SpyEvent::End(_))).unwrap();
        let destroy = events
            .iter()
            .position(|e| matches!(e, SpyEvent::Destroy(_)))
            .unwrap();
        assert!(end < destroy, "{events:?}");
    }
}
