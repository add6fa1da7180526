//! Recording test backend.
//!
//! Every device and command-buffer call lands in a shared event log so tests can
//! assert ordering (begin/end pairing, submit order, release vs recording).

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use glam::Vec2;

use crate::backend::{
    Backend, BackendError, BufferDesc, BufferUsage, CommandBuffer, DrawParams, FrameSurface,
    GpuDevice, TargetDescriptor,
};
use crate::capture::CapturedFrame;
use crate::draw::{
    CommandListGroups, DrawCtx, DrawHooks, DrawManager, RegisterCtx, ResourceSetDesc, ResourceSets,
};
use crate::sync::lock;

pub struct SpyBackend;

impl Backend for SpyBackend {
    type Device = SpyDevice;
    type CommandBuffer = SpyCommandBuffer;
    type Target = SpyTarget;
    type Framebuffer = SpyFramebuffer;
    type Buffer = SpyBuffer;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpyEvent {
    Begin(String),
    End(String),
    Submit(String),
    Destroy(u64),
    Acquire,
    ReadBack,
    Present,
}

pub type EventLog = Arc<Mutex<Vec<SpyEvent>>>;

#[derive(Debug)]
pub struct SpyBuffer {
    pub id: u64,
    pub usage: BufferUsage,
    pub size: u64,
}

#[derive(Default)]
pub struct SpyDevice {
    next_id: AtomicU64,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    writes: AtomicUsize,
    pub events: EventLog,
}

impl SpyDevice {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<SpyEvent> {
        lock(&self.events).clone()
    }

    pub fn submitted(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SpyEvent::Submit(label) => Some(label),
                _ => None,
            })
            .collect()
    }
}

impl GpuDevice<SpyBackend> for SpyDevice {
    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<SpyBuffer, BackendError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(SpyBuffer {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            usage: desc.usage,
            size: desc.contents.map_or(desc.size, |c| c.len() as u64),
        })
    }

    fn write_buffer(&self, _buffer: &SpyBuffer, _offset: u64, _data: &[u8]) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy_buffer(&self, buffer: &SpyBuffer) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        lock(&self.events).push(SpyEvent::Destroy(buffer.id));
    }

    fn create_command_buffer(&self, label: &str) -> SpyCommandBuffer {
        SpyCommandBuffer {
            label: label.to_string(),
            events: Arc::clone(&self.events),
            recording: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            begins: AtomicUsize::new(0),
            ends: AtomicUsize::new(0),
            records: Mutex::new(Vec::new()),
        }
    }

    fn submit(&self, buffer: &SpyCommandBuffer) -> Result<(), BackendError> {
        if !buffer.ended.load(Ordering::SeqCst) {
            return Err(BackendError::InvalidState {
                label: buffer.label.clone(),
                actual: "recording",
                expected: "ended",
            });
        }
        lock(&self.events).push(SpyEvent::Submit(buffer.label.clone()));
        Ok(())
    }
}

/// Command buffer whose encoder is a list of tags.
#[derive(Debug)]
pub struct SpyCommandBuffer {
    pub label: String,
    events: EventLog,
    recording: AtomicBool,
    ended: AtomicBool,
    begins: AtomicUsize,
    ends: AtomicUsize,
    records: Mutex<Vec<(usize, String)>>,
}

impl SpyCommandBuffer {
    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn ends(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }

    /// Tags recorded during the last cycle, ordered by slot.
    pub fn tags(&self) -> Vec<String> {
        lock(&self.records).iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn slots(&self) -> Vec<usize> {
        lock(&self.records).iter().map(|(s, _)| *s).collect()
    }
}

impl CommandBuffer for SpyCommandBuffer {
    type Encoder = Vec<String>;

    fn begin(&self) -> Result<(), BackendError> {
        if self.recording.swap(true, Ordering::SeqCst) {
            return Err(BackendError::InvalidState {
                label: self.label.clone(),
                actual: "recording",
                expected: "idle",
            });
        }
        self.ended.store(false, Ordering::SeqCst);
        lock(&self.records).clear();
        self.begins.fetch_add(1, Ordering::SeqCst);
        lock(&self.events).push(SpyEvent::Begin(self.label.clone()));
        Ok(())
    }

    fn record<R>(
        &self,
        slot: usize,
        f: impl FnOnce(&mut Vec<String>) -> R,
    ) -> Result<R, BackendError> {
        if !self.recording.load(Ordering::SeqCst) {
            return Err(BackendError::InvalidState {
                label: self.label.clone(),
                actual: "idle",
                expected: "recording",
            });
        }
        let mut tags = Vec::new();
        let out = f(&mut tags);
        lock(&self.records).extend(tags.into_iter().map(|t| (slot, t)));
        Ok(out)
    }

    fn end(&self) -> Result<(), BackendError> {
        if !self.recording.swap(false, Ordering::SeqCst) {
            return Err(BackendError::InvalidState {
                label: self.label.clone(),
                actual: "idle",
                expected: "recording",
            });
        }
        lock(&self.records).sort_by_key(|(slot, _)| *slot);
        self.ended.store(true, Ordering::SeqCst);
        self.ends.fetch_add(1, Ordering::SeqCst);
        lock(&self.events).push(SpyEvent::End(self.label.clone()));
        Ok(())
    }
}

#[derive(Debug)]
pub struct SpyTarget {
    pub name: &'static str,
}

#[derive(Debug)]
pub struct SpyFramebuffer {
    pub frame: u64,
}

pub fn spy_target() -> TargetDescriptor<SpyBackend> {
    spy_target_named("main", 0)
}

pub fn spy_target_named(name: &'static str, frame: u64) -> TargetDescriptor<SpyBackend> {
    TargetDescriptor::new(
        Arc::new(SpyTarget { name }),
        Arc::new(SpyFramebuffer { frame }),
        DrawParams::pixel_space(Vec2::new(4.0, 2.0), 1.0),
    )
}

pub fn spy_manager(groups: usize) -> DrawManager<SpyBackend> {
    DrawManager::new(Arc::new(SpyDevice::default()), CommandListGroups::new(groups, 8))
}

/// Multi-threaded runtime for tests that drive dispatches from a plain thread.
pub fn test_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("test runtime")
}

/// Configurable draw hooks that record their tag into the command buffer.
pub struct TestHooks {
    pub tag: String,
    sets: usize,
    fail_build: bool,
    fail_draw: bool,
    panic_draw: bool,
    delay: Option<Duration>,
    pub built_sets: AtomicUsize,
    pub draws: AtomicUsize,
    pub released: AtomicUsize,
    active: AtomicBool,
    /// Draw calls that started while another draw of the same hooks was running.
    pub overlaps: AtomicUsize,
}

impl TestHooks {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            sets: 0,
            fail_build: false,
            fail_draw: false,
            panic_draw: false,
            delay: None,
            built_sets: AtomicUsize::new(0),
            draws: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            active: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
        }
    }

    pub fn with_sets(mut self, n: usize) -> Self {
        self.sets = n;
        self
    }

    pub fn failing_build(mut self) -> Self {
        self.fail_build = true;
        self
    }

    pub fn failing_draw(mut self) -> Self {
        self.fail_draw = true;
        self
    }

    pub fn panicking_draw(mut self) -> Self {
        self.panic_draw = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl DrawHooks<SpyBackend> for TestHooks {
    type Resources = Vec<SpyBuffer>;

    fn describe(&self, _ctx: &RegisterCtx<'_, SpyBackend>) -> anyhow::Result<Vec<ResourceSetDesc>> {
        Ok((0..self.sets)
            .map(|i| ResourceSetDesc::uniform(format!("{}.{i}", self.tag), 16))
            .collect())
    }

    async fn build(
        &self,
        _ctx: &RegisterCtx<'_, SpyBackend>,
        _transform: &SpyBuffer,
        sets: &mut ResourceSets<SpyBackend>,
    ) -> anyhow::Result<Vec<SpyBuffer>> {
        if self.fail_build {
            anyhow::bail!("{}: build failed", self.tag);
        }
        self.built_sets.store(sets.len(), Ordering::SeqCst);
        Ok(sets.take_all().into_iter().map(|(_, b)| b).collect())
    }

    fn draw(&self, _resources: &mut Vec<SpyBuffer>, ctx: &DrawCtx<'_, SpyBackend>) -> anyhow::Result<()> {
        if self.active.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.active.store(false, Ordering::SeqCst);
        if self.panic_draw {
            panic!("{} panicked", self.tag);
        }
        if self.fail_draw {
            anyhow::bail!("{}: draw failed", self.tag);
        }
        self.draws.fetch_add(1, Ordering::SeqCst);
        let tag = format!("{}@{}", self.tag, ctx.target.target.name);
        ctx.record(|enc| enc.push(tag))?;
        Ok(())
    }

    fn release(&self, device: &SpyDevice, resources: Vec<SpyBuffer>) {
        self.released.fetch_add(1, Ordering::SeqCst);
        for buffer in &resources {
            device.destroy_buffer(buffer);
        }
    }
}

/// In-memory surface with a fixed list of targets.
pub struct SpySurface {
    pub targets: Vec<&'static str>,
    /// Number of upcoming acquires that report "skip frame".
    pub skip_next: usize,
    pub size: (u32, u32),
    frame: u64,
    held: bool,
    events: EventLog,
}

impl SpySurface {
    pub fn new(device: &SpyDevice, targets: Vec<&'static str>) -> Self {
        Self {
            targets,
            skip_next: 0,
            size: (2, 2),
            frame: 0,
            held: false,
            events: Arc::clone(&device.events),
        }
    }
}

impl FrameSurface<SpyBackend> for SpySurface {
    fn acquire(
        &mut self,
        _device: &SpyDevice,
    ) -> Result<Option<Vec<TargetDescriptor<SpyBackend>>>, BackendError> {
        lock(&self.events).push(SpyEvent::Acquire);
        if self.skip_next > 0 {
            self.skip_next -= 1;
            return Ok(None);
        }
        self.frame += 1;
        self.held = true;
        Ok(Some(
            self.targets
                .iter()
                .map(|name| spy_target_named(*name, self.frame))
                .collect(),
        ))
    }

    fn read_back(&mut self, _device: &SpyDevice) -> Result<CapturedFrame, BackendError> {
        if !self.held {
            return Err(BackendError::ReadbackUnavailable("no acquired frame"));
        }
        lock(&self.events).push(SpyEvent::ReadBack);
        let (w, h) = self.size;
        let shade = (self.frame % 256) as u8;
        Ok(CapturedFrame::new(w, h, vec![shade; (w * h * 4) as usize]))
    }

    fn present(&mut self, _device: &SpyDevice) {
        if std::mem::take(&mut self.held) {
            lock(&self.events).push(SpyEvent::Present);
        }
    }

    fn resize(&mut self, _device: &SpyDevice, width: u32, height: u32, _scale_factor: f64) {
        self.size = (width.max(1), height.max(1));
    }
}
