use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use glam::{Mat4, Vec3};
use tokio::sync::{Mutex as AsyncMutex, watch};

use crate::backend::{
    Backend, BackendError, BufferDesc, BufferUsage, CommandBuffer, GpuDevice, TargetDescriptor,
};
use crate::error::DrawError;
use crate::resources::ResourceCache;
use crate::sync::lock;

use super::{
    ColorTransform, CommandListGroup, DrawOpKey, DrawingLock, ManagerId, OwnerHandle, Rotation,
    Transform, TransformUniform, TransformUpdate,
};

/// Registration lifecycle of a draw operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Readiness {
    /// Not registered yet (or registration failed).
    Pending,
    /// GPU state allocated; the operation can be drawn.
    Ready,
    /// GPU state released. Terminal.
    Disposed,
}

/// What a draw operation sees while registering.
pub struct RegisterCtx<'a, B: Backend> {
    pub manager: ManagerId,
    pub device: &'a Arc<B::Device>,
    pub resources: &'a ResourceCache,
}

/// One buffer requested during the first registration phase.
#[derive(Debug, Clone)]
pub struct ResourceSetDesc {
    pub label: String,
    pub usage: BufferUsage,
    pub size: u64,
    pub contents: Option<Vec<u8>>,
}

impl ResourceSetDesc {
    pub fn uniform(label: impl Into<String>, size: u64) -> Self {
        Self {
            label: label.into(),
            usage: BufferUsage::Uniform,
            size,
            contents: None,
        }
    }

    /// A uniform buffer created with initial contents.
    pub fn uniform_init(label: impl Into<String>, contents: &[u8]) -> Self {
        Self::init(label, BufferUsage::Uniform, contents)
    }

    pub fn vertex(label: impl Into<String>, contents: &[u8]) -> Self {
        Self::init(label, BufferUsage::Vertex, contents)
    }

    pub fn index(label: impl Into<String>, contents: &[u8]) -> Self {
        Self::init(label, BufferUsage::Index, contents)
    }

    fn init(label: impl Into<String>, usage: BufferUsage, contents: &[u8]) -> Self {
        Self {
            label: label.into(),
            usage,
            size: contents.len() as u64,
            contents: Some(contents.to_vec()),
        }
    }

    fn buffer_desc(&self) -> BufferDesc<'_> {
        BufferDesc {
            label: &self.label,
            usage: self.usage,
            size: self.size,
            contents: self.contents.as_deref(),
        }
    }
}

/// Buffers allocated from the descriptors returned by [`DrawHooks::describe`],
/// in the same order.
pub struct ResourceSets<B: Backend> {
    sets: Vec<(String, B::Buffer)>,
}

impl<B: Backend> ResourceSets<B> {
    fn with_capacity(n: usize) -> Self {
        Self {
            sets: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Removes and returns the buffer labelled `label`.
    pub fn take(&mut self, label: &str) -> Option<B::Buffer> {
        let i = self.sets.iter().position(|(l, _)| l == label)?;
        Some(self.sets.remove(i).1)
    }

    /// Removes and returns every remaining buffer, in allocation order.
    pub fn take_all(&mut self) -> Vec<(String, B::Buffer)> {
        std::mem::take(&mut self.sets)
    }

    fn destroy(&mut self, device: &B::Device) {
        for (_, buffer) in self.sets.drain(..) {
            device.destroy_buffer(&buffer);
        }
    }
}

/// What a draw hook sees while recording one (operation, target) pair.
pub struct DrawCtx<'a, B: Backend> {
    pub delta: f32,
    pub target: &'a TargetDescriptor<B>,
    /// The operation's transform uniform, already up to date for this frame.
    pub transform: &'a B::Buffer,
    pub device: &'a B::Device,
    buffer: &'a B::CommandBuffer,
    slot: usize,
}

impl<B: Backend> DrawCtx<'_, B> {
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Records into this pair's slot of the group command buffer.
    pub fn record<R>(
        &self,
        f: impl FnOnce(&mut <B::CommandBuffer as CommandBuffer>::Encoder) -> R,
    ) -> Result<R, BackendError> {
        self.buffer.record(self.slot, f)
    }
}

/// Variant hooks of a concrete draw operation.
///
/// Registration runs in two phases: [`describe`](Self::describe) lists the buffers
/// the operation needs, the scheduler allocates them, then
/// [`build`](Self::build) turns them into the operation's resources (bind groups,
/// pipelines pulled from the cache, ...). Buffers `build` leaves in the sets are
/// destroyed once it returns, whether it succeeded or not.
#[async_trait]
pub trait DrawHooks<B: Backend>: Send + Sync + 'static {
    type Resources: Send + 'static;

    fn describe(&self, ctx: &RegisterCtx<'_, B>) -> anyhow::Result<Vec<ResourceSetDesc>>;

    async fn build(
        &self,
        ctx: &RegisterCtx<'_, B>,
        transform: &B::Buffer,
        sets: &mut ResourceSets<B>,
    ) -> anyhow::Result<Self::Resources>;

    fn draw(&self, resources: &mut Self::Resources, ctx: &DrawCtx<'_, B>) -> anyhow::Result<()>;

    /// Releases GPU memory owned by `resources`. Runs under the exclusive drawing lock.
    fn release(&self, device: &B::Device, resources: Self::Resources) {
        let _ = (device, resources);
    }
}

/// Object-safe surface of a draw operation as seen by managers, queues and
/// dispatches.
#[async_trait]
pub trait DrawOperation<B: Backend>: Send + Sync + 'static {
    fn owner(&self) -> Option<OwnerHandle>;

    /// Binds the operation to a manager. Fails if it already has an owner.
    fn set_owner(&self, owner: OwnerHandle) -> Result<(), DrawError>;

    fn group(&self) -> CommandListGroup;

    fn priority(&self) -> f32;

    fn set_priority(&self, priority: f32);

    fn readiness(&self) -> Readiness;

    fn is_ready(&self) -> bool {
        self.readiness() == Readiness::Ready
    }

    /// Resolves once the operation is ready. Fails if it was disposed instead.
    async fn wait_ready(&self) -> Result<(), DrawError>;

    async fn register(&self, ctx: &RegisterCtx<'_, B>) -> Result<(), DrawError>;

    /// Records this operation against one target into `slot` of `buffer`,
    /// flushing a pending transform update first.
    async fn internal_draw(
        &self,
        delta: f32,
        buffer: &B::CommandBuffer,
        target: &TargetDescriptor<B>,
        slot: usize,
    ) -> Result<(), DrawError>;

    /// Releases GPU state under the exclusive drawing lock.
    ///
    /// Returns `true` if state was released, `false` if there was nothing to
    /// release. Idempotent.
    async fn dispose(&self, drawing: &DrawingLock) -> bool;
}

enum GpuState<B: Backend, R> {
    Unregistered,
    Ready {
        device: Arc<B::Device>,
        transform: B::Buffer,
        resources: R,
    },
    Disposed,
}

/// A schedulable draw operation: shared lifecycle state plus variant hooks.
///
/// Transform and color updates only mark the GPU copy stale; the uniform is
/// written lazily at the start of the next draw.
pub struct DrawOp<B: Backend, H: DrawHooks<B>> {
    hooks: H,
    owner: OnceLock<OwnerHandle>,
    group: CommandListGroup,
    priority: AtomicU32,
    transform: Mutex<Transform>,
    color: Mutex<ColorTransform>,
    pending_update: AtomicBool,
    readiness: watch::Sender<Readiness>,
    gpu: AsyncMutex<GpuState<B, H::Resources>>,
}

impl<B: Backend, H: DrawHooks<B>> DrawOp<B, H> {
    pub fn new(hooks: H) -> Self {
        Self::with_group(hooks, CommandListGroup::DEFAULT)
    }

    pub fn with_group(hooks: H, group: CommandListGroup) -> Self {
        let (readiness, _) = watch::channel(Readiness::Pending);
        Self {
            hooks,
            owner: OnceLock::new(),
            group,
            priority: AtomicU32::new(0f32.to_bits()),
            transform: Mutex::new(Transform::default()),
            color: Mutex::new(ColorTransform::IDENTITY),
            pending_update: AtomicBool::new(false),
            readiness,
            gpu: AsyncMutex::new(GpuState::Unregistered),
        }
    }

    pub fn with_priority(self, priority: f32) -> Self {
        self.priority.store(priority.to_bits(), Ordering::Relaxed);
        self
    }

    #[inline]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn key(&self) -> Option<DrawOpKey> {
        self.owner.get().map(|o| o.key)
    }

    /// Applies a partial transform update and marks the GPU copy stale.
    pub fn transform(&self, update: TransformUpdate) {
        lock(&self.transform).apply(&update);
        self.notify_pending_gpu_update();
    }

    pub fn set_translation(&self, v: Vec3) {
        self.transform(TransformUpdate::new().translation(v));
    }

    pub fn set_scale(&self, v: Vec3) {
        self.transform(TransformUpdate::new().scale(v));
    }

    pub fn set_rotation_x(&self, r: Rotation) {
        self.transform(TransformUpdate::new().rotation_x(r));
    }

    pub fn set_rotation_y(&self, r: Rotation) {
        self.transform(TransformUpdate::new().rotation_y(r));
    }

    pub fn set_rotation_z(&self, r: Rotation) {
        self.transform(TransformUpdate::new().rotation_z(r));
    }

    pub fn set_color_transform(&self, color: ColorTransform) {
        *lock(&self.color) = color;
        self.notify_pending_gpu_update();
    }

    pub fn color_transform(&self) -> ColorTransform {
        *lock(&self.color)
    }

    /// Snapshot of the current transform state.
    pub fn transform_state(&self) -> Transform {
        lock(&self.transform).clone()
    }

    pub fn model_matrix(&self) -> Mat4 {
        lock(&self.transform).matrix()
    }

    pub fn notify_pending_gpu_update(&self) {
        self.pending_update.store(true, Ordering::Release);
    }

    pub fn has_pending_gpu_update(&self) -> bool {
        self.pending_update.load(Ordering::Acquire)
    }

    fn uniform(&self) -> TransformUniform {
        TransformUniform::new(self.model_matrix(), self.color_transform())
    }

    fn key_or_null(&self) -> DrawOpKey {
        self.key().unwrap_or_default()
    }
}

#[async_trait]
impl<B: Backend, H: DrawHooks<B>> DrawOperation<B> for DrawOp<B, H> {
    fn owner(&self) -> Option<OwnerHandle> {
        self.owner.get().copied()
    }

    fn set_owner(&self, owner: OwnerHandle) -> Result<(), DrawError> {
        self.owner.set(owner).map_err(|_| DrawError::AlreadyOwned {
            current: self.owner.get().copied().unwrap_or(owner),
        })
    }

    #[inline]
    fn group(&self) -> CommandListGroup {
        self.group
    }

    fn priority(&self) -> f32 {
        f32::from_bits(self.priority.load(Ordering::Relaxed))
    }

    fn set_priority(&self, priority: f32) {
        self.priority.store(priority.to_bits(), Ordering::Relaxed);
    }

    fn readiness(&self) -> Readiness {
        *self.readiness.borrow()
    }

    async fn wait_ready(&self) -> Result<(), DrawError> {
        let mut rx = self.readiness.subscribe();
        let state = rx
            .wait_for(|r| *r != Readiness::Pending)
            .await
            .map(|r| *r)
            .unwrap_or(Readiness::Disposed);
        match state {
            Readiness::Ready => Ok(()),
            _ => Err(DrawError::NotReady(self.key_or_null())),
        }
    }

    async fn register(&self, ctx: &RegisterCtx<'_, B>) -> Result<(), DrawError> {
        let owner = self.owner().ok_or(DrawError::NotOwned)?;
        if owner.manager != ctx.manager {
            return Err(DrawError::WrongManager {
                key: owner.key,
                expected: owner.manager,
                actual: ctx.manager,
            });
        }

        let mut gpu = self.gpu.lock().await;
        match &*gpu {
            GpuState::Unregistered => {}
            GpuState::Ready { .. } => return Err(DrawError::AlreadyRegistered(owner.key)),
            GpuState::Disposed => return Err(DrawError::NotReady(owner.key)),
        }

        // Phase one: describe and allocate.
        let descs = self.hooks.describe(ctx).map_err(DrawError::hook)?;
        let device = Arc::clone(ctx.device);
        let transform = device.create_buffer(&BufferDesc {
            label: "draw op transform",
            usage: BufferUsage::Uniform,
            size: TransformUniform::SIZE,
            contents: None,
        })?;

        let mut sets = ResourceSets::<B>::with_capacity(descs.len());
        for desc in &descs {
            match device.create_buffer(&desc.buffer_desc()) {
                Ok(buffer) => sets.sets.push((desc.label.clone(), buffer)),
                Err(err) => {
                    sets.destroy(&device);
                    device.destroy_buffer(&transform);
                    return Err(err.into());
                }
            }
        }

        // Phase two: build.
        let built = self.hooks.build(ctx, &transform, &mut sets).await;
        sets.destroy(&device);
        let resources = match built {
            Ok(r) => r,
            Err(err) => {
                device.destroy_buffer(&transform);
                return Err(DrawError::hook(err));
            }
        };

        *gpu = GpuState::Ready {
            device,
            transform,
            resources,
        };
        drop(gpu);

        self.notify_pending_gpu_update();
        self.readiness.send_replace(Readiness::Ready);
        log::trace!(
            "draw operation {:?} registered ({} resource sets)",
            owner.key,
            descs.len()
        );
        Ok(())
    }

    async fn internal_draw(
        &self,
        delta: f32,
        buffer: &B::CommandBuffer,
        target: &TargetDescriptor<B>,
        slot: usize,
    ) -> Result<(), DrawError> {
        let mut gpu = self.gpu.lock().await;
        let (device, transform, resources) = match &mut *gpu {
            GpuState::Ready {
                device,
                transform,
                resources,
            } => (device, transform, resources),
            GpuState::Disposed => {
                log::trace!("skipping disposed draw operation {:?}", self.key_or_null());
                return Ok(());
            }
            GpuState::Unregistered => return Err(DrawError::NotReady(self.key_or_null())),
        };

        if self.pending_update.swap(false, Ordering::AcqRel) {
            let uniform = self.uniform();
            device.write_buffer(transform, 0, bytemuck::bytes_of(&uniform));
        }

        let ctx = DrawCtx {
            delta,
            target,
            transform,
            device: device.as_ref(),
            buffer,
            slot,
        };
        self.hooks.draw(resources, &ctx).map_err(DrawError::hook)
    }

    async fn dispose(&self, drawing: &DrawingLock) -> bool {
        let _exclusive = drawing.exclusive().await;
        let previous = {
            let mut gpu = self.gpu.lock().await;
            std::mem::replace(&mut *gpu, GpuState::Disposed)
        };
        self.readiness.send_replace(Readiness::Disposed);

        match previous {
            GpuState::Ready {
                device,
                transform,
                resources,
            } => {
                self.hooks.release(&device, resources);
                device.destroy_buffer(&transform);
                log::trace!("draw operation {:?} disposed", self.key_or_null());
                true
            }
            GpuState::Unregistered | GpuState::Disposed => false,
        }
    }
}
