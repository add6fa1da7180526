use std::sync::{Arc, RwLock};

use slotmap::SlotMap;

use crate::backend::Backend;
use crate::error::DrawError;
use crate::resources::ResourceCache;
use crate::sync::{read, write};

use super::{
    CommandListGroups, DrawOpKey, DrawOperation, DrawQueue, DrawingLock, ManagerId, OwnerHandle,
    RegisterCtx,
};

/// Owner of a set of draw operations and the state they share: device, resource
/// cache, per-group queues and the drawing lock.
///
/// Operations are added once (binding them to this manager for their whole
/// lifetime), registered to allocate GPU state, then enqueued every frame they
/// should be drawn.
pub struct DrawManager<B: Backend> {
    id: ManagerId,
    device: Arc<B::Device>,
    groups: CommandListGroups,
    resources: ResourceCache,
    queue: DrawQueue<B>,
    registry: RwLock<SlotMap<DrawOpKey, Arc<dyn DrawOperation<B>>>>,
    drawing: DrawingLock,
}

impl<B: Backend> DrawManager<B> {
    pub fn new(device: Arc<B::Device>, groups: CommandListGroups) -> Self {
        let id = ManagerId::next();
        log::debug!(
            "draw manager {:?}: {} command-list groups, ~{} ops each",
            id,
            groups.count,
            groups.expected_ops
        );
        Self {
            id,
            device,
            groups,
            resources: ResourceCache::new(),
            queue: DrawQueue::new(groups),
            registry: RwLock::new(SlotMap::with_capacity_and_key(
                groups.count * groups.expected_ops,
            )),
            drawing: DrawingLock::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> ManagerId {
        self.id
    }

    #[inline]
    pub fn device(&self) -> &Arc<B::Device> {
        &self.device
    }

    #[inline]
    pub fn groups(&self) -> CommandListGroups {
        self.groups
    }

    #[inline]
    pub fn resources(&self) -> &ResourceCache {
        &self.resources
    }

    #[inline]
    pub fn queue(&self) -> &DrawQueue<B> {
        &self.queue
    }

    #[inline]
    pub fn drawing_lock(&self) -> &DrawingLock {
        &self.drawing
    }

    pub fn register_ctx(&self) -> RegisterCtx<'_, B> {
        RegisterCtx {
            manager: self.id,
            device: &self.device,
            resources: &self.resources,
        }
    }

    /// Takes ownership of `op`, binding it to this manager.
    pub fn add(&self, op: Arc<dyn DrawOperation<B>>) -> Result<DrawOpKey, DrawError> {
        if !self.groups.contains(op.group()) {
            return Err(DrawError::UnknownGroup {
                group: op.group(),
                count: self.groups.count,
            });
        }
        if let Some(current) = op.owner() {
            return Err(DrawError::AlreadyOwned { current });
        }

        let mut registry = write(&self.registry);
        let mut bound = Ok(());
        let key = registry.insert_with_key(|key| {
            bound = op.set_owner(OwnerHandle {
                manager: self.id,
                key,
            });
            Arc::clone(&op)
        });
        if let Err(err) = bound {
            // Lost a race with another manager.
            registry.remove(key);
            return Err(err);
        }
        Ok(key)
    }

    /// Allocates GPU state for an operation owned by this manager.
    pub async fn register(&self, op: &dyn DrawOperation<B>) -> Result<(), DrawError> {
        op.register(&self.register_ctx()).await
    }

    pub async fn add_and_register(
        &self,
        op: Arc<dyn DrawOperation<B>>,
    ) -> Result<DrawOpKey, DrawError> {
        let key = self.add(Arc::clone(&op))?;
        self.register(op.as_ref()).await?;
        Ok(key)
    }

    pub fn get(&self, key: DrawOpKey) -> Option<Arc<dyn DrawOperation<B>>> {
        read(&self.registry).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        read(&self.registry).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_owned(&self, op: &dyn DrawOperation<B>) -> Result<(), DrawError> {
        match op.owner() {
            Some(owner) if owner.manager == self.id => Ok(()),
            Some(owner) => Err(DrawError::WrongManager {
                key: owner.key,
                expected: owner.manager,
                actual: self.id,
            }),
            None => Err(DrawError::NotOwned),
        }
    }

    /// Queues `op` for the next frame.
    pub fn enqueue(&self, op: Arc<dyn DrawOperation<B>>, priority: f32) -> Result<(), DrawError> {
        self.check_owned(op.as_ref())?;
        self.queue.enqueue(op, priority)
    }

    /// Queues `op` at its stored priority.
    pub fn enqueue_default(&self, op: Arc<dyn DrawOperation<B>>) -> Result<(), DrawError> {
        let priority = op.priority();
        self.enqueue(op, priority)
    }

    pub async fn enqueue_async(
        &self,
        op: Arc<dyn DrawOperation<B>>,
        priority: f32,
    ) -> Result<(), DrawError> {
        self.check_owned(op.as_ref())?;
        self.queue.enqueue_async(op, priority).await
    }

    /// Forgets the operation under `key` and releases its GPU state once no
    /// dispatch cycle is recording.
    pub async fn remove(&self, key: DrawOpKey) -> Result<(), DrawError> {
        let op = write(&self.registry)
            .remove(key)
            .ok_or(DrawError::UnknownOperation(key))?;
        op.dispose(&self.drawing).await;
        Ok(())
    }

    /// Removes and disposes every operation.
    pub async fn dispose_all(&self) {
        let ops: Vec<_> = write(&self.registry).drain().map(|(_, op)| op).collect();
        let mut released = 0usize;
        for op in ops {
            if op.dispose(&self.drawing).await {
                released += 1;
            }
        }
        log::debug!("draw manager {:?}: disposed {} operations", self.id, released);
    }

    /// Disposes every cached resource instance under the exclusive drawing lock.
    pub async fn clear_resources(&self) {
        let _exclusive = self.drawing.exclusive().await;
        self.resources.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::draw::{CommandListGroup, DrawOp};
    use crate::testing::{SpyBackend, TestHooks, spy_manager};

    fn op() -> Arc<DrawOp<SpyBackend, TestHooks>> {
        Arc::new(DrawOp::new(TestHooks::new("m")))
    }

    // ── ownership ─────────────────────────────────────────────────────────

    #[test]
    fn add_binds_owner_and_key() {
        let m = spy_manager(1);
        let op = op();
        let key = m.add(op.clone()).unwrap();
        let owner = op.owner().unwrap();
        assert_eq!(owner.manager, m.id());
        assert_eq!(owner.key, key);
        assert!(m.get(key).is_some());
    }

    #[test]
    fn add_rejects_out_of_range_group() {
        let m = spy_manager(1);
        let op = Arc::new(DrawOp::with_group(TestHooks::new("g"), CommandListGroup(1)));
        assert!(matches!(m.add(op.clone()), Err(DrawError::UnknownGroup { .. })));
        assert!(op.owner().is_none());
    }

    #[test]
    fn enqueue_requires_this_manager() {
        let a = spy_manager(1);
        let b = spy_manager(1);
        let op = op();
        assert!(matches!(a.enqueue(op.clone(), 0.0), Err(DrawError::NotOwned)));

        a.add(op.clone()).unwrap();
        assert!(matches!(b.enqueue(op.clone(), 0.0), Err(DrawError::WrongManager { .. })));
        a.enqueue(op.clone(), 0.0).unwrap();
        assert_eq!(a.queue().total_count(), 1);
        assert_eq!(b.queue().total_count(), 0);
    }

    #[test]
    fn enqueue_default_uses_stored_priority() {
        let m = spy_manager(1);
        let op = Arc::new(DrawOp::new(TestHooks::new("p")).with_priority(7.0));
        m.add(op.clone()).unwrap();
        m.enqueue_default(op).unwrap();
        assert_eq!(m.queue().try_dequeue(CommandListGroup(0)).unwrap().priority.0, 7.0);
    }

    // ── removal ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn remove_disposes_registered_op() {
        let m = spy_manager(1);
        let op = op();
        let key = m.add_and_register(op.clone()).await.unwrap();
        m.remove(key).await.unwrap();

        assert!(m.get(key).is_none());
        assert_eq!(op.hooks().released.load(Ordering::SeqCst), 1);
        assert!(matches!(m.remove(key).await, Err(DrawError::UnknownOperation(_))));
    }

    #[tokio::test]
    async fn dispose_all_empties_registry() {
        let m = spy_manager(1);
        let ops: Vec<_> = (0..4).map(|_| op()).collect();
        for op in &ops {
            m.add_and_register(op.clone()).await.unwrap();
        }
        m.dispose_all().await;
        assert!(m.is_empty());
        assert!(ops.iter().all(|op| op.hooks().released.load(Ordering::SeqCst) == 1));
    }

    #[tokio::test]
    async fn clear_resources_waits_for_drawing_lock() {
        let m = Arc::new(spy_manager(1));
        m.resources().register_resource("n", |_| Ok(1u32));
        m.resources().get_resource::<u32>("n").unwrap();

        let shared = m.drawing_lock().shared().await;
        let clearing = {
            let m = m.clone();
            tokio::spawn(async move { m.clear_resources().await })
        };
        tokio::task::yield_now().await;
        assert!(m.resources().is_materialized("n"));

        drop(shared);
        clearing.await.unwrap();
        assert!(!m.resources().is_materialized("n"));
    }
}
