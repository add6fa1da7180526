use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};

use ordered_float::OrderedFloat;

use crate::backend::Backend;
use crate::error::DrawError;
use crate::sync::lock;

use super::{CommandListGroup, CommandListGroups, DrawOperation};

/// One queued draw: the operation and the priority it was enqueued with.
pub struct Queued<B: Backend> {
    pub priority: OrderedFloat<f32>,
    pub op: Arc<dyn DrawOperation<B>>,
}

impl<B: Backend> PartialEq for Queued<B> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl<B: Backend> Eq for Queued<B> {}

impl<B: Backend> PartialOrd for Queued<B> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<B: Backend> Ord for Queued<B> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}

/// Per-group max-priority queues.
///
/// Dequeue always yields the highest priority first. Equal priorities come out
/// in unspecified order. NaN sorts above every other priority.
///
/// Every call holds a group's lock only for one heap operation and never across
/// an await, so all of them are safe from plain threads and async tasks alike.
pub struct DrawQueue<B: Backend> {
    queues: Box<[Mutex<BinaryHeap<Queued<B>>>]>,
}

impl<B: Backend> DrawQueue<B> {
    pub fn new(groups: CommandListGroups) -> Self {
        let queues = (0..groups.count)
            .map(|_| Mutex::new(BinaryHeap::with_capacity(groups.expected_ops)))
            .collect();
        Self { queues }
    }

    #[inline]
    pub fn group_count(&self) -> usize {
        self.queues.len()
    }

    fn queue(&self, group: CommandListGroup) -> Result<&Mutex<BinaryHeap<Queued<B>>>, DrawError> {
        self.queues
            .get(group.index())
            .ok_or(DrawError::UnknownGroup {
                group,
                count: self.queues.len(),
            })
    }

    pub fn enqueue(&self, op: Arc<dyn DrawOperation<B>>, priority: f32) -> Result<(), DrawError> {
        let queue = self.queue(op.group())?;
        op.set_priority(priority);
        lock(queue).push(Queued {
            priority: OrderedFloat(priority),
            op,
        });
        Ok(())
    }

    pub async fn enqueue_async(
        &self,
        op: Arc<dyn DrawOperation<B>>,
        priority: f32,
    ) -> Result<(), DrawError> {
        self.enqueue(op, priority)
    }

    /// Pops the highest-priority entry of `group`, if any.
    pub fn try_dequeue(&self, group: CommandListGroup) -> Option<Queued<B>> {
        lock(self.queue(group).ok()?).pop()
    }

    /// Empties `group`, returning its entries in dequeue order.
    pub fn drain(&self, group: CommandListGroup) -> Vec<Queued<B>> {
        let Ok(queue) = self.queue(group) else {
            return Vec::new();
        };
        let heap = std::mem::take(&mut *lock(queue));
        let mut out = heap.into_sorted_vec();
        out.reverse();
        out
    }

    pub fn len(&self, group: CommandListGroup) -> usize {
        self.queue(group).map_or(0, |q| lock(q).len())
    }

    /// Diagnostic total over all groups. Not a synchronization point.
    pub fn total_count(&self) -> usize {
        self.queues.iter().map(|q| lock(q).len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawOp;
    use crate::testing::{SpyBackend, TestHooks, spy_manager};

    fn op(group: u8) -> Arc<dyn DrawOperation<SpyBackend>> {
        Arc::new(DrawOp::with_group(TestHooks::new("q"), CommandListGroup(group)))
    }

    /// Deterministic priority stream with repeats, negatives and large spreads.
    fn priorities(n: usize, seed: u64) -> Vec<f32> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 40) % 41) as f32 - 20.0
            })
            .collect()
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn dequeue_is_non_increasing_for_any_sequence() {
        for seed in 0..32 {
            let q = DrawQueue::<SpyBackend>::new(CommandListGroups::new(1, 8));
            let ps = priorities(1 + seed as usize * 3, seed);
            for &p in &ps {
                q.enqueue(op(0), p).unwrap();
            }

            let mut out = Vec::new();
            while let Some(e) = q.try_dequeue(CommandListGroup(0)) {
                out.push(e.priority.0);
            }
            assert_eq!(out.len(), ps.len());
            assert!(out.windows(2).all(|w| w[0] >= w[1]), "seed {seed}: {out:?}");
        }
    }

    #[test]
    fn drain_matches_dequeue_order() {
        let q = DrawQueue::<SpyBackend>::new(CommandListGroups::new(1, 8));
        for p in [1.0, 5.0, -3.0, 5.0, 0.0] {
            q.enqueue(op(0), p).unwrap();
        }
        let drained: Vec<f32> = q.drain(CommandListGroup(0)).iter().map(|e| e.priority.0).collect();
        assert_eq!(drained, vec![5.0, 5.0, 1.0, 0.0, -3.0]);
        assert_eq!(q.len(CommandListGroup(0)), 0);
    }

    // ── groups ────────────────────────────────────────────────────────────

    #[test]
    fn groups_are_independent() {
        let q = DrawQueue::<SpyBackend>::new(CommandListGroups::new(2, 8));
        q.enqueue(op(0), 1.0).unwrap();
        q.enqueue(op(1), 9.0).unwrap();
        q.enqueue(op(1), 2.0).unwrap();

        assert_eq!(q.len(CommandListGroup(0)), 1);
        assert_eq!(q.len(CommandListGroup(1)), 2);
        assert_eq!(q.total_count(), 3);
        assert_eq!(q.try_dequeue(CommandListGroup(0)).unwrap().priority.0, 1.0);
    }

    #[test]
    fn unknown_group_is_rejected() {
        let q = DrawQueue::<SpyBackend>::new(CommandListGroups::new(1, 8));
        let err = q.enqueue(op(4), 0.0).unwrap_err();
        assert!(matches!(err, DrawError::UnknownGroup { count: 1, .. }));
        assert!(q.try_dequeue(CommandListGroup(4)).is_none());
    }

    #[tokio::test]
    async fn enqueue_async_from_tasks() {
        let m = Arc::new(spy_manager(1));
        let mut tasks = Vec::new();
        for i in 0..16 {
            let m = m.clone();
            tasks.push(tokio::spawn(async move {
                m.queue().enqueue_async(op(0), i as f32).await
            }));
        }
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        assert_eq!(m.queue().len(CommandListGroup(0)), 16);
    }

    #[tokio::test]
    async fn reads_are_safe_inside_a_runtime() {
        let m = spy_manager(1);
        m.queue().enqueue_async(op(0), 1.0).await.unwrap();
        m.queue().enqueue_async(op(0), 3.0).await.unwrap();

        assert_eq!(m.queue().total_count(), 2);
        assert_eq!(m.queue().try_dequeue(CommandListGroup(0)).unwrap().priority.0, 3.0);
        assert_eq!(m.queue().drain(CommandListGroup(0)).len(), 1);
        assert_eq!(m.queue().len(CommandListGroup(0)), 0);
    }
}
