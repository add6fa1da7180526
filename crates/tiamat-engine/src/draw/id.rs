use std::sync::atomic::{AtomicU64, Ordering};

slotmap::new_key_type! {
    /// Key of a draw operation inside its manager.
    pub struct DrawOpKey;
}

/// Process-unique identity of a [`DrawManager`](super::DrawManager).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ManagerId(u64);

impl ManagerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// The owning manager and key of a draw operation. Set once, never changed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct OwnerHandle {
    pub manager: ManagerId,
    pub key: DrawOpKey,
}
