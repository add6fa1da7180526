use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Manager-wide drawing lock.
///
/// Every dispatch cycle holds it shared from before `begin` until after `end`.
/// Releasing GPU memory of a draw operation (or clearing the resource cache)
/// requires it exclusively, so no in-flight recording can still reference the
/// memory being released.
#[derive(Clone, Default)]
pub struct DrawingLock {
    inner: Arc<RwLock<()>>,
}

impl DrawingLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn shared(&self) -> OwnedRwLockReadGuard<()> {
        Arc::clone(&self.inner).read_owned().await
    }

    pub async fn exclusive(&self) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.inner).write_owned().await
    }

    /// Returns `None` while any cycle is recording.
    pub fn try_exclusive(&self) -> Option<OwnedRwLockWriteGuard<()>> {
        Arc::clone(&self.inner).try_write_owned().ok()
    }
}
