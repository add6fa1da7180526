use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Binary frame gate guarding state shared by the window and render threads.
///
/// The window thread holds it while publishing size and input changes; the
/// render thread holds it once per frame to snapshot them. Both sides are plain
/// threads, so holding blocks.
pub struct FrameLock<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for FrameLock<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> FrameLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    /// Blocks until the gate is free. Must not be called from async code.
    pub fn hold(&self) -> OwnedMutexGuard<T> {
        Arc::clone(&self.inner).blocking_lock_owned()
    }

    pub fn try_hold(&self) -> Option<OwnedMutexGuard<T>> {
        Arc::clone(&self.inner).try_lock_owned().ok()
    }

    /// Starts `body` on a new thread with the gate held and returns once the
    /// thread has released it for the first time.
    ///
    /// `body` receives the initial guard and a handle to the lock; dropping the
    /// guard signals that construction finished. A panic before that releases
    /// the gate as well.
    pub fn launch<F, R>(&self, name: &str, body: F) -> std::io::Result<JoinHandle<R>>
    where
        F: FnOnce(OwnedMutexGuard<T>, FrameLock<T>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let initial = self.hold();
        let lock = self.clone();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(initial, lock))?;
        drop(self.hold());
        Ok(handle)
    }
}
