use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tokio::sync::oneshot;

type Action<W> = Box<dyn FnOnce(&W) + Send>;

/// Something the render thread can nudge once per frame.
pub trait PendingWindowWork: Send + Sync {
    /// Wakes the window thread if work is queued. Returns whether it did.
    fn wake_if_pending(&self) -> bool;
}

/// Actions marshalled onto the window-owning thread.
///
/// Callers on any thread queue closures; the window thread runs them from its
/// event loop. The render thread wakes the window thread when actions are
/// pending, so callers never touch the window directly.
pub struct WindowActions<W> {
    tx: Sender<Action<W>>,
    rx: Receiver<Action<W>>,
    waker: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl<W> Clone for WindowActions<W> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            waker: self.waker.clone(),
        }
    }
}

impl<W: 'static> Default for WindowActions<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: 'static> WindowActions<W> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx, waker: None }
    }

    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    /// Queues `f` to run on the window thread.
    pub fn perform_on_window(&self, f: impl FnOnce(&W) + Send + 'static) {
        // The receiver lives in `self`, so sending cannot fail.
        let _ = self.tx.send(Box::new(f));
    }

    /// Queues `f` and returns a receiver for its result.
    ///
    /// The receiver errors if the window thread shuts down before running it.
    pub fn perform_on_window_with_result<R>(
        &self,
        f: impl FnOnce(&W) -> R + Send + 'static,
    ) -> oneshot::Receiver<R>
    where
        R: Send + 'static,
    {
        let (done, rx) = oneshot::channel();
        self.perform_on_window(move |w| {
            let _ = done.send(f(w));
        });
        rx
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Runs every queued action. Window thread only.
    pub fn run_pending(&self, window: &W) -> usize {
        let mut n = 0;
        while let Ok(action) = self.rx.try_recv() {
            action(window);
            n += 1;
        }
        n
    }

    /// Drops queued actions without running them.
    pub fn discard_pending(&self) -> usize {
        self.rx.try_iter().count()
    }
}

impl<W: 'static> PendingWindowWork for WindowActions<W> {
    fn wake_if_pending(&self) -> bool {
        if self.rx.is_empty() {
            return false;
        }
        match &self.waker {
            Some(wake) => {
                wake();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn actions_run_only_on_the_owning_thread() {
        let actions = WindowActions::<String>::new();
        let remote = actions.clone();
        std::thread::spawn(move || {
            remote.perform_on_window(|w| assert_eq!(w, "window"));
        })
        .join()
        .unwrap();

        assert_eq!(actions.pending(), 1);
        assert_eq!(actions.run_pending(&"window".to_string()), 1);
        assert_eq!(actions.pending(), 0);
    }

    #[test]
    fn result_is_delivered() {
        let actions = WindowActions::<u32>::new();
        let rx = actions.perform_on_window_with_result(|w| w * 2);
        actions.run_pending(&21);
        assert_eq!(rx.blocking_recv().unwrap(), 42);
    }

    #[test]
    fn discarded_result_reports_closed() {
        let actions = WindowActions::<u32>::new();
        let rx = actions.perform_on_window_with_result(|w| *w);
        assert_eq!(actions.discard_pending(), 1);
        assert!(rx.blocking_recv().is_err());
    }

    #[test]
    fn waker_fires_only_with_pending_work() {
        let woken = Arc::new(AtomicUsize::new(0));
        let counter = woken.clone();
        let actions = WindowActions::<()>::new().with_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!actions.wake_if_pending());
        actions.perform_on_window(|_| {});
        assert!(actions.wake_if_pending());
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }
}
