//! Background scroll lock while a modal is open.
//!
//! Each open modal holds a [`ScrollGuard`]; the page is locked while any guard
//! is alive. Release happens in `Drop`, so an early return or an unwind still
//! unlocks. Observers watch the boolean state through [`ScrollLock::watch`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

#[derive(Debug)]
struct Inner {
    holders: Mutex<usize>,
    state: watch::Sender<bool>,
}

#[derive(Clone, Debug)]
pub struct ScrollLock {
    inner: Arc<Inner>,
}

impl Default for ScrollLock {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollLock {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                holders: Mutex::new(0),
                state,
            }),
        }
    }

    /// Lock until the returned guard is dropped.
    #[must_use = "the lock is released when the guard is dropped"]
    pub fn acquire(&self) -> ScrollGuard {
        let mut holders = self.inner.holders.lock();
        *holders += 1;
        if *holders == 1 {
            self.inner.state.send_replace(true);
        }
        ScrollGuard {
            inner: self.inner.clone(),
        }
    }

    pub fn is_locked(&self) -> bool {
        *self.inner.holders.lock() > 0
    }

    pub fn watch(&self) -> watch::Receiver<bool> {
        self.inner.state.subscribe()
    }
}

#[derive(Debug)]
pub struct ScrollGuard {
    inner: Arc<Inner>,
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        let mut holders = self.inner.holders.lock();
        *holders = holders.saturating_sub(1);
        if *holders == 0 {
            self.inner.state.send_replace(false);
        }
    }
}
