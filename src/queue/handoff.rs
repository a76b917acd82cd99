//! Unbounded Handoff Queue
//!
//! A FIFO that never blocks producers and parks consumers until an item exists.
//! Items live in a growable `VecDeque`; a `Notify` hands a wake-up to one parked
//! consumer per push. A push that lands between a consumer's empty check and its
//! wait leaves a stored permit behind, so the wait returns at once.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

pub struct HandoffQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Notify,
}

impl<T: Send> HandoffQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    /// Appends an item. Never waits: the buffer has no upper bound.
    pub fn push(&self, item: T) {
        self.buffer().push_back(item);
        self.available.notify_one();
    }

    /// Removes the oldest item, waiting until one is pushed if the queue is empty.
    ///
    /// Cancel-safe: an item is only taken out of the buffer by a call that then
    /// returns it, so dropping a pending `pop` loses nothing.
    pub async fn pop(&self) -> T {
        loop {
            let notified = self.available.notified();

            if let Some(item) = self.buffer().pop_front() {
                return item;
            }

            notified.await;
        }
    }

    /// Like [`pop`](Self::pop), but gives up after `wait`.
    pub async fn pop_timeout(&self, wait: Duration) -> Option<T> {
        tokio::time::timeout(wait, self.pop()).await.ok()
    }

    fn buffer(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        // A panic while holding the guard cannot leave the deque half-updated.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Send> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
