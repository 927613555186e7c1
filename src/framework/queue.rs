//! # Resource Hand-off Queue
//!
//! The [`ResourceQueue`] bridges two independently scheduled actor pools: the
//! producers push submissions as they are created, the uploaders pop them when
//! they are ready for more work.
//!
//! ## Waiting
//!
//! Consumers suspend on a [`Notify`] instead of re-checking on a timer. Every
//! waiter registers interest *before* inspecting the list, so an item queued
//! between the check and the `await` still wakes it.
//!
//! ## Clear vs. Close
//!
//! - [`ResourceQueue::clear`] discards pending items. Waiters keep waiting for
//!   the next item; a waiter that already popped keeps what it popped.
//! - [`ResourceQueue::close`] tells waiters no more work is coming. They drain
//!   what is left and then receive `None`.

use crate::model::Resource;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::debug;

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Unbounded FIFO channel shared by producer and consumer actors.
pub struct ResourceQueue<T = Resource> {
    state: Mutex<QueueState<T>>,
    available: Notify,
}

impl<T> Default for ResourceQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResourceQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        // The state is a plain list; a panicking holder cannot leave it half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item` to the tail. Never blocks.
    pub fn queue(&self, item: T) {
        let size = {
            let mut state = self.lock();
            state.items.push_back(item);
            state.items.len()
        };
        debug!(size, "Queued");
        // One item, one consumer. A woken waiter that is dropped passes the
        // notification on.
        self.available.notify_one();
    }

    /// Removes and returns the head, suspending until one is available.
    ///
    /// Returns `None` only once the queue is closed and drained.
    pub async fn wait_for_resource(&self) -> Option<T> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Removes the head if one is present, without waiting.
    pub fn try_take(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Empties the queue and returns how many items were discarded.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let discarded = state.items.len();
        state.items.clear();
        discarded
    }

    /// Marks the queue finished and wakes every waiter.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
