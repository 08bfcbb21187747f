//! Change notification fan-out.
//!
//! [`EventHub`] keeps a registry of bounded channels. Each subscriber gets its
//! own receiver; [`EventHub::publish`] clones the event into every channel
//! without blocking. A subscriber whose buffer is full misses that event. A
//! subscriber whose receiver was dropped is removed on the next publish.
//!
//! The producer (a reorder, an import) never waits for a slow consumer, so a
//! stalled watcher cannot hold up filesystem work.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};

/// What changed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Renamed,
    Removed,
}

/// A file the gallery created, renamed or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Path of the file after the change (before it, for removals).
    pub path: PathBuf,
}

/// Best-effort broadcast to any number of subscribers.
pub struct EventHub<T> {
    subscribers: Mutex<Vec<SyncSender<T>>>,
}

impl<T> Default for EventHub<T> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> EventHub<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber buffering up to `capacity` undelivered events.
    pub fn subscribe(&self, capacity: usize) -> Receiver<T> {
        let (tx, rx) = sync_channel(capacity);
        self.lock().push(tx);
        rx
    }

    /// Deliver `event` to every subscriber that has room for it.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, event: T) -> usize {
        let mut delivered = 0;
        self.lock().retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                log::debug!("subscriber buffer full, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        delivered
    }

    /// Number of registered subscribers, including ones not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SyncSender<T>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
