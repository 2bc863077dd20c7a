//! Canonical in-memory copy of the watched collections.
//!
//! Refreshes replace a slice wholesale rather than merging: upstream
//! deletions would otherwise accumulate as stale entries. Local mutations
//! are a display optimization only and are overwritten by the next
//! authoritative refresh.

use tokio::sync::mpsc::UnboundedSender;

use crate::events::DataChange;
use crate::models::{ActivityEvent, Message, Task};

/// Per-session singleton holding the cached slices. Written only through
/// the narrow mutation contract below; read by many views via snapshots.
pub struct EntityCache {
    messages: Vec<Message>,
    tasks: Vec<Task>,
    activity: Vec<ActivityEvent>,
    /// Bumped on `clear()`. Refreshes capture the generation before
    /// fetching; a result arriving under an older generation is discarded
    /// so a torn-down session is never written to.
    generation: u64,
    changes: UnboundedSender<DataChange>,
}

impl EntityCache {
    pub fn new(changes: UnboundedSender<DataChange>) -> Self {
        Self {
            messages: Vec::new(),
            tasks: Vec::new(),
            activity: Vec::new(),
            generation: 0,
            changes,
        }
    }

    // ===== Getters =====

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn activity(&self) -> &[ActivityEvent] {
        &self.activity
    }

    // ===== Mutations =====

    /// Replace the message slice with an authoritative fetch result taken
    /// under `generation`. Returns false (and leaves the cache untouched)
    /// if the session was cleared while the fetch was in flight.
    pub fn replace_messages(&mut self, generation: u64, rows: Vec<Message>) -> bool {
        if !self.accept(generation) {
            return false;
        }
        self.messages = rows;
        self.notify(DataChange::Messages);
        true
    }

    pub fn replace_tasks(&mut self, generation: u64, rows: Vec<Task>) -> bool {
        if !self.accept(generation) {
            return false;
        }
        self.tasks = rows;
        self.notify(DataChange::Tasks);
        true
    }

    pub fn replace_activity(&mut self, generation: u64, rows: Vec<ActivityEvent>) -> bool {
        if !self.accept(generation) {
            return false;
        }
        self.activity = rows;
        self.notify(DataChange::Activity);
        true
    }

    /// Optimistically mark a message read by `user_id` ahead of the remote
    /// round-trip. The next refresh overwrites this either way.
    pub fn apply_local_read(&mut self, message_id: &str, user_id: &str) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) else {
            return false;
        };
        if message.read_by.insert(user_id.to_string()) {
            self.notify(DataChange::Messages);
            true
        } else {
            false
        }
    }

    /// Reset for a session teardown or identity change. In-flight refreshes
    /// started before the clear are discarded on arrival.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.messages.clear();
        self.tasks.clear();
        self.activity.clear();
        self.notify(DataChange::Messages);
        self.notify(DataChange::Tasks);
        self.notify(DataChange::Activity);
    }

    fn accept(&self, generation: u64) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "entity_cache: discarding stale refresh (generation {} != {})",
                generation,
                self.generation
            );
            return false;
        }
        true
    }

    fn notify(&self, change: DataChange) {
        // Receiver gone means the runtime is shutting down; nothing to do.
        let _ = self.changes.send(change);
    }
}
