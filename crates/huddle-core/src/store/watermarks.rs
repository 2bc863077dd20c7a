//! Per-category watermark store.
//!
//! A watermark is the "everything up to this point has been seen" timestamp
//! for one notification category. Watermarks are monotonically
//! non-decreasing per category within a session; advancing one is the only
//! way a previously-unread item becomes seen without being individually
//! marked read.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::events::DataChange;
use crate::models::PreferencesStorage;

pub struct WatermarkStore {
    marks: HashMap<String, u64>,
    prefs: Arc<Mutex<PreferencesStorage>>,
    changes: UnboundedSender<DataChange>,
}

impl WatermarkStore {
    /// Seeds the in-memory map from persisted continuity state so badge
    /// counts survive a reload.
    pub fn new(prefs: Arc<Mutex<PreferencesStorage>>, changes: UnboundedSender<DataChange>) -> Self {
        let marks = prefs.lock().watermarks().clone();
        Self {
            marks,
            prefs,
            changes,
        }
    }

    /// Watermark for a category. Lazily created: an unknown category reads
    /// as epoch, meaning "everything is unread".
    pub fn get(&self, category: &str) -> u64 {
        self.marks.get(category).copied().unwrap_or(0)
    }

    /// Advance a category's watermark. A regression (or no-op re-advance to
    /// the same instant) is silently rejected to protect monotonicity.
    /// Returns whether the watermark moved.
    pub fn advance(&mut self, category: &str, to: u64) -> bool {
        let current = self.get(category);
        if to <= current {
            tracing::trace!(
                "watermarks: rejecting regression for {category:?} ({to} <= {current})"
            );
            return false;
        }
        self.marks.insert(category.to_string(), to);
        self.prefs.lock().set_watermark(category, to);
        let _ = self.changes.send(DataChange::Watermarks);
        tracing::debug!("watermarks: {category:?} advanced to {to}");
        true
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.marks.clone()
    }
}
