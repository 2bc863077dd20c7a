use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::remote::client::Table;

/// Per-table sync counters. Diagnostic only; never part of badge
/// computation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TableSyncStats {
    /// Change-feed signals received (including reconnect catch-ups).
    pub signals: u64,
    /// Refreshes actually run against the remote store.
    pub refreshes: u64,
    /// Signals collapsed into an already in-flight refresh.
    pub collapsed: u64,
    /// Refreshes that failed and left the last-known slice in place.
    pub failures: u64,
}

#[derive(Debug, Default, Clone)]
pub struct SyncStats {
    by_table: HashMap<Table, TableSyncStats>,
}

impl SyncStats {
    pub fn table(&self, table: Table) -> TableSyncStats {
        self.by_table.get(&table).cloned().unwrap_or_default()
    }

    fn entry(&mut self, table: Table) -> &mut TableSyncStats {
        self.by_table.entry(table).or_default()
    }
}

/// Cheap cloneable handle shared between the subscription tasks, the
/// refresh drivers, and whoever renders diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SharedSyncStats {
    inner: Arc<RwLock<SyncStats>>,
}

impl SharedSyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_signal(&self, table: Table) {
        self.inner.write().entry(table).signals += 1;
    }

    pub fn record_refresh(&self, table: Table) {
        self.inner.write().entry(table).refreshes += 1;
    }

    pub fn record_collapsed(&self, table: Table) {
        self.inner.write().entry(table).collapsed += 1;
    }

    pub fn record_failure(&self, table: Table) {
        self.inner.write().entry(table).failures += 1;
    }

    pub fn snapshot(&self) -> SyncStats {
        self.inner.read().clone()
    }
}
