use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{ActivityEvent, Message, Task};

/// A watched table in the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Messages,
    Tasks,
    Activity,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Messages, Table::Tasks, Table::Activity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Messages => "messages",
            Table::Tasks => "tasks",
            Table::Activity => "activity_log",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

/// A raw change-feed notification.
///
/// The payload carries no row data on purpose: push notifications are not
/// assumed complete or ordered, so the only safe reaction is "something
/// changed, re-fetch the slice of truth you care about".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub operation: Operation,
    pub schema: String,
}

/// Push channel for one table. The sender side living in the client; a
/// closed channel means the connection dropped and the subscription layer
/// should re-open it.
pub type ChangeFeed = tokio::sync::mpsc::Receiver<ChangeEvent>;

/// Handle to the remote store, passed in explicitly so the subscription and
/// cache layers are testable without a live network dependency.
///
/// Fetches are authoritative: each returns the full current slice for the
/// session's filters and the caller replaces its cached copy wholesale.
pub trait RemoteClient: Send + Sync {
    /// All messages visible to `user_id` that were not authored by them and
    /// are not soft-deleted.
    fn fetch_messages<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Vec<Message>>>;

    /// All live tasks for the session's workspace.
    fn fetch_tasks(&self) -> BoxFuture<'_, Result<Vec<Task>>>;

    /// Recent activity-log entries visible to `user_id`.
    fn fetch_activity<'a>(&'a self, user_id: &'a str)
        -> BoxFuture<'a, Result<Vec<ActivityEvent>>>;

    /// Open a push channel scoped to one table. The returned receiver yields
    /// a [`ChangeEvent`] per upstream insert/update/delete until the
    /// connection drops.
    fn open_change_feed(&self, table: Table) -> BoxFuture<'_, Result<ChangeFeed>>;
}

#[cfg(test)]
pub mod testing {
    //! In-memory [`RemoteClient`] for tests: slices are plain vectors, the
    //! change feed is a locally held channel, and fetches can be gated or
    //! made to fail to exercise the error paths.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio::sync::Notify;

    use crate::constants::{CHANGE_FEED_CAPACITY, PUBLIC_SCHEMA};

    #[derive(Default)]
    pub struct FakeClient {
        pub messages: Mutex<Vec<Message>>,
        pub tasks: Mutex<Vec<Task>>,
        pub activity: Mutex<Vec<ActivityEvent>>,
        /// When set, every fetch fails with a synthetic network error.
        pub fail_fetches: AtomicBool,
        /// When present, fetches block until [`FakeClient::release_fetches`].
        gate: Mutex<Option<Arc<Notify>>>,
        fetch_counts: Mutex<HashMap<Table, u64>>,
        feeds: Mutex<HashMap<Table, Vec<mpsc::Sender<ChangeEvent>>>>,
    }

    impl FakeClient {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn fetch_count(&self, table: Table) -> u64 {
            self.fetch_counts.lock().get(&table).copied().unwrap_or(0)
        }

        /// Hold all subsequent fetches open until released.
        pub fn hold_fetches(&self) {
            *self.gate.lock() = Some(Arc::new(Notify::new()));
        }

        pub fn release_fetches(&self) {
            if let Some(notify) = self.gate.lock().take() {
                notify.notify_waiters();
            }
        }

        /// Emit one change notification to every open feed for `table`.
        pub fn emit(&self, table: Table, operation: Operation) {
            let event = ChangeEvent {
                table,
                operation,
                schema: PUBLIC_SCHEMA.to_string(),
            };
            let mut feeds = self.feeds.lock();
            if let Some(senders) = feeds.get_mut(&table) {
                senders.retain(|tx| tx.try_send(event.clone()).is_ok());
            }
        }

        /// Drop every open feed for `table`, simulating a disconnect.
        pub fn disconnect(&self, table: Table) {
            self.feeds.lock().remove(&table);
        }

        pub fn open_feed_count(&self, table: Table) -> usize {
            self.feeds.lock().get(&table).map_or(0, Vec::len)
        }

        async fn before_fetch(&self, table: Table) -> Result<()> {
            *self.fetch_counts.lock().entry(table).or_insert(0) += 1;
            let gate = self.gate.lock().clone();
            if let Some(notify) = gate {
                notify.notified().await;
            }
            if self.fail_fetches.load(Ordering::SeqCst) {
                anyhow::bail!("synthetic network error");
            }
            Ok(())
        }
    }

    impl RemoteClient for FakeClient {
        fn fetch_messages<'a>(
            &'a self,
            _user_id: &'a str,
        ) -> BoxFuture<'a, Result<Vec<Message>>> {
            Box::pin(async move {
                self.before_fetch(Table::Messages).await?;
                Ok(self.messages.lock().clone())
            })
        }

        fn fetch_tasks(&self) -> BoxFuture<'_, Result<Vec<Task>>> {
            Box::pin(async move {
                self.before_fetch(Table::Tasks).await?;
                Ok(self.tasks.lock().clone())
            })
        }

        fn fetch_activity<'a>(
            &'a self,
            _user_id: &'a str,
        ) -> BoxFuture<'a, Result<Vec<ActivityEvent>>> {
            Box::pin(async move {
                self.before_fetch(Table::Activity).await?;
                Ok(self.activity.lock().clone())
            })
        }

        fn open_change_feed(&self, table: Table) -> BoxFuture<'_, Result<ChangeFeed>> {
            Box::pin(async move {
                let (tx, rx) = mpsc::channel(CHANGE_FEED_CAPACITY);
                self.feeds.lock().entry(table).or_default().push(tx);
                Ok(rx)
            })
        }
    }
}
