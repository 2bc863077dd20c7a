//! Change-feed subscription lifecycle.
//!
//! One logical subscription per watched table. The subscription owns a
//! background task that drains the push channel, collapses every upstream
//! notification to a bare `on_change()` signal, and silently re-opens the
//! channel when the connection drops. Callers are never told about
//! transient disconnects; a badge can lag during a network blip and
//! self-corrects once connectivity resumes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::constants::{PUBLIC_SCHEMA, RECONNECT_INITIAL_DELAY_MS, RECONNECT_MAX_DELAY_MS};
use crate::remote::client::{RemoteClient, Table};
use crate::stats::SharedSyncStats;

/// Zero-argument change callback. Invoked once per upstream notification
/// with no payload: the consumer re-derives state, it does not apply diffs.
/// Must tolerate spurious invocations (reconnects signal once defensively).
pub type OnChange = Arc<dyn Fn() + Send + Sync>;

/// Owner handle for one table subscription.
///
/// Dropping the handle disposes it (scoped acquisition); `dispose` is also
/// safe to call explicitly, repeatedly, and at any point in the consuming
/// view's lifecycle. After disposal no further `on_change` calls occur.
pub struct SubscriptionHandle {
    table: Table,
    channel_id: String,
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn table(&self) -> Table {
        self.table
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn is_disposed(&self) -> bool {
        self.task.is_none()
    }

    pub fn dispose(&mut self) {
        let Some(task) = self.task.take() else {
            return; // already disposed
        };
        let _ = self.cancel.send(true);
        task.abort();
        tracing::debug!("change_feed: disposed subscription {} ({})", self.channel_id, self.table);
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Open a subscription for `table`, invoking `on_change` once per upstream
/// notification. Must be called from within a tokio runtime.
pub fn subscribe(
    client: Arc<dyn RemoteClient>,
    table: Table,
    on_change: OnChange,
    stats: SharedSyncStats,
) -> SubscriptionHandle {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let channel_id = format!("feed-{}", Uuid::new_v4());
    tracing::debug!("change_feed: subscribing {} ({})", channel_id, table);

    let task = tokio::spawn(run_feed(client, table, on_change, cancel_rx, stats));

    SubscriptionHandle {
        table,
        channel_id,
        cancel: cancel_tx,
        task: Some(task),
    }
}

async fn run_feed(
    client: Arc<dyn RemoteClient>,
    table: Table,
    on_change: OnChange,
    mut cancel: watch::Receiver<bool>,
    stats: SharedSyncStats,
) {
    let mut backoff_ms = RECONNECT_INITIAL_DELAY_MS;
    let mut was_connected = false;

    loop {
        let opened = tokio::select! {
            _ = cancel.changed() => return,
            opened = client.open_change_feed(table) => opened,
        };

        let mut feed = match opened {
            Ok(feed) => {
                backoff_ms = RECONNECT_INITIAL_DELAY_MS;
                if was_connected {
                    // Notifications may have been missed during the blip;
                    // one spurious signal triggers the catch-up re-fetch.
                    tracing::debug!("change_feed: {} reconnected, signalling catch-up", table);
                    stats.record_signal(table);
                    on_change();
                }
                was_connected = true;
                feed
            }
            Err(err) => {
                tracing::debug!("change_feed: {} open failed ({}), retrying in {}ms", table, err, backoff_ms);
                tokio::select! {
                    _ = cancel.changed() => return,
                    _ = tokio::time::sleep(Duration::from_millis(backoff_ms)) => {}
                }
                backoff_ms = (backoff_ms * 2).min(RECONNECT_MAX_DELAY_MS);
                continue;
            }
        };

        loop {
            let event = tokio::select! {
                _ = cancel.changed() => return,
                event = feed.recv() => event,
            };

            match event {
                Some(event) => {
                    if event.schema != PUBLIC_SCHEMA || event.table != table {
                        tracing::debug!(
                            "change_feed: {} ignoring event for {}.{}",
                            table, event.schema, event.table
                        );
                        continue;
                    }
                    stats.record_signal(table);
                    on_change();
                }
                // Sender dropped: the connection is gone. Fall through to
                // the reconnect loop without telling the caller.
                None => break,
            }
        }
    }
}
