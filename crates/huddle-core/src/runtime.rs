//! Session runtime: owns the per-session stores, the change-feed
//! subscriptions, and the badge recompute loop.
//!
//! Data flow: remote change feed -> debounced authoritative re-fetch ->
//! entity cache replaced -> badge recompute -> `watch` channel to the UI.
//! Independently, focus changes advance watermarks (after the grace delay)
//! and feed the same recompute loop.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::CoreConfig;
use crate::events::DataChange;
use crate::models::{ActivityEvent, Conversation, Message, PreferencesStorage, Task};
use crate::remote::change_feed::{self, OnChange, SubscriptionHandle};
use crate::remote::client::{RemoteClient, Table};
use crate::stats::SharedSyncStats;
use crate::store::badges::{compute_unread, BadgeSnapshot, UnreadContext};
use crate::store::entity_cache::EntityCache;
use crate::store::focus::{FocusCoordinator, ViewTarget};
use crate::store::refresh::Debouncer;
use crate::store::watermarks::WatermarkStore;

fn table_index(table: Table) -> usize {
    match table {
        Table::Messages => 0,
        Table::Tasks => 1,
        Table::Activity => 2,
    }
}

struct SyncCore {
    client: Arc<dyn RemoteClient>,
    user_id: String,
    known_users: Mutex<HashSet<String>>,
    cache: Mutex<EntityCache>,
    watermarks: Arc<Mutex<WatermarkStore>>,
    prefs: Arc<Mutex<PreferencesStorage>>,
    focus: Arc<FocusCoordinator>,
    debouncers: [Debouncer; 3],
    badge_tx: watch::Sender<BadgeSnapshot>,
    stats: SharedSyncStats,
}

impl SyncCore {
    /// React to a change signal for `table`: start a refresh unless one is
    /// already in flight, in which case the signal folds into the single
    /// pending slot.
    fn schedule_refresh(self: &Arc<Self>, table: Table) {
        if !self.debouncers[table_index(table)].begin() {
            self.stats.record_collapsed(table);
            return;
        }
        let core = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                core.refresh_once(table).await;
                if !core.debouncers[table_index(table)].finish() {
                    break;
                }
                tracing::debug!("runtime: running follow-up refresh for {}", table);
            }
        });
    }

    async fn refresh_once(&self, table: Table) {
        // Capture the generation before suspending; a session cleared while
        // the fetch is in flight discards the result on arrival.
        let generation = self.cache.lock().generation();

        let result = match table {
            Table::Messages => self
                .client
                .fetch_messages(&self.user_id)
                .await
                .map(|rows| self.cache.lock().replace_messages(generation, rows)),
            Table::Tasks => self
                .client
                .fetch_tasks()
                .await
                .map(|rows| self.cache.lock().replace_tasks(generation, rows)),
            Table::Activity => self
                .client
                .fetch_activity(&self.user_id)
                .await
                .map(|rows| self.cache.lock().replace_activity(generation, rows)),
        };

        match result {
            Ok(_applied) => self.stats.record_refresh(table),
            Err(err) => {
                // Stale-but-available beats broken: keep the last-known
                // slice and wait for the next signal.
                self.stats.record_failure(table);
                tracing::warn!(
                    "runtime: {} refresh failed, keeping last-known slice: {}",
                    table,
                    err
                );
            }
        }
    }

    fn recompute_badges(&self) {
        let focus = self.focus.current();
        let watermarks = self.watermarks.lock().snapshot();
        let known_users = self.known_users.lock().clone();
        let snapshot = {
            let cache = self.cache.lock();
            compute_unread(&UnreadContext {
                messages: cache.messages(),
                activity: cache.activity(),
                watermarks: &watermarks,
                focus: focus.as_ref(),
                self_id: &self.user_id,
                known_users: &known_users,
            })
        };
        self.badge_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

async fn run_recompute(core: Arc<SyncCore>, mut changes: mpsc::UnboundedReceiver<DataChange>) {
    while let Some(_change) = changes.recv().await {
        // Coalesce whatever else is already queued into one recompute; the
        // computation is a pure function of current state, so skipping
        // intermediate states is always safe.
        while changes.try_recv().is_ok() {}
        core.recompute_badges();
    }
}

/// Per-session sync runtime. One instance per logged-in identity; an
/// identity change means shutting this one down and starting a fresh one.
pub struct SyncRuntime {
    core: Arc<SyncCore>,
    subscriptions: Vec<SubscriptionHandle>,
    recompute_task: Option<JoinHandle<()>>,
    badge_rx: watch::Receiver<BadgeSnapshot>,
}

impl SyncRuntime {
    /// Wire up stores, subscriptions, and the recompute loop, then kick off
    /// the initial authoritative fill of every table. Must be called from
    /// within a tokio runtime.
    pub fn start(
        config: &CoreConfig,
        client: Arc<dyn RemoteClient>,
        user_id: impl Into<String>,
        known_users: HashSet<String>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let prefs = Arc::new(Mutex::new(PreferencesStorage::new(&config.data_dir)));
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let watermarks = Arc::new(Mutex::new(WatermarkStore::new(
            prefs.clone(),
            change_tx.clone(),
        )));
        let focus = Arc::new(FocusCoordinator::new(watermarks.clone(), change_tx.clone()));
        let (badge_tx, badge_rx) = watch::channel(BadgeSnapshot::default());
        let stats = SharedSyncStats::new();

        let core = Arc::new(SyncCore {
            client,
            user_id: user_id.into(),
            known_users: Mutex::new(known_users),
            cache: Mutex::new(EntityCache::new(change_tx)),
            watermarks,
            prefs,
            focus,
            debouncers: [Debouncer::new(), Debouncer::new(), Debouncer::new()],
            badge_tx,
            stats: stats.clone(),
        });

        let recompute_task = tokio::spawn(run_recompute(Arc::clone(&core), change_rx));

        // Exactly one subscription per table for this session. A remount
        // (new runtime) disposes these before its own subscribe, keeping
        // the one-handle-per-(table, consumer) invariant.
        let mut subscriptions = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            let feed_core = Arc::clone(&core);
            let on_change: OnChange = Arc::new(move || feed_core.schedule_refresh(table));
            subscriptions.push(change_feed::subscribe(
                Arc::clone(&core.client),
                table,
                on_change,
                stats.clone(),
            ));
        }

        for table in Table::ALL {
            core.schedule_refresh(table);
        }

        Ok(Self {
            core,
            subscriptions,
            recompute_task: Some(recompute_task),
            badge_rx,
        })
    }

    // ===== Read side =====

    /// Reactive badge state. Consumers hold the receiver and re-render on
    /// change; they never poll the remote store.
    pub fn badges(&self) -> watch::Receiver<BadgeSnapshot> {
        self.badge_rx.clone()
    }

    pub fn current_badges(&self) -> BadgeSnapshot {
        self.badge_rx.borrow().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.core.cache.lock().messages().to_vec()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.core.cache.lock().tasks().to_vec()
    }

    pub fn activity(&self) -> Vec<ActivityEvent> {
        self.core.cache.lock().activity().to_vec()
    }

    pub fn user_id(&self) -> &str {
        &self.core.user_id
    }

    /// Conversation that was open when the previous session ended.
    pub fn last_conversation(&self) -> Option<Conversation> {
        self.core.prefs.lock().last_conversation()
    }

    pub fn stats(&self) -> SharedSyncStats {
        self.core.stats.clone()
    }

    // ===== Mutations =====

    /// Record what the user is looking at. Focusing a conversation also
    /// persists it as the session's continuity point; the caller is
    /// expected to independently issue the remote mark-as-read write.
    pub fn set_focus(&self, target: Option<ViewTarget>) {
        if let Some(ViewTarget::Conversation(conversation)) = &target {
            self.core
                .prefs
                .lock()
                .set_last_conversation(Some(conversation));
        }
        self.core.focus.set_focus(target);
    }

    /// Optimistically mark a message read by the local user. Display-only;
    /// the next refresh restores the remote store's truth.
    pub fn mark_message_read(&self, message_id: &str) -> bool {
        self.core
            .cache
            .lock()
            .apply_local_read(message_id, &self.core.user_id)
    }

    /// Replace the addressable-user roster (e.g. after a membership fetch).
    pub fn set_known_users(&self, users: HashSet<String>) {
        *self.core.known_users.lock() = users;
        self.core.recompute_badges();
    }

    /// Tear the session down: dispose subscriptions, cancel pending grace
    /// timers, and invalidate in-flight refreshes. Safe to call twice.
    pub fn shutdown(&mut self) {
        for subscription in &mut self.subscriptions {
            subscription.dispose();
        }
        self.core.focus.set_focus(None);
        self.core.cache.lock().clear();
        if let Some(task) = self.recompute_task.take() {
            task.abort();
        }
    }
}

impl Drop for SyncRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ACTIVITY_CATEGORY, WATERMARK_GRACE_DELAY_MS};
    use crate::remote::client::testing::FakeClient;
    use crate::remote::client::Operation;
    use std::time::Duration;
    use tempfile::tempdir;

    const ALICE: &str = "alice";
    const BOB: &str = "bob";

    fn roster() -> HashSet<String> {
        [ALICE.to_string(), BOB.to_string()].into()
    }

    async fn settle() {
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }
    }

    async fn start(
        client: &Arc<FakeClient>,
        dir: &std::path::Path,
    ) -> SyncRuntime {
        let config = CoreConfig::new(dir);
        let runtime = SyncRuntime::start(
            &config,
            client.clone() as Arc<dyn RemoteClient>,
            ALICE,
            roster(),
        )
        .unwrap();
        settle().await;
        runtime
    }

    #[tokio::test(start_paused = true)]
    async fn remote_change_flows_through_to_badges() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new();
        let runtime = start(&client, dir.path()).await;
        assert!(runtime.current_badges().is_empty());

        client
            .messages
            .lock()
            .push(Message::broadcast("m1", BOB, "hello", 100));
        client.emit(Table::Messages, Operation::Insert);
        settle().await;

        assert_eq!(runtime.current_badges().count("team"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn badge_receiver_observes_changes() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new();
        let runtime = start(&client, dir.path()).await;
        let mut badges = runtime.badges();
        badges.mark_unchanged();

        client
            .messages
            .lock()
            .push(Message::direct("m1", BOB, ALICE, "hi", 100));
        client.emit(Table::Messages, Operation::Insert);
        settle().await;

        assert!(badges.has_changed().unwrap());
        assert_eq!(badges.borrow_and_update().count("dm:bob"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn signal_burst_collapses_to_one_followup_refresh() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new();
        let runtime = start(&client, dir.path()).await;
        assert_eq!(client.fetch_count(Table::Messages), 1, "initial fill");

        client.hold_fetches();
        for _ in 0..5 {
            client.emit(Table::Messages, Operation::Insert);
        }
        settle().await;
        // One refresh is gated in flight; the other four signals fold into
        // the single pending slot.
        assert_eq!(client.fetch_count(Table::Messages), 2);

        client.release_fetches();
        settle().await;
        assert_eq!(client.fetch_count(Table::Messages), 3, "exactly one follow-up");

        let stats = runtime.stats().snapshot();
        assert_eq!(stats.table(Table::Messages).collapsed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_failure_keeps_last_known_state() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new();
        client
            .messages
            .lock()
            .push(Message::broadcast("m1", BOB, "hello", 100));
        let runtime = start(&client, dir.path()).await;
        assert_eq!(runtime.current_badges().count("team"), 1);

        client
            .fail_fetches
            .store(true, std::sync::atomic::Ordering::SeqCst);
        client.emit(Table::Messages, Operation::Delete);
        settle().await;

        assert_eq!(
            runtime.current_badges().count("team"),
            1,
            "stale badge preferred over a broken one"
        );
        assert!(runtime.stats().snapshot().table(Table::Messages).failures >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn focusing_activity_clears_badge_after_grace_delay() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new();
        client
            .activity
            .lock()
            .push(ActivityEvent::new("a1", "task.created", BOB, 1_000));
        let runtime = start(&client, dir.path()).await;
        assert_eq!(runtime.current_badges().count(ACTIVITY_CATEGORY), 1);

        runtime.set_focus(Some(ViewTarget::ActivityFeed));
        settle().await;
        assert_eq!(
            runtime.current_badges().count(ACTIVITY_CATEGORY),
            1,
            "watermark must not advance inside the grace window"
        );

        tokio::time::sleep(Duration::from_millis(WATERMARK_GRACE_DELAY_MS + 100)).await;
        settle().await;
        assert_eq!(runtime.current_badges().count(ACTIVITY_CATEGORY), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn optimistic_read_clears_badge_until_refresh() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new();
        client
            .messages
            .lock()
            .push(Message::direct("m1", BOB, ALICE, "hi", 100));
        let runtime = start(&client, dir.path()).await;
        assert_eq!(runtime.current_badges().count("dm:bob"), 1);

        assert!(runtime.mark_message_read("m1"));
        settle().await;
        assert_eq!(runtime.current_badges().count("dm:bob"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn last_conversation_survives_restart() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new();
        {
            let mut runtime = start(&client, dir.path()).await;
            runtime.set_focus(Some(ViewTarget::Conversation(Conversation::Direct(
                BOB.to_string(),
            ))));
            runtime.shutdown();
        }

        let runtime = start(&client, dir.path()).await;
        assert_eq!(
            runtime.last_conversation(),
            Some(Conversation::Direct(BOB.to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_reacting_to_signals() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new();
        let mut runtime = start(&client, dir.path()).await;
        let fetches_before = client.fetch_count(Table::Messages);

        runtime.shutdown();
        client.emit(Table::Messages, Operation::Insert);
        settle().await;

        assert_eq!(client.fetch_count(Table::Messages), fetches_before);
    }

    #[tokio::test(start_paused = true)]
    async fn roster_update_recomputes_badges() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new();
        client
            .messages
            .lock()
            .push(Message::direct("m1", "carol", ALICE, "hi", 100));
        let runtime = start(&client, dir.path()).await;
        // Carol is not in the roster yet: her DM is unaddressable.
        assert!(runtime.current_badges().is_empty());

        let mut users = roster();
        users.insert("carol".to_string());
        runtime.set_known_users(users);
        assert_eq!(runtime.current_badges().count("dm:carol"), 1);
    }
}
