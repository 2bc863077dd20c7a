//! View/focus coordination.
//!
//! Tracks which conversation or feed the user currently has open, so the
//! badge aggregator can suppress counting items that are already on screen,
//! and advances the focused category's watermark after a grace delay.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::constants::{ACTIVITY_CATEGORY, WATERMARK_GRACE_DELAY_MS};
use crate::events::DataChange;
use crate::models::{now_ms, Conversation};
use crate::store::watermarks::WatermarkStore;

/// What the user is currently looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewTarget {
    Conversation(Conversation),
    ActivityFeed,
}

impl ViewTarget {
    /// The watermark/badge category this view clears when dwelled on.
    pub fn category(&self) -> String {
        match self {
            ViewTarget::Conversation(conversation) => conversation.key(),
            ViewTarget::ActivityFeed => ACTIVITY_CATEGORY.to_string(),
        }
    }
}

struct FocusInner {
    focus: Option<ViewTarget>,
    /// Bumped on every focus change. The grace task re-checks it before
    /// advancing, so an abort that loses the race is still harmless.
    epoch: u64,
    grace: Option<JoinHandle<()>>,
}

pub struct FocusCoordinator {
    watermarks: Arc<Mutex<WatermarkStore>>,
    changes: UnboundedSender<DataChange>,
    inner: Mutex<FocusInner>,
}

impl FocusCoordinator {
    pub fn new(
        watermarks: Arc<Mutex<WatermarkStore>>,
        changes: UnboundedSender<DataChange>,
    ) -> Self {
        Self {
            watermarks,
            changes,
            inner: Mutex::new(FocusInner {
                focus: None,
                epoch: 0,
                grace: None,
            }),
        }
    }

    pub fn current(&self) -> Option<ViewTarget> {
        self.inner.lock().focus.clone()
    }

    /// Change (or clear, on view teardown) the focused view.
    ///
    /// Focusing a view schedules a watermark advance for its category after
    /// the grace delay; refocusing or tearing down before the delay elapses
    /// cancels the pending advance. Must be called from within a tokio
    /// runtime when `target` is `Some`.
    pub fn set_focus(self: &Arc<Self>, target: Option<ViewTarget>) {
        let mut inner = self.inner.lock();
        if let Some(grace) = inner.grace.take() {
            grace.abort();
        }
        inner.epoch += 1;
        let epoch = inner.epoch;
        inner.focus = target.clone();
        let _ = self.changes.send(DataChange::Focus);

        if let Some(target) = target {
            let this = Arc::clone(self);
            inner.grace = Some(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(WATERMARK_GRACE_DELAY_MS)).await;
                this.advance_if_current(epoch, &target);
            }));
        }
    }

    fn advance_if_current(&self, epoch: u64, target: &ViewTarget) {
        {
            let inner = self.inner.lock();
            if inner.epoch != epoch {
                return; // focus moved on while we slept
            }
        }
        self.watermarks.lock().advance(&target.category(), now_ms());
    }
}
