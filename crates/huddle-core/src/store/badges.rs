//! Unread badge aggregation.
//!
//! `compute_unread` is a pure function of current cache + watermark + focus
//! state. It is deliberately NOT an incremental state machine over change
//! events: recomputing from snapshots makes the result idempotent and
//! independent of delivery order, which is what lets the rest of the system
//! ignore duplicate and out-of-order push notifications entirely.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::constants::ACTIVITY_CATEGORY;
use crate::models::{ActivityEvent, Conversation, Message};
use crate::store::focus::ViewTarget;

/// One non-zero unread count, keyed by conversation/category key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub category: String,
    pub count: u64,
}

/// The full recomputed badge state published to UI consumers. Categories
/// with a zero count are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeSnapshot {
    pub badges: Vec<Badge>,
}

impl BadgeSnapshot {
    pub fn count(&self, category: &str) -> u64 {
        self.badges
            .iter()
            .find(|b| b.category == category)
            .map_or(0, |b| b.count)
    }

    pub fn total(&self) -> u64 {
        self.badges.iter().map(|b| b.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }
}

/// Everything the aggregator reads. All borrowed: building the context must
/// stay cheap enough to run on every store change.
pub struct UnreadContext<'a> {
    pub messages: &'a [Message],
    pub activity: &'a [ActivityEvent],
    /// Category -> watermark timestamp (ms). Absent category = epoch.
    pub watermarks: &'a HashMap<String, u64>,
    pub focus: Option<&'a ViewTarget>,
    pub self_id: &'a str,
    /// Addressable users. Direct messages from identities outside this set
    /// are never surfaced: the UI has no conversation view to route them to.
    pub known_users: &'a HashSet<String>,
}

pub fn compute_unread(ctx: &UnreadContext<'_>) -> BadgeSnapshot {
    // BTreeMap for a deterministic category order in the published snapshot.
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    let focused_conversation = match ctx.focus {
        Some(ViewTarget::Conversation(conversation)) => Some(conversation),
        _ => None,
    };

    for message in ctx.messages {
        if message.is_deleted() {
            continue;
        }
        if message.created_by == ctx.self_id {
            continue;
        }
        if message.is_read_by(ctx.self_id) {
            continue;
        }

        match &message.recipient {
            // Broadcast: counts toward the team badge unless the team
            // conversation is the one being viewed.
            None => {
                if focused_conversation == Some(&Conversation::Team) {
                    continue;
                }
                *counts.entry(Conversation::Team.key()).or_insert(0) += 1;
            }
            // Direct message to me.
            Some(recipient) if recipient == ctx.self_id => {
                if !ctx.known_users.contains(&message.created_by) {
                    // Unaddressable/system sender. Single exit point on
                    // purpose: a future system-message category lands here.
                    continue;
                }
                let conversation = Conversation::Direct(message.created_by.clone());
                if focused_conversation == Some(&conversation) {
                    continue;
                }
                *counts.entry(conversation.key()).or_insert(0) += 1;
            }
            // Cross-talk between other users is invisible to this badge.
            Some(_) => {}
        }
    }

    let activity_mark = ctx
        .watermarks
        .get(ACTIVITY_CATEGORY)
        .copied()
        .unwrap_or(0);
    let activity_count = ctx
        .activity
        .iter()
        .filter(|event| !event.is_deleted())
        .filter(|event| event.created_by != ctx.self_id)
        .filter(|event| event.created_at > activity_mark)
        .count() as u64;
    if activity_count > 0 {
        counts.insert(ACTIVITY_CATEGORY.to_string(), activity_count);
    }

    BadgeSnapshot {
        badges: counts
            .into_iter()
            .map(|(category, count)| Badge { category, count })
            .collect(),
    }
}
