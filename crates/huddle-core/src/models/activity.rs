use serde::{Deserialize, Serialize};

/// An activity-log entry (task created, status changed, member joined, ...).
///
/// Unread state for activity is watermark-based: an event counts while its
/// timestamp is strictly greater than the stored "activity" watermark and it
/// was authored by someone else. There is no per-event read tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    /// Event kind, e.g. "task.created" or "task.status_changed".
    pub kind: String,
    pub created_by: String,
    /// Id of the entity the event is about, when there is one.
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<u64>,
    pub created_at: u64,
}

impl ActivityEvent {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        created_by: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            created_by: created_by.into(),
            subject_id: None,
            summary: None,
            deleted_at: None,
            created_at,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
