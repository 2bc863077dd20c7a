use serde::{Deserialize, Serialize};

/// A task row as fetched from the remote store.
///
/// Tasks are cached and published to consumers (dashboards re-render on
/// change) but contribute no badge category of their own; task-change
/// notifications reach the user through the activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Free-form status label ("open", "in_progress", "done", ...). The
    /// core never interprets it; it is pass-through for dashboard views.
    pub status: String,
    pub created_by: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Task {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
