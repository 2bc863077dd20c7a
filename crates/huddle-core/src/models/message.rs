use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A chat message as fetched from the remote store.
///
/// `recipient == None` marks a broadcast message visible to the whole team;
/// `Some(user_id)` marks a direct message. Deletion is soft: a non-null
/// `deleted_at` excludes the message from every unread computation but the
/// row itself survives upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub body: String,
    pub created_by: String,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub read_by: HashSet<String>,
    #[serde(default)]
    pub deleted_at: Option<u64>,
    pub created_at: u64,
}

impl Message {
    pub fn broadcast(
        id: impl Into<String>,
        created_by: impl Into<String>,
        body: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            created_by: created_by.into(),
            recipient: None,
            read_by: HashSet::new(),
            deleted_at: None,
            created_at,
        }
    }

    pub fn direct(
        id: impl Into<String>,
        created_by: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            recipient: Some(recipient.into()),
            ..Self::broadcast(id, created_by, body, created_at)
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_read_by(&self, user_id: &str) -> bool {
        self.read_by.contains(user_id)
    }
}
