use std::collections::HashSet;

/// A conversation the user can open: the team-wide broadcast channel or a
/// direct-message exchange with one other user.
///
/// The canonical string key doubles as the watermark category and as the
/// badge category surfaced to UI consumers, so it must stay stable across
/// sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Conversation {
    Team,
    Direct(String),
}

impl Conversation {
    /// Stable string key: `team` or `dm:<user_id>`.
    pub fn key(&self) -> String {
        match self {
            Conversation::Team => "team".to_string(),
            Conversation::Direct(user_id) => format!("dm:{user_id}"),
        }
    }

    /// Inverse of [`Conversation::key`]. Returns `None` for anything that
    /// does not round-trip, so stale or hand-edited persisted keys degrade
    /// to "no conversation" instead of a bogus descriptor.
    pub fn parse_key(key: &str) -> Option<Self> {
        if key == "team" {
            return Some(Conversation::Team);
        }
        match key.strip_prefix("dm:") {
            Some(user_id) if !user_id.is_empty() => {
                Some(Conversation::Direct(user_id.to_string()))
            }
            _ => None,
        }
    }

    /// A direct conversation is only addressable when the counterpart is in
    /// the known-user roster; messages from identities outside it have no
    /// conversation view to route to.
    pub fn is_addressable(&self, known_users: &HashSet<String>) -> bool {
        match self {
            Conversation::Team => true,
            Conversation::Direct(user_id) => known_users.contains(user_id),
        }
    }
}
