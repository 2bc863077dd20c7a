pub mod activity;
pub mod conversation;
pub mod message;
pub mod preferences;
pub mod task;

pub use activity::ActivityEvent;
pub use conversation::Conversation;
pub use message::Message;
pub use preferences::{Preferences, PreferencesError, PreferencesStorage};
pub use task::Task;

/// Current Unix timestamp in milliseconds.
///
/// Milliseconds rather than seconds: watermark comparisons are strict, and
/// second resolution would make same-second arrivals ambiguous.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
