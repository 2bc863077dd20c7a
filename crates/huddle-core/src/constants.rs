//! Application-wide constants
//!
//! Centralized location for magic strings and tuning values that are used
//! across multiple modules.

/// Delay between a view gaining focus and its watermark being advanced.
///
/// Advancing immediately on focus races with the remote mark-as-read write:
/// a notification that arrives while the view is still rendering would be
/// swallowed before the user ever saw it. One second gives in-flight writes
/// time to land before the local watermark is trusted as the new baseline.
pub const WATERMARK_GRACE_DELAY_MS: u64 = 1_000;

/// Initial delay before re-opening a dropped change-feed channel.
pub const RECONNECT_INITIAL_DELAY_MS: u64 = 250;

/// Upper bound on the change-feed reconnect backoff.
pub const RECONNECT_MAX_DELAY_MS: u64 = 15_000;

/// Capacity of the change-feed receivers handed out by the remote client.
pub const CHANGE_FEED_CAPACITY: usize = 64;

/// Schema change-feed events are expected to originate from.
pub const PUBLIC_SCHEMA: &str = "public";

/// Watermark/badge category for the activity feed.
pub const ACTIVITY_CATEGORY: &str = "activity";

/// File name of the persisted continuity state inside the data directory.
pub const PREFERENCES_FILE: &str = "preferences.json";
