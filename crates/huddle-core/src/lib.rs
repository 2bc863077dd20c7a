//! Client-side realtime synchronization and notification-aggregation core
//! for the Huddle task/chat workspace.
//!
//! Keeps a local copy of the shared collections consistent with a remote
//! store that pushes unordered, at-least-once change notifications, derives
//! unread badge counts from that state, and persists the small amount of
//! continuity state (watermarks, last open conversation) that lets badges
//! survive a reload.

pub mod config;
pub mod constants;
pub mod events;
pub mod models;
pub mod remote;
pub mod runtime;
pub mod stats;
pub mod store;
pub mod tracing_setup;

pub use config::CoreConfig;
pub use models::{ActivityEvent, Conversation, Message, Task};
pub use remote::{ChangeEvent, Operation, RemoteClient, SubscriptionHandle, Table};
pub use runtime::SyncRuntime;
pub use store::{Badge, BadgeSnapshot, ViewTarget};
