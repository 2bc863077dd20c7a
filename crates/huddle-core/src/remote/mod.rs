pub mod change_feed;
pub mod client;

pub use change_feed::{subscribe, SubscriptionHandle};
pub use client::{ChangeEvent, ChangeFeed, Operation, RemoteClient, Table};
