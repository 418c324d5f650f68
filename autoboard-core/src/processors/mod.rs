//! Processors of the publication engine.
//!
//! - `ChannelPublisher`: sends posts to the channel and applies pin policies
//! - `UnpinScheduler`: persists unpin jobs and emits `UnpinArmed`
//! - `UnpinSweeper`: receives `UnpinArmed`, fires due unpin jobs
//! - `StatusSynchronizer`: applies status changes and edits channel posts

pub mod channel_publisher;
pub mod status_sync;
pub mod unpin_scheduler;

pub use channel_publisher::{ChannelPublisher, SentPost};
pub use status_sync::{StatusChange, StatusSynchronizer};
pub use unpin_scheduler::{UnpinScheduler, UnpinSweeper};
