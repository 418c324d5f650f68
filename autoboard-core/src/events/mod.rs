//! Event system connecting request handling to background work.
//!
//! # Event Flow
//!
//! 1. `ChannelPublisher` pins a post and arms an unpin through `UnpinScheduler`
//! 2. `UnpinScheduler` persists the job and emits `UnpinArmed` -> `UnpinSweeper`
//! 3. `UnpinSweeper` fires due jobs against the messaging gateway
//!
//! Events are hints: the job table is the source of truth, so a dropped
//! event only delays a job until the next periodic sweep.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, UnpinArmedReceiver, UnpinArmedSender, unpin_armed_channel,
};
pub use types::UnpinArmed;
