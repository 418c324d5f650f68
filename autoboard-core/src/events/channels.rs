//! Event channel factories and handles.

use super::types::UnpinArmed;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for UnpinArmed events.
pub type UnpinArmedSender = mpsc::Sender<UnpinArmed>;
/// Receiver handle for UnpinArmed events.
pub type UnpinArmedReceiver = mpsc::Receiver<UnpinArmed>;

/// Create a new UnpinArmed channel.
///
/// The sender is cloned into every scheduler; the single receiver belongs
/// to the `UnpinSweeper`.
pub fn unpin_armed_channel() -> (UnpinArmedSender, UnpinArmedReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
