//! Error taxonomy of the publication engine.
//!
//! - [`ValidationError`]: rejected before any external call.
//! - [`GatewayError`]: a messaging gateway call failed; classified by [`GatewayErrorKind`].
//! - [`ChannelError`]: a gateway failure while publishing, with tariff and channel context.
//! - `sqlx::Error`: persistence failures, always propagated unchanged.
//!
//! Pin, unpin and edit failures are not errors of any operation; they are
//! logged as warnings where they happen.

use crate::entities::{AdStatus, Tariff};
use crate::telegram::ChannelId;
use autoboard_sdk::objects::ErrorKind;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    ChannelNotFound,
    InsufficientPermissions,
    InvalidFormat,
    Unknown,
}

impl std::fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayErrorKind::ChannelNotFound => write!(f, "channel not found"),
            GatewayErrorKind::InsufficientPermissions => write!(f, "insufficient permissions"),
            GatewayErrorKind::InvalidFormat => write!(f, "invalid message format"),
            GatewayErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

impl From<GatewayErrorKind> for ErrorKind {
    fn from(value: GatewayErrorKind) -> Self {
        match value {
            GatewayErrorKind::ChannelNotFound => ErrorKind::ChannelNotFound,
            GatewayErrorKind::InsufficientPermissions => ErrorKind::InsufficientPermissions,
            GatewayErrorKind::InvalidFormat => ErrorKind::InvalidFormat,
            GatewayErrorKind::Unknown => ErrorKind::Unknown,
        }
    }
}

/// A failed messaging gateway call. `detail` carries the transport's own message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub detail: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Timeouts, rate limits and server errors; worth repeating later.
    ///
    /// Bot API rejections of the request itself (`400`, `403`) are final.
    pub fn is_transient(&self) -> bool {
        self.kind == GatewayErrorKind::Unknown
    }
}

/// Sending the post to the channel failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("channel {channel} rejected {tariff} post ({kind}): {detail}")]
pub struct ChannelError {
    pub kind: GatewayErrorKind,
    pub tariff: Tariff,
    pub channel: ChannelId,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("unknown tariff: {0}")]
    UnknownTariff(String),
    #[error("invalid telegram user id: {0}")]
    InvalidUser(i64),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("ad not found: {0}")]
    NotFound(i64),

    /// Retrying an ad that already has a channel post, or is no longer active.
    #[error("ad {ad_id} cannot be published: {reason}")]
    NotPublishable { ad_id: i64, reason: &'static str },
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublishError::Validation(_) => ErrorKind::Validation,
            PublishError::Persistence(_) => ErrorKind::Persistence,
            PublishError::Channel(e) => e.kind.into(),
            PublishError::NotFound(_) => ErrorKind::NotFound,
            PublishError::NotPublishable { .. } => ErrorKind::InvalidTransition,
        }
    }
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("ad not found: {0}")]
    NotFound(i64),

    #[error("ad {ad_id} cannot move from {from} to {to}")]
    InvalidTransition {
        ad_id: i64,
        from: AdStatus,
        to: AdStatus,
    },

    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl StatusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StatusError::NotFound(_) => ErrorKind::NotFound,
            StatusError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            StatusError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}
