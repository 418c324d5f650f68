//! Response payloads of the publication API.

use serde::{Deserialize, Serialize};

use super::AdStatus;

/// Successful result of `POST /api/ads/publish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub ok: bool,
    pub ad_id: i64,
    pub message_id: i64,
    /// Whether the post was pinned. A failed pin does not fail the publish.
    pub pinned: bool,
}

/// Body of `POST /api/ads/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub status: AdStatus,
}

/// Successful result of `POST /api/ads/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub ok: bool,
    pub ad_id: i64,
    pub status: AdStatus,
    /// Whether the live channel post was edited to mirror the new status.
    pub channel_synced: bool,
}

/// Failure body shared by all endpoints: `{ok: false, kind, detail}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFailure {
    pub ok: bool,
    pub kind: ErrorKind,
    pub detail: String,
}

impl ApiFailure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            kind,
            detail: detail.into(),
        }
    }
}

/// Machine-readable failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    ChannelNotFound,
    InsufficientPermissions,
    InvalidFormat,
    Unknown,
    Persistence,
    NotFound,
    InvalidTransition,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ChannelNotFound => "channel_not_found",
            ErrorKind::InsufficientPermissions => "insufficient_permissions",
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::Unknown => "unknown",
            ErrorKind::Persistence => "persistence",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidTransition => "invalid_transition",
        };
        f.write_str(s)
    }
}
