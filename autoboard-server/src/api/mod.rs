//! Publication API handlers.
//!
//! # Endpoints
//!
//! - `POST /ads/publish`       – persist a submission and post it to the channel
//! - `POST /ads/{ad_id}/publish` – re-send an active ad that has no channel post
//! - `POST /ads/{ad_id}/status`  – withdraw or mark sold, and update the post
//!
//! Every failure is answered with an `ApiFailure` body `{ok: false, kind, detail}`.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use autoboard_core::errors::{PublishError, StatusError};
use autoboard_sdk::objects::{ApiFailure, ErrorKind};

use crate::state::AppState;

mod ads;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ads/publish", post(ads::publish))
        .route("/ads/{ad_id}/publish", post(ads::retry_publish))
        .route("/ads/{ad_id}/status", post(ads::set_status))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in API handlers.
#[derive(Debug)]
pub(crate) enum ApiError {
    Publish(PublishError),
    Status(StatusError),
    /// The request body could not be decoded.
    BadRequest(String),
}

impl From<PublishError> for ApiError {
    fn from(value: PublishError) -> Self {
        ApiError::Publish(value)
    }
}

impl From<StatusError> for ApiError {
    fn from(value: StatusError) -> Self {
        ApiError::Status(value)
    }
}

impl ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Publish(e) => e.kind(),
            ApiError::Status(e) => e.kind(),
            ApiError::BadRequest(_) => ErrorKind::Validation,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Publish(e) => e.to_string(),
            ApiError::Status(e) => e.to_string(),
            ApiError::BadRequest(message) => message.clone(),
        }
    }
}

fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::InvalidFormat | ErrorKind::ChannelNotFound => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::InsufficientPermissions => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Unknown => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let detail = match kind {
            ErrorKind::Persistence => {
                tracing::error!(error = %self.detail(), "API database error");
                "internal server error".to_string()
            }
            _ => {
                tracing::debug!(kind = %kind, error = %self.detail(), "API request failed");
                self.detail()
            }
        };
        (status_code(kind), Json(ApiFailure::new(kind, detail))).into_response()
    }
}
