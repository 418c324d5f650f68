use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use autoboard_sdk::objects::{AdSubmission, PublishResponse, SetStatusRequest, StatusResponse};

use crate::state::AppState;

use super::ApiError;

/// `POST /ads/publish`: persist the ad, post it, apply the tariff's pin.
pub async fn publish(
    State(state): State<AppState>,
    body: Result<Json<AdSubmission>, JsonRejection>,
) -> Result<Json<PublishResponse>, ApiError> {
    let Json(submission) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let outcome = state.engine.publish(submission).await?;

    Ok(Json(PublishResponse {
        ok: true,
        ad_id: outcome.ad_id,
        message_id: outcome.message_id,
        pinned: outcome.pinned,
    }))
}

/// `POST /ads/{ad_id}/publish`: resume a publication whose channel send failed.
pub async fn retry_publish(
    State(state): State<AppState>,
    Path(ad_id): Path<i64>,
) -> Result<Json<PublishResponse>, ApiError> {
    let outcome = state.engine.retry_publish(ad_id).await?;

    Ok(Json(PublishResponse {
        ok: true,
        ad_id: outcome.ad_id,
        message_id: outcome.message_id,
        pinned: outcome.pinned,
    }))
}

/// `POST /ads/{ad_id}/status`: move the ad to `inactive` or `deleted`.
///
/// The status change is committed even when the channel post cannot be
/// edited; `channelSynced` reports whether the edit went through.
pub async fn set_status(
    State(state): State<AppState>,
    Path(ad_id): Path<i64>,
    body: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let change = state.engine.set_status(ad_id, request.status.into()).await?;

    Ok(Json(StatusResponse {
        ok: true,
        ad_id: change.ad_id,
        status: change.status.into(),
        channel_synced: change.channel_synced,
    }))
}
