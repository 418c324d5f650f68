//! HTTP client for the publication API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

use reqwest::{Client, StatusCode};
use url::Url;

use crate::objects::{
    AdStatus, AdSubmission, ApiFailure, PublishResponse, SetStatusRequest, StatusResponse,
};

/// Errors produced by the SDK HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a structured `{ok: false}` body.
    #[error("api error: status {status}, {} ({})", .failure.kind, .failure.detail)]
    Api {
        status: StatusCode,
        failure: ApiFailure,
    },

    /// The server returned a non-2xx status without a structured body.
    #[error("unexpected response: status {status}, body: {body}")]
    Unexpected { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Typed HTTP client for the publication API.
#[derive(Debug, Clone)]
pub struct AutoboardClient {
    http: Client,
    base_url: Url,
}

impl AutoboardClient {
    /// Create a new client for the server rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/ads/publish` – persist the ad and post it to the channel.
    ///
    /// Not retried: a retry after a transport error may produce a second
    /// channel post.
    pub async fn publish(&self, submission: &AdSubmission) -> Result<PublishResponse, ClientError> {
        let url = self.base_url.join("/api/ads/publish")?;
        let resp = self.http.post(url).json(submission).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/ads/{id}/publish` – re-send an active ad whose channel
    /// post failed.
    pub async fn retry_publish(&self, ad_id: i64) -> Result<PublishResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/ads/{ad_id}/publish"))?;
        let resp = self.http.post(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/ads/{id}/status` – withdraw (`Inactive`) or mark sold (`Deleted`).
    pub async fn set_status(
        &self,
        ad_id: i64,
        status: AdStatus,
    ) -> Result<StatusResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/ads/{ad_id}/status"))?;
        let resp = self
            .http
            .post(url)
            .json(&SetStatusRequest { status })
            .send()
            .await?;
        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        return match serde_json::from_slice::<ApiFailure>(&bytes) {
            Ok(failure) => Err(ClientError::Api { status, failure }),
            Err(_) => Err(ClientError::Unexpected {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }),
        };
    }
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
