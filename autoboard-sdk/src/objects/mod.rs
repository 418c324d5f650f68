pub mod responses;
pub mod submission;
pub mod tariff;

pub use responses::{ApiFailure, ErrorKind, PublishResponse, SetStatusRequest, StatusResponse};
pub use submission::AdSubmission;
pub use tariff::TariffId;

use serde::{Deserialize, Serialize};

/// Ad status for API requests and responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `autoboard-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdStatus {
    Active,
    /// Withdrawn by the owner.
    Inactive,
    /// Sold.
    Deleted,
}

impl std::fmt::Display for AdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdStatus::Active => write!(f, "active"),
            AdStatus::Inactive => write!(f, "inactive"),
            AdStatus::Deleted => write!(f, "deleted"),
        }
    }
}
