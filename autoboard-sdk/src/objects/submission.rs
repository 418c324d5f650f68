use serde::{Deserialize, Serialize};

/// Ad submission sent by the Mini App when the user confirms publication.
///
/// Field names follow the Mini App's camelCase JSON. Text fields are taken
/// verbatim; escaping for the channel markup happens in the core formatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdSubmission {
    /// Telegram user id of the submitter.
    pub user_id: i64,
    /// Telegram display name or username of the submitter.
    #[serde(default)]
    pub user_name: Option<String>,

    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub modification: Option<String>,
    pub year: String,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub power: Option<String>,
    /// Mileage in thousands of kilometres.
    pub mileage: String,
    #[serde(default)]
    pub drivetrain: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub city: Option<String>,
    /// Price in rubles, digits only.
    pub price: String,

    #[serde(default)]
    pub phone: Option<String>,
    /// Telegram handle, with or without the leading `@`.
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub show_phone: bool,
    #[serde(default)]
    pub show_telegram: bool,

    /// Uploaded photo references in display order.
    #[serde(default)]
    pub photos: Vec<String>,
    /// Raw tariff identifier (`standard`, `premium_1`, `premium_3`, `premium_7`, `vip`).
    pub tariff: String,
}
