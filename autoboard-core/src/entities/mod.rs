pub mod ad_photos;
pub mod ads;
pub mod unpin_jobs;
pub mod users;

use autoboard_sdk::objects::{AdStatus as SdkAdStatus, TariffId as SdkTariffId};

/// Publication tariff for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `autoboard_sdk::objects::TariffId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "tariff")]
pub enum Tariff {
    #[sqlx(rename = "standard")]
    Standard,
    #[sqlx(rename = "premium_1")]
    Premium1,
    #[sqlx(rename = "premium_3")]
    Premium3,
    #[sqlx(rename = "premium_7")]
    Premium7,
    #[sqlx(rename = "vip")]
    Vip,
}

/// How long a published post stays pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinPolicy {
    /// Never pinned.
    None,
    /// Pinned, then unpinned by a scheduled job after the duration.
    FixedDuration(time::Duration),
    /// Pinned for the nominal duration, with no unpin job.
    Persistent(time::Duration),
}

impl PinPolicy {
    pub fn pins(&self) -> bool {
        !matches!(self, PinPolicy::None)
    }

    /// Delay before the scheduled unpin, only for fixed-duration policies.
    pub fn unpin_after(&self) -> Option<time::Duration> {
        match self {
            PinPolicy::FixedDuration(d) => Some(*d),
            PinPolicy::None | PinPolicy::Persistent(_) => None,
        }
    }
}

impl Tariff {
    pub fn pin_policy(&self) -> PinPolicy {
        match self {
            Tariff::Standard => PinPolicy::None,
            Tariff::Premium1 => PinPolicy::FixedDuration(time::Duration::hours(24)),
            Tariff::Premium3 => PinPolicy::FixedDuration(time::Duration::days(3)),
            Tariff::Premium7 => PinPolicy::FixedDuration(time::Duration::days(7)),
            Tariff::Vip => PinPolicy::Persistent(time::Duration::days(30)),
        }
    }

    /// The top tier gets the highlighted banner.
    pub fn is_top_tier(&self) -> bool {
        matches!(self, Tariff::Vip)
    }
}

impl std::fmt::Display for Tariff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkTariffId::from(*self).fmt(f)
    }
}

impl From<Tariff> for SdkTariffId {
    fn from(value: Tariff) -> Self {
        match value {
            Tariff::Standard => SdkTariffId::Standard,
            Tariff::Premium1 => SdkTariffId::Premium1,
            Tariff::Premium3 => SdkTariffId::Premium3,
            Tariff::Premium7 => SdkTariffId::Premium7,
            Tariff::Vip => SdkTariffId::Vip,
        }
    }
}

impl From<SdkTariffId> for Tariff {
    fn from(value: SdkTariffId) -> Self {
        match value {
            SdkTariffId::Standard => Tariff::Standard,
            SdkTariffId::Premium1 => Tariff::Premium1,
            SdkTariffId::Premium3 => Tariff::Premium3,
            SdkTariffId::Premium7 => Tariff::Premium7,
            SdkTariffId::Vip => Tariff::Vip,
        }
    }
}

/// Ad status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `autoboard_sdk::objects::AdStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "ad_status")]
pub enum AdStatus {
    Active,
    Inactive,
    Deleted,
}

impl AdStatus {
    /// Active is the only status with outgoing transitions.
    pub fn can_transition_to(&self, target: AdStatus) -> bool {
        matches!(
            (self, target),
            (AdStatus::Active, AdStatus::Inactive) | (AdStatus::Active, AdStatus::Deleted)
        )
    }
}

impl std::fmt::Display for AdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkAdStatus::from(*self).fmt(f)
    }
}

impl From<AdStatus> for SdkAdStatus {
    fn from(value: AdStatus) -> Self {
        match value {
            AdStatus::Active => SdkAdStatus::Active,
            AdStatus::Inactive => SdkAdStatus::Inactive,
            AdStatus::Deleted => SdkAdStatus::Deleted,
        }
    }
}

impl From<SdkAdStatus> for AdStatus {
    fn from(value: SdkAdStatus) -> Self {
        match value {
            SdkAdStatus::Active => AdStatus::Active,
            SdkAdStatus::Inactive => AdStatus::Inactive,
            SdkAdStatus::Deleted => AdStatus::Deleted,
        }
    }
}

/// Shape of the channel post, which decides how it can be edited later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "post_kind")]
pub enum PostKind {
    Photo,
    Text,
}
