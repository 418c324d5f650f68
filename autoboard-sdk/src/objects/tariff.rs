use serde::{Deserialize, Serialize};

/// Publication tier purchased for an ad.
///
/// This is the API/DTO version. The pin policy attached to each tier lives
/// in `autoboard-core::entities::Tariff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TariffId {
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "premium_1")]
    Premium1,
    #[serde(rename = "premium_3")]
    Premium3,
    #[serde(rename = "premium_7")]
    Premium7,
    #[serde(rename = "vip")]
    Vip,
}

impl TariffId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TariffId::Standard => "standard",
            TariffId::Premium1 => "premium_1",
            TariffId::Premium3 => "premium_3",
            TariffId::Premium7 => "premium_7",
            TariffId::Vip => "vip",
        }
    }
}

impl std::fmt::Display for TariffId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TariffId {
    type Err = UnknownTariff;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(TariffId::Standard),
            "premium_1" => Ok(TariffId::Premium1),
            "premium_3" => Ok(TariffId::Premium3),
            "premium_7" => Ok(TariffId::Premium7),
            "vip" => Ok(TariffId::Vip),
            other => Err(UnknownTariff(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tariff: {0}")]
pub struct UnknownTariff(pub String);
