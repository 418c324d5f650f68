//! TOML file configuration structures.
//!
//! These structs directly map to the `autoboard-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Telegram bot and channel.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Numeric id (`-100…`) or `@username` of the broadcast channel.
    pub channel_id: String,
    /// Target of the "submit an ad" button under every post.
    #[serde(default = "default_submit_url")]
    pub submit_url: Url,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: Url,
}

// Keeps the bot token out of logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("submit_url", &self.submit_url.as_str())
            .field("api_base_url", &self.api_base_url.as_str())
            .finish()
    }
}

fn default_submit_url() -> Url {
    Url::parse("https://t.me/myautoboard_bot/autoboard").expect("valid default submit url")
}

fn default_api_base_url() -> Url {
    Url::parse(autoboard_core::telegram::TelegramBotApi::DEFAULT_BASE_URL)
        .expect("valid default api url")
}

/// Photo uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

/// Unpin sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound between sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_batch_size() -> i64 {
    50
}
