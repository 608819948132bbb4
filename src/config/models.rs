use crate::engine::DownloaderStoreConfig;
use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub extensions: ExtensionsConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Fjall keyspace location
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Required `X-Api-Token` value (loaded from environment, not from config file)
    #[serde(skip)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub api: ApiLimits,
}

/// API request limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_dir: default_data_dir(),
            api_token: None,
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9999))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize::mib(5)
}

/// Seed values for the downloader store config on first start
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    #[serde(default = "default_max_running")]
    pub max_running: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_running: default_max_running(),
        }
    }
}

impl EngineConfig {
    pub fn store_defaults(&self) -> DownloaderStoreConfig {
        DownloaderStoreConfig {
            download_dir: self.download_dir.clone(),
            max_running: self.max_running,
            ..Default::default()
        }
    }
}

fn default_download_dir() -> String {
    "downloads".to_string()
}

fn default_max_running() -> usize {
    5
}

/// Extension installation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtensionsConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Appended to repository URLs to locate `manifest.json`
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            manifest_path: default_manifest_path(),
        }
    }
}

impl ExtensionsConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_manifest_path() -> String {
    "raw/HEAD/manifest.json".to_string()
}

/// Generic relay settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_relay_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_relay_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    concat!("fetchdeck/", env!("CARGO_PKG_VERSION")).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9999");
        assert_eq!(config.server.api.max_body_bytes.as_u64(), 5 * 1024 * 1024);
        assert!(config.server.api_token.is_none());
        assert_eq!(config.engine.max_running, 5);
        assert_eq!(config.extensions.manifest_path, "raw/HEAD/manifest.json");
        assert_eq!(config.relay.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_store_defaults_seed() {
        let engine = EngineConfig {
            download_dir: "/srv/dl".to_string(),
            max_running: 2,
        };
        let seeded = engine.store_defaults();
        assert_eq!(seeded.download_dir, "/srv/dl");
        assert_eq!(seeded.max_running, 2);
        assert!(seeded.protocol_config.is_empty());
    }
}
