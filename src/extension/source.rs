//! Where extension manifests come from

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::error::{ExtensionError, Result};
use super::manifest::{MANIFEST_FILE, Manifest};

/// Where an installed extension was installed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// Local folder, used by extension authors.
    Folder(String),
    /// Version-controlled repository URL.
    Remote(String),
}

/// Fetch configuration for remote installs
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    /// Path of the manifest relative to the repository URL
    pub manifest_path: String,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            manifest_path: "raw/HEAD/manifest.json".to_string(),
            user_agent: concat!("fetchdeck/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Reads manifests from folders and remote repositories
#[derive(Debug, Clone)]
pub struct ManifestSource {
    client: Client,
    config: FetchConfig,
}

impl ManifestSource {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ExtensionError::Fetch(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub async fn load(&self, source: &InstallSource) -> Result<Manifest> {
        let manifest = match source {
            InstallSource::Folder(path) => self.read_folder(Path::new(path)).await?,
            InstallSource::Remote(url) => self.fetch_remote(url).await?,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    async fn read_folder(&self, folder: &Path) -> Result<Manifest> {
        let path = folder.join(MANIFEST_FILE);
        debug!(path = %path.display(), "Reading extension manifest");
        let data = tokio::fs::read(&path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn fetch_remote(&self, repo_url: &str) -> Result<Manifest> {
        let url = self.manifest_url(repo_url)?;
        debug!(%url, "Fetching extension manifest");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| ExtensionError::Fetch(e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| ExtensionError::Fetch(e.to_string()))?;

        Ok(serde_json::from_slice(&body)?)
    }

    /// Maps a repository URL to the URL of its manifest.
    ///
    /// A URL that already points at a `.json` file is used as-is.
    pub fn manifest_url(&self, repo_url: &str) -> Result<url::Url> {
        let trimmed = repo_url.trim();
        let raw = if trimmed.ends_with(".json") {
            trimmed.to_string()
        } else {
            let base = trimmed.trim_end_matches('/');
            let base = base.strip_suffix(".git").unwrap_or(base);
            format!(
                "{}/{}",
                base,
                self.config.manifest_path.trim_start_matches('/')
            )
        };

        let url = url::Url::parse(&raw)
            .map_err(|e| ExtensionError::Fetch(format!("invalid repository url: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ExtensionError::Fetch(format!(
                "unsupported repository scheme: {other}"
            ))),
        }
    }
}
