//! Extension subsystem
//!
//! Extensions are installable plugin units described by a `manifest.json`.
//! They come either from a local folder (dev mode, meant for extension
//! authors) or from a remote version-controlled repository. This module
//! only manages their lifecycle; it never executes extension code.
//!
//! ## Key Components
//!
//! - [`ExtensionHost`] - Lifecycle operations the API layer talks to
//! - [`ExtensionRegistry`] - Built-in host backed by the ledger
//! - [`ManifestSource`] - Reads manifests from folders and repositories
//! - [`Extension`] - An installed extension as reported to clients

mod error;
mod manifest;
mod registry;
mod source;
mod types;

pub use error::{ExtensionError, Result};
pub use manifest::{
    MANIFEST_FILE, Manifest, Repository, Setting, SettingOption, SettingType, is_version_newer,
};
pub use registry::ExtensionRegistry;
pub use source::{FetchConfig, InstallSource, ManifestSource};
pub use types::Extension;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Extension lifecycle operations
#[async_trait]
pub trait ExtensionHost: Send + Sync {
    /// Install from a local folder in dev mode
    async fn install_by_folder(&self, path: &str) -> Result<Extension>;

    /// Install from a remote repository URL
    async fn install_by_git(&self, url: &str) -> Result<Extension>;

    async fn list(&self) -> Vec<Extension>;

    async fn get(&self, identity: &str) -> Result<Extension>;

    /// Merge values into the extension's declared settings
    async fn update_settings(
        &self,
        identity: &str,
        settings: BTreeMap<String, Value>,
    ) -> Result<()>;

    async fn switch(&self, identity: &str, enabled: bool) -> Result<()>;

    /// Newer version if one exists, the installed version otherwise
    async fn upgrade_check(&self, identity: &str) -> Result<String>;

    /// Upgrade to the latest version; no-op when already current
    async fn upgrade(&self, identity: &str) -> Result<()>;

    async fn delete(&self, identity: &str) -> Result<()>;
}
