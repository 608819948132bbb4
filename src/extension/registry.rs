use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::ExtensionHost;
use super::error::{ExtensionError, Result};
use super::manifest::is_version_newer;
use super::source::{InstallSource, ManifestSource};
use super::types::Extension;
use crate::ledger::FjallStore;

/// Installed extensions, keyed by identity
///
/// State machine per identity:
/// `Uninstalled -> Installed{enabled|disabled} -> Updating -> Installed`,
/// and `Installed -> Uninstalled` via delete.
pub struct ExtensionRegistry {
    extensions: RwLock<BTreeMap<String, Extension>>,
    updating: Mutex<HashSet<String>>,
    source: ManifestSource,
    store: Option<FjallStore>,
}

/// Marks an identity as `Updating` until dropped.
struct UpdateGuard<'a> {
    updating: &'a Mutex<HashSet<String>>,
    identity: String,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.updating
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.identity);
    }
}

impl ExtensionRegistry {
    /// Registry that keeps everything in memory
    pub fn in_memory(source: ManifestSource) -> Self {
        Self {
            extensions: RwLock::new(BTreeMap::new()),
            updating: Mutex::new(HashSet::new()),
            source,
            store: None,
        }
    }

    /// Registry backed by the ledger, reloading previously installed extensions
    pub fn open(source: ManifestSource, store: FjallStore) -> Result<Self> {
        let installed: BTreeMap<String, Extension> = store
            .load_extensions()?
            .into_iter()
            .map(|ext| (ext.identity.clone(), ext))
            .collect();
        info!(count = installed.len(), "Loaded installed extensions");

        Ok(Self {
            extensions: RwLock::new(installed),
            updating: Mutex::new(HashSet::new()),
            source,
            store: Some(store),
        })
    }

    fn is_updating(&self, identity: &str) -> bool {
        self.updating
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(identity)
    }

    fn begin_update(&self, identity: &str) -> Result<UpdateGuard<'_>> {
        let mut updating = self
            .updating
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !updating.insert(identity.to_string()) {
            return Err(ExtensionError::Updating(identity.to_string()));
        }
        Ok(UpdateGuard {
            updating: &self.updating,
            identity: identity.to_string(),
        })
    }

    fn save(&self, extension: &Extension) -> Result<()> {
        if let Some(store) = &self.store {
            store.upsert_extension(extension)?;
        }
        Ok(())
    }

    async fn install(&self, source: InstallSource) -> Result<Extension> {
        let manifest = self.source.load(&source).await?;
        let mut extension = Extension::from_manifest(manifest, &source);
        let identity = extension.identity.clone();

        if self.is_updating(&identity) {
            return Err(ExtensionError::Updating(identity));
        }

        let mut extensions = self.extensions.write().await;
        if let Some(previous) = extensions.get(&identity) {
            debug!(%identity, "Reinstalling extension");
            extension.inherit(previous);
        }
        self.save(&extension)?;
        extensions.insert(identity.clone(), extension.clone());

        info!(
            %identity,
            version = %extension.version,
            dev_mode = extension.dev_mode,
            "Extension installed"
        );
        Ok(extension)
    }

    /// Applies `mutate` to an installed extension and persists the result.
    async fn modify<F>(&self, identity: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Extension),
    {
        let mut extensions = self.extensions.write().await;
        let extension = extensions
            .get_mut(identity)
            .ok_or_else(|| ExtensionError::NotFound(identity.to_string()))?;

        let mut next = extension.clone();
        mutate(&mut next);
        next.updated_at = chrono::Utc::now();
        self.save(&next)?;
        *extension = next;
        Ok(())
    }

    /// Latest manifest version available from the install source.
    async fn latest_version(&self, current: &Extension) -> Result<String> {
        let manifest = self.source.load(&current.source()).await?;
        Ok(manifest.version)
    }
}

#[async_trait]
impl ExtensionHost for ExtensionRegistry {
    async fn install_by_folder(&self, path: &str) -> Result<Extension> {
        self.install(InstallSource::Folder(path.to_string())).await
    }

    async fn install_by_git(&self, url: &str) -> Result<Extension> {
        self.install(InstallSource::Remote(url.to_string())).await
    }

    async fn list(&self) -> Vec<Extension> {
        self.extensions.read().await.values().cloned().collect()
    }

    async fn get(&self, identity: &str) -> Result<Extension> {
        self.extensions
            .read()
            .await
            .get(identity)
            .cloned()
            .ok_or_else(|| ExtensionError::NotFound(identity.to_string()))
    }

    async fn update_settings(
        &self,
        identity: &str,
        settings: BTreeMap<String, Value>,
    ) -> Result<()> {
        self.modify(identity, |ext| ext.merge_settings(&settings))
            .await?;
        debug!(identity, keys = settings.len(), "Extension settings updated");
        Ok(())
    }

    async fn switch(&self, identity: &str, enabled: bool) -> Result<()> {
        self.modify(identity, |ext| ext.disabled = !enabled).await?;
        info!(identity, enabled, "Extension switched");
        Ok(())
    }

    async fn upgrade_check(&self, identity: &str) -> Result<String> {
        let current = self.get(identity).await?;
        let latest = self.latest_version(&current).await?;
        if is_version_newer(&latest, &current.version) {
            Ok(latest)
        } else {
            Ok(current.version)
        }
    }

    async fn upgrade(&self, identity: &str) -> Result<()> {
        let _guard = self.begin_update(identity)?;

        let current = self.get(identity).await?;
        let source = current.source();
        let manifest = self.source.load(&source).await?;
        if !is_version_newer(&manifest.version, &current.version) {
            debug!(identity, version = %current.version, "Extension already up to date");
            return Ok(());
        }
        if manifest.identity() != identity {
            return Err(ExtensionError::InvalidManifest(format!(
                "identity changed from {} to {}",
                identity,
                manifest.identity()
            )));
        }

        let mut next = Extension::from_manifest(manifest, &source);
        let mut extensions = self.extensions.write().await;
        let previous = extensions
            .get(identity)
            .ok_or_else(|| ExtensionError::NotFound(identity.to_string()))?;
        next.inherit(previous);
        self.save(&next)?;

        info!(
            identity,
            from = %previous.version,
            to = %next.version,
            "Extension upgraded"
        );
        extensions.insert(identity.to_string(), next);
        Ok(())
    }

    async fn delete(&self, identity: &str) -> Result<()> {
        if self.is_updating(identity) {
            return Err(ExtensionError::Updating(identity.to_string()));
        }

        let mut extensions = self.extensions.write().await;
        if !extensions.contains_key(identity) {
            return Err(ExtensionError::NotFound(identity.to_string()));
        }
        if let Some(store) = &self.store {
            store.remove_extension(identity)?;
        }
        extensions.remove(identity);

        info!(identity, "Extension deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::source::FetchConfig;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, version: &str) {
        let manifest = json!({
            "name": "demo",
            "author": "dev",
            "version": version,
            "settings": [{"name": "token", "value": ""}]
        });
        std::fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
    }

    fn registry() -> ExtensionRegistry {
        ExtensionRegistry::in_memory(ManifestSource::new(FetchConfig::default()).unwrap())
    }

    fn folder(dir: &TempDir) -> String {
        dir.path().display().to_string()
    }

    #[tokio::test]
    async fn test_install_from_folder_is_dev_mode() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "1.0.0");
        let registry = registry();

        let ext = registry.install_by_folder(&folder(&dir)).await.unwrap();
        assert_eq!(ext.identity, "dev@demo");
        assert!(ext.dev_mode);
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_settings_and_switch_require_installed_extension() {
        let registry = registry();
        let err = registry.switch("nobody@none", true).await.unwrap_err();
        assert!(matches!(err, ExtensionError::NotFound(_)));

        let err = registry
            .update_settings("nobody@none", BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtensionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_switch_and_settings_survive_upgrade() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "1.0.0");
        let registry = registry();
        registry.install_by_folder(&folder(&dir)).await.unwrap();

        registry.switch("dev@demo", false).await.unwrap();
        let mut values = BTreeMap::new();
        values.insert("token".to_string(), json!("abc"));
        registry.update_settings("dev@demo", values).await.unwrap();

        assert_eq!(registry.upgrade_check("dev@demo").await.unwrap(), "1.0.0");
        registry.upgrade("dev@demo").await.unwrap();
        assert_eq!(registry.get("dev@demo").await.unwrap().version, "1.0.0");

        write_manifest(dir.path(), "1.2.0");
        assert_eq!(registry.upgrade_check("dev@demo").await.unwrap(), "1.2.0");
        // the check alone does not change anything
        assert_eq!(registry.get("dev@demo").await.unwrap().version, "1.0.0");

        registry.upgrade("dev@demo").await.unwrap();
        let ext = registry.get("dev@demo").await.unwrap();
        assert_eq!(ext.version, "1.2.0");
        assert!(ext.disabled);
        assert_eq!(ext.settings[0].value, json!("abc"));
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "1.0.0");
        let registry = registry();
        registry.install_by_folder(&folder(&dir)).await.unwrap();

        registry.delete("dev@demo").await.unwrap();
        let err = registry.delete("dev@demo").await.unwrap_err();
        assert!(matches!(err, ExtensionError::NotFound(_)));
        assert_eq!(err.to_string(), "extension not found");
    }

    #[tokio::test]
    async fn test_delete_is_rejected_while_updating() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "1.0.0");
        let registry = registry();
        registry.install_by_folder(&folder(&dir)).await.unwrap();

        let guard = registry.begin_update("dev@demo").unwrap();
        assert!(matches!(
            registry.delete("dev@demo").await,
            Err(ExtensionError::Updating(_))
        ));
        assert!(registry.begin_update("dev@demo").is_err());
        drop(guard);

        registry.delete("dev@demo").await.unwrap();
    }

    #[tokio::test]
    async fn test_installed_extensions_are_reloaded_from_ledger() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "1.0.0");
        let ledger_dir = TempDir::new().unwrap();
        let store = FjallStore::open(ledger_dir.path().join("ledger")).unwrap();
        let source = ManifestSource::new(FetchConfig::default()).unwrap();

        {
            let registry = ExtensionRegistry::open(source.clone(), store.clone()).unwrap();
            registry.install_by_folder(&folder(&dir)).await.unwrap();
            registry.switch("dev@demo", false).await.unwrap();
        }

        let reopened = ExtensionRegistry::open(source, store).unwrap();
        let ext = reopened.get("dev@demo").await.unwrap();
        assert!(ext.disabled);
    }
}
