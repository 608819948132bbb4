use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::manifest::{Manifest, Repository, Setting};
use super::source::InstallSource;

/// An installed extension as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub identity: String,
    pub name: String,
    pub author: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub version: String,
    pub homepage: String,
    pub repository: Option<Repository>,
    pub settings: Vec<Setting>,
    /// Repository URL, or folder path for dev-mode installs
    pub install_url: String,
    pub dev_mode: bool,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Extension {
    pub fn from_manifest(manifest: Manifest, source: &InstallSource) -> Self {
        let now = Utc::now();
        let (install_url, dev_mode) = match source {
            InstallSource::Folder(path) => (path.clone(), true),
            InstallSource::Remote(url) => (url.clone(), false),
        };
        Self {
            identity: manifest.identity(),
            name: manifest.name,
            author: manifest.author,
            title: manifest.title,
            description: manifest.description,
            icon: manifest.icon,
            version: manifest.version,
            homepage: manifest.homepage,
            repository: manifest.repository,
            settings: manifest.settings,
            install_url,
            dev_mode,
            disabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn source(&self) -> InstallSource {
        if self.dev_mode {
            InstallSource::Folder(self.install_url.clone())
        } else {
            InstallSource::Remote(self.install_url.clone())
        }
    }

    /// Sets values of declared settings; undeclared names are ignored.
    pub fn merge_settings(&mut self, values: &BTreeMap<String, Value>) {
        for setting in &mut self.settings {
            if let Some(value) = values.get(&setting.name) {
                setting.value = value.clone();
            }
        }
    }

    /// Carries user state over from a previous install of the same identity.
    pub fn inherit(&mut self, previous: &Extension) {
        let values: BTreeMap<String, Value> = previous
            .settings
            .iter()
            .map(|s| (s.name.clone(), s.value.clone()))
            .collect();
        self.merge_settings(&values);
        self.disabled = previous.disabled;
        self.created_at = previous.created_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest() -> Manifest {
        serde_json::from_value(json!({
            "name": "bili",
            "author": "gopher",
            "version": "1.0.0",
            "settings": [
                {"name": "cookie", "type": "string", "value": ""},
                {"name": "quality", "type": "number", "value": 80}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_from_manifest_records_source() {
        let ext = Extension::from_manifest(manifest(), &InstallSource::Folder("/ext".into()));
        assert_eq!(ext.identity, "gopher@bili");
        assert!(ext.dev_mode);
        assert!(!ext.disabled);
        assert_eq!(ext.source(), InstallSource::Folder("/ext".into()));
    }

    #[test]
    fn test_merge_settings_ignores_unknown_names() {
        let mut ext =
            Extension::from_manifest(manifest(), &InstallSource::Remote("https://x".into()));
        let mut values = BTreeMap::new();
        values.insert("quality".to_string(), json!(120));
        values.insert("unknown".to_string(), json!(true));
        ext.merge_settings(&values);

        assert_eq!(ext.settings[0].value, json!(""));
        assert_eq!(ext.settings[1].value, json!(120));
        assert_eq!(ext.settings.len(), 2);
    }

    #[test]
    fn test_inherit_keeps_user_state() {
        let source = InstallSource::Remote("https://x".into());
        let mut old = Extension::from_manifest(manifest(), &source);
        old.disabled = true;
        old.settings[0].value = json!("sid=1");

        let mut fresh = Extension::from_manifest(manifest(), &source);
        fresh.version = "1.1.0".to_string();
        fresh.inherit(&old);

        assert!(fresh.disabled);
        assert_eq!(fresh.settings[0].value, json!("sid=1"));
        assert_eq!(fresh.version, "1.1.0");
        assert_eq!(fresh.created_at, old.created_at);
    }
}
