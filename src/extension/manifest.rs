use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ExtensionError;

/// File name of the manifest at the root of every extension.
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub directory: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    #[default]
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingOption {
    pub label: String,
    pub value: Value,
}

/// A user-tunable option declared by an extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type")]
    pub kind: SettingType,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SettingOption>,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub version: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub settings: Vec<Setting>,
}

impl Manifest {
    /// `author@name`, or just `name` for anonymous extensions.
    pub fn identity(&self) -> String {
        if self.author.is_empty() {
            self.name.clone()
        } else {
            format!("{}@{}", self.author, self.name)
        }
    }

    pub fn validate(&self) -> Result<(), ExtensionError> {
        if self.name.trim().is_empty() {
            return Err(ExtensionError::InvalidManifest("name is required".into()));
        }
        if self.version.trim().is_empty() {
            return Err(ExtensionError::InvalidManifest("version is required".into()));
        }
        if self.name.contains('/') || self.author.contains('/') {
            return Err(ExtensionError::InvalidManifest(
                "name and author must not contain '/'".into(),
            ));
        }
        Ok(())
    }
}

fn parse_version_parts(input: &str) -> Vec<u64> {
    input
        .trim()
        .trim_start_matches('v')
        .split('.')
        .map(|part| {
            part.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse::<u64>()
                .unwrap_or(0)
        })
        .collect()
}

/// Numeric dotted-part comparison; missing parts count as zero.
pub fn is_version_newer(latest: &str, current: &str) -> bool {
    let a = parse_version_parts(latest);
    let b = parse_version_parts(current);
    let max_len = a.len().max(b.len());
    for idx in 0..max_len {
        let av = a.get(idx).copied().unwrap_or(0);
        let bv = b.get(idx).copied().unwrap_or(0);
        if av != bv {
            return av > bv;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(name: &str, author: &str) -> Manifest {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "author": author,
            "version": "1.0.0",
        }))
        .unwrap()
    }

    #[test]
    fn test_identity_includes_author_when_present() {
        assert_eq!(manifest("bili", "gopher").identity(), "gopher@bili");
        assert_eq!(manifest("bili", "").identity(), "bili");
    }

    #[test]
    fn test_validate_requires_name_and_version() {
        assert!(manifest("bili", "gopher").validate().is_ok());
        assert!(matches!(
            manifest(" ", "gopher").validate(),
            Err(ExtensionError::InvalidManifest(_))
        ));

        let mut no_version = manifest("bili", "");
        no_version.version = String::new();
        assert!(no_version.validate().is_err());
    }

    #[test]
    fn test_setting_type_defaults_to_string() {
        let setting: Setting =
            serde_json::from_value(serde_json::json!({"name": "cookie"})).unwrap();
        assert_eq!(setting.kind, SettingType::String);
        assert_eq!(setting.value, Value::Null);
    }

    #[test]
    fn test_version_comparison() {
        assert!(is_version_newer("1.0.1", "1.0.0"));
        assert!(is_version_newer("1.10.0", "1.9.9"));
        assert!(is_version_newer("v2.0", "1.99.99"));
        assert!(!is_version_newer("1.0.0", "1.0.0"));
        assert!(!is_version_newer("1.0", "1.0.0"));
        assert!(!is_version_newer("0.9.0", "1.0.0"));
    }
}
