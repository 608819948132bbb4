use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Task status as seen on the wire.
///
/// Strings that are not one of the known statuses are kept as
/// [`Status::Unknown`] rather than rejected. No task ever carries an unknown
/// status, so a filter built from one simply matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Ready,
    Running,
    Paused,
    Waiting,
    Error,
    Done,
    Unknown(String),
}

impl Status {
    /// Every status a task can actually be in.
    pub const KNOWN: [Status; 6] = [
        Status::Ready,
        Status::Running,
        Status::Paused,
        Status::Waiting,
        Status::Error,
        Status::Done,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Status::Ready => "ready",
            Status::Running => "running",
            Status::Paused => "pause",
            Status::Waiting => "wait",
            Status::Error => "error",
            Status::Done => "done",
            Status::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        match value {
            "ready" => Status::Ready,
            "running" => Status::Running,
            "pause" => Status::Paused,
            "wait" => Status::Waiting,
            "error" => Status::Error,
            "done" => Status::Done,
            other => Status::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Status::from(value.as_str())
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source reference handed to the engine (URL, magnet link, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Per-task download options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select_files: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    pub size: u64,
}

/// Metadata describing what a request points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    pub size: u64,
    pub range: bool,
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResult {
    pub id: String,
    pub res: Resource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMeta {
    pub req: Request,
    pub opts: Options,
    pub res: Resource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Nanoseconds spent downloading.
    pub used: u64,
    /// Bytes per second.
    pub speed: u64,
    pub downloaded: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub meta: TaskMeta,
    pub status: Status,
    pub progress: Progress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Engine-internal statistics for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub task_id: String,
    pub status: Status,
    pub connections: u32,
    pub speed: u64,
    pub downloaded: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProxy {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub usr: String,
    #[serde(default)]
    pub pwd: String,
}

/// Downloader-wide settings owned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloaderStoreConfig {
    #[serde(default)]
    pub download_dir: String,
    #[serde(default = "default_max_running")]
    pub max_running: usize,
    #[serde(default)]
    pub protocol_config: BTreeMap<String, Value>,
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
    #[serde(default)]
    pub proxy: DownloadProxy,
}

fn default_max_running() -> usize {
    5
}

impl Default for DownloaderStoreConfig {
    fn default() -> Self {
        Self {
            download_dir: String::new(),
            max_running: default_max_running(),
            protocol_config: BTreeMap::new(),
            extra: BTreeMap::new(),
            proxy: DownloadProxy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_known_wire_names() {
        for status in Status::KNOWN {
            let json = serde_json::to_string(&status).unwrap();
            let back: Status = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
        assert_eq!(serde_json::to_string(&Status::Paused).unwrap(), "\"pause\"");
    }

    #[test]
    fn test_unknown_status_is_kept_verbatim() {
        let status = Status::from("archived");
        assert_eq!(status, Status::Unknown("archived".to_string()));
        assert_eq!(status.to_string(), "archived");
        assert!(!Status::KNOWN.contains(&status));
    }

    #[test]
    fn test_store_config_fills_defaults() {
        let cfg: DownloaderStoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.max_running, 5);
        assert!(cfg.download_dir.is_empty());
        assert!(!cfg.proxy.enable);
    }
}
