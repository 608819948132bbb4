//! Request and response bodies of the `/api/v1` surface.
//!
//! Field names follow the camelCase wire format clients already speak, e.g.
//!
//! ```json
//! {
//!   "rid": "",
//!   "req": { "url": "https://example.com/file.iso" },
//!   "opt": { "name": "file.iso", "path": "/srv/downloads" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::engine::{Options, Request, Task};
use crate::observability::MetricsSnapshot;

/// Body of `POST /tasks`. A non-empty `rid` wins over `req`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateTask {
    pub rid: String,
    pub req: Option<Request>,
    pub opt: Option<Options>,
}

/// Body of `POST /tasks/batch`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateTaskBatch {
    pub reqs: Vec<Request>,
    pub opt: Option<Options>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstallExtension {
    /// Repository URL, or a folder path in dev mode
    pub url: String,
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateExtensionSettings {
    pub settings: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SwitchExtension {
    /// `true` enables the extension
    pub status: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckExtensionResp {
    pub new_version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub version: String,
    pub runtime: String,
    pub os: String,
    pub arch: String,
    pub in_docker: bool,
    /// Count per known status, zeros included
    pub status_counts: BTreeMap<String, usize>,
    pub total_tasks: usize,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
