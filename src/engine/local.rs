use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::Downloader;
use super::error::{EngineError, Result};
use super::filter::TaskFilter;
use super::types::{
    DownloaderStoreConfig, FileInfo, Options, Progress, Request, ResolveResult, Resource,
    Status, Task, TaskMeta, TaskStats,
};
use crate::ledger::FjallStore;

const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "ftp", "magnet"];

/// Resolve results kept for a later `create`; the oldest is evicted first.
const RESOLVE_CACHE_LIMIT: usize = 1024;

/// A resolved resource waiting for `create`.
struct Pending {
    req: Request,
    res: Resource,
}

/// Bookkeeping-only engine
///
/// Keeps task state, honours `max_running` slots and persists everything to
/// the ledger when one is attached. Tasks are keyed by UUIDv7, so map order
/// is creation order.
pub struct LocalEngine {
    tasks: RwLock<BTreeMap<String, Task>>,
    /// Keyed by UUIDv7 rid, so key order is age order
    resolved: Mutex<BTreeMap<String, Pending>>,
    config: RwLock<DownloaderStoreConfig>,
    store: Option<FjallStore>,
}

impl LocalEngine {
    pub fn in_memory(config: DownloaderStoreConfig) -> Self {
        Self {
            tasks: RwLock::new(BTreeMap::new()),
            resolved: Mutex::new(BTreeMap::new()),
            config: RwLock::new(config),
            store: None,
        }
    }

    /// Open the engine on top of the ledger.
    ///
    /// `defaults` is used only when no config was stored before. Tasks that
    /// were running or waiting come back paused.
    pub fn open(store: FjallStore, defaults: DownloaderStoreConfig) -> Result<Self> {
        let config = match store.get_downloader_config()? {
            Some(config) => config,
            None => {
                store.put_downloader_config(&defaults)?;
                defaults
            }
        };

        let mut tasks = BTreeMap::new();
        for mut task in store.load_tasks()? {
            if matches!(task.status, Status::Running | Status::Waiting) {
                task.status = Status::Paused;
                task.progress.speed = 0;
                store.upsert_task(&task)?;
            }
            tasks.insert(task.id.clone(), task);
        }
        info!(tasks = tasks.len(), "Local engine restored");

        Ok(Self {
            tasks: RwLock::new(tasks),
            resolved: Mutex::new(BTreeMap::new()),
            config: RwLock::new(config),
            store: Some(store),
        })
    }

    fn save(&self, task: &Task) -> Result<()> {
        if let Some(store) = &self.store {
            store.upsert_task(task)?;
        }
        Ok(())
    }

    fn save_ids(&self, tasks: &BTreeMap<String, Task>, ids: &[String]) -> Result<()> {
        for id in ids {
            if let Some(task) = tasks.get(id) {
                self.save(task)?;
            }
        }
        Ok(())
    }

    async fn max_running(&self) -> usize {
        self.config.read().await.max_running.max(1)
    }

    async fn insert_task(
        &self,
        req: Request,
        mut res: Resource,
        mut opts: Options,
    ) -> Result<String> {
        opts.name = opts.name.as_deref().and_then(safe_file_name);
        if let Some(name) = &opts.name {
            res.name = name.clone();
        }

        let (download_dir, max_running) = {
            let config = self.config.read().await;
            (config.download_dir.clone(), config.max_running.max(1))
        };
        if opts.path.is_none() && !download_dir.is_empty() {
            opts.path = Some(download_dir);
        }

        let id = Uuid::now_v7().to_string();
        let now = Utc::now();

        let mut tasks = self.tasks.write().await;
        let status = if running_count(&tasks) < max_running {
            Status::Running
        } else {
            Status::Waiting
        };
        let task = Task {
            id: id.clone(),
            meta: TaskMeta { req, opts, res },
            status,
            progress: Progress::default(),
            created_at: now,
            updated_at: now,
        };
        self.save(&task)?;
        info!(task_id = %id, status = %task.status, url = %task.meta.req.url, "Task created");
        tasks.insert(id.clone(), task);

        Ok(id)
    }
}

fn running_count(tasks: &BTreeMap<String, Task>) -> usize {
    tasks
        .values()
        .filter(|task| task.status == Status::Running)
        .count()
}

/// Promote waiting tasks into free running slots, oldest first.
fn schedule(tasks: &mut BTreeMap<String, Task>, max_running: usize) -> Vec<String> {
    let mut running = running_count(tasks);
    let mut promoted = Vec::new();
    let now = Utc::now();
    for task in tasks.values_mut() {
        if running >= max_running {
            break;
        }
        if task.status == Status::Waiting {
            task.status = Status::Running;
            task.updated_at = now;
            running += 1;
            promoted.push(task.id.clone());
        }
    }
    if !promoted.is_empty() {
        debug!(count = promoted.len(), "Promoted waiting tasks");
    }
    promoted
}

fn resolve_resource(req: &Request) -> Result<Resource> {
    let raw = req.url.trim();
    let url = Url::parse(raw).map_err(|e| EngineError::InvalidUrl(format!("{raw}: {e}")))?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(EngineError::UnsupportedProtocol(url.scheme().to_string()));
    }

    let name = if url.scheme() == "magnet" {
        url.query_pairs()
            .find(|(key, _)| key == "dn")
            .map(|(_, value)| value.into_owned())
    } else {
        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| segment.to_string())
            })
    };
    let name = name
        .as_deref()
        .and_then(safe_file_name)
        .unwrap_or_else(|| "unknown".to_string());

    Ok(Resource {
        name: name.clone(),
        size: 0,
        range: false,
        files: vec![FileInfo {
            name,
            path: String::new(),
            size: 0,
        }],
    })
}

/// Turns a decoded URL segment or user supplied name into a single file name.
///
/// Separators become `_`; empty names and `.`/`..` are refused.
fn safe_file_name(raw: &str) -> Option<String> {
    let name: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect();
    is_plain_file_name(&name).then_some(name)
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Where a finished download would live on disk.
///
/// `None` unless the name is one plain component inside the download path.
fn target_path(task: &Task) -> Option<PathBuf> {
    let dir = task.meta.opts.path.as_deref()?;
    let name = task
        .meta
        .opts
        .name
        .as_deref()
        .unwrap_or(task.meta.res.name.as_str());
    if !is_plain_file_name(name) {
        warn!(task_id = %task.id, name, "Refusing file name outside the download path");
        return None;
    }
    Some(PathBuf::from(dir).join(name))
}

#[async_trait]
impl Downloader for LocalEngine {
    async fn resolve(&self, req: Request) -> Result<ResolveResult> {
        let res = resolve_resource(&req)?;
        let id = Uuid::now_v7().to_string();
        debug!(rid = %id, url = %req.url, name = %res.name, "Resolved request");

        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        while resolved.len() >= RESOLVE_CACHE_LIMIT {
            if let Some((evicted, _)) = resolved.pop_first() {
                debug!(rid = %evicted, "Evicted unused resolve result");
            }
        }
        resolved.insert(
            id.clone(),
            Pending {
                req,
                res: res.clone(),
            },
        );

        Ok(ResolveResult { id, res })
    }

    async fn create(&self, rid: &str, opts: Options) -> Result<String> {
        let pending = self
            .resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(rid)
            .ok_or_else(|| EngineError::ResolveNotFound(rid.to_string()))?;

        self.insert_task(pending.req, pending.res, opts).await
    }

    async fn create_direct(&self, req: Request, opts: Options) -> Result<String> {
        let res = resolve_resource(&req)?;
        self.insert_task(req, res, opts).await
    }

    async fn create_direct_batch(
        &self,
        reqs: Vec<Request>,
        opts: Options,
    ) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(reqs.len());
        for req in reqs {
            match self.create_direct(req, opts.clone()).await {
                Ok(id) => ids.push(id),
                Err(e) => {
                    warn!(created = ids.len(), error = %e, "Batch creation stopped");
                    return Err(e);
                }
            }
        }
        Ok(ids)
    }

    async fn pause(&self, filter: &TaskFilter) -> Result<()> {
        let max_running = self.max_running().await;
        let mut tasks = self.tasks.write().await;
        let now = Utc::now();

        let mut changed = Vec::new();
        for task in tasks.values_mut().filter(|task| filter.matches(task)) {
            if matches!(
                task.status,
                Status::Running | Status::Waiting | Status::Ready
            ) {
                task.status = Status::Paused;
                task.progress.speed = 0;
                task.updated_at = now;
                changed.push(task.id.clone());
            }
        }
        changed.extend(schedule(&mut tasks, max_running));
        self.save_ids(&tasks, &changed)?;

        debug!(changed = changed.len(), "Pause applied");
        Ok(())
    }

    async fn resume(&self, filter: &TaskFilter) -> Result<()> {
        let max_running = self.max_running().await;
        let mut tasks = self.tasks.write().await;
        let mut running = running_count(&tasks);
        let now = Utc::now();

        let mut changed = Vec::new();
        for task in tasks.values_mut().filter(|task| filter.matches(task)) {
            if matches!(task.status, Status::Paused | Status::Error | Status::Ready) {
                task.status = if running < max_running {
                    running += 1;
                    Status::Running
                } else {
                    Status::Waiting
                };
                task.updated_at = now;
                changed.push(task.id.clone());
            }
        }
        self.save_ids(&tasks, &changed)?;

        debug!(changed = changed.len(), "Continue applied");
        Ok(())
    }

    async fn delete(&self, filter: &TaskFilter, force: bool) -> Result<()> {
        let max_running = self.max_running().await;
        let removed = {
            let mut tasks = self.tasks.write().await;
            let ids: Vec<String> = tasks
                .values()
                .filter(|task| filter.matches(task))
                .map(|task| task.id.clone())
                .collect();

            let mut removed = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(store) = &self.store {
                    store.remove_task(&id)?;
                }
                if let Some(task) = tasks.remove(&id) {
                    removed.push(task);
                }
            }
            let promoted = schedule(&mut tasks, max_running);
            self.save_ids(&tasks, &promoted)?;
            removed
        };

        for task in &removed {
            info!(task_id = %task.id, force, "Task deleted");
            if !force {
                continue;
            }
            let Some(path) = target_path(task) else {
                continue;
            };
            // Tasks are already gone; file cleanup is best effort
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed downloaded file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    task_id = %task.id,
                    path = %path.display(),
                    error = %e,
                    "Failed to remove downloaded file"
                ),
            }
        }
        Ok(())
    }

    async fn get_task(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.get(id).cloned()
    }

    async fn get_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        filter.apply(tasks.values())
    }

    async fn stats(&self, id: &str) -> Result<TaskStats> {
        let tasks = self.tasks.read().await;
        let task = tasks
            .get(id)
            .ok_or_else(|| EngineError::TaskNotFound(id.to_string()))?;

        Ok(TaskStats {
            task_id: task.id.clone(),
            status: task.status.clone(),
            connections: u32::from(task.status == Status::Running),
            speed: task.progress.speed,
            downloaded: task.progress.downloaded,
            total: task.meta.res.size,
        })
    }

    async fn get_config(&self) -> Result<DownloaderStoreConfig> {
        Ok(self.config.read().await.clone())
    }

    async fn put_config(&self, config: DownloaderStoreConfig) -> Result<()> {
        if let Some(store) = &self.store {
            store.put_downloader_config(&config)?;
        }
        let max_running = config.max_running.max(1);
        *self.config.write().await = config;
        info!(max_running, "Downloader config updated");

        let mut tasks = self.tasks.write().await;
        let promoted = schedule(&mut tasks, max_running);
        self.save_ids(&tasks, &promoted)?;
        Ok(())
    }
}
