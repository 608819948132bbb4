//! Download engine interface
//!
//! The control surface talks to the engine only through [`Downloader`].
//! How bytes move, how protocols are negotiated and how transfers resume is
//! the engine's business. [`LocalEngine`] is the bundled implementation: it
//! tracks task state and scheduling slots without transferring anything.

mod error;
pub mod filter;
mod local;
mod types;

pub use error::{EngineError, Result};
pub use filter::TaskFilter;
pub use local::LocalEngine;
pub use types::{
    DownloadProxy, DownloaderStoreConfig, FileInfo, Options, Progress, Request, Resource,
    ResolveResult, Status, Task, TaskMeta, TaskStats,
};

use async_trait::async_trait;

/// Task operations exposed by a download engine
///
/// Implementations must be safe to call from many requests at once. Reads
/// return consistent snapshots; writes to the same task are serialized.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Inspect a source reference without creating a task
    async fn resolve(&self, req: Request) -> Result<ResolveResult>;

    /// Create a task from a previously resolved resource id
    async fn create(&self, rid: &str, opts: Options) -> Result<String>;

    /// Resolve and create in one step
    async fn create_direct(&self, req: Request, opts: Options) -> Result<String>;

    /// Create several tasks sharing one set of options.
    ///
    /// Not atomic: tasks created before a failure are kept.
    async fn create_direct_batch(&self, reqs: Vec<Request>, opts: Options)
    -> Result<Vec<String>>;

    async fn pause(&self, filter: &TaskFilter) -> Result<()>;

    /// Continue paused or failed tasks
    async fn resume(&self, filter: &TaskFilter) -> Result<()>;

    async fn delete(&self, filter: &TaskFilter, force: bool) -> Result<()>;

    async fn get_task(&self, id: &str) -> Option<Task>;

    /// Matching tasks in creation order
    async fn get_tasks(&self, filter: &TaskFilter) -> Vec<Task>;

    async fn stats(&self, id: &str) -> Result<TaskStats>;

    async fn get_config(&self) -> Result<DownloaderStoreConfig>;

    async fn put_config(&self, config: DownloaderStoreConfig) -> Result<()>;
}
