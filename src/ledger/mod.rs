//! Fjall-based persistence for the bundled engine
//!
//! The control surface never reads the ledger directly. It exists so the
//! local engine and extension registry survive restarts. It uses Fjall (an
//! embedded LSM key-value store) to persist:
//!
//! - Tasks (request, options, resolved resource, status, progress)
//! - Installed extensions (manifest data, settings values, enabled flag)
//! - Downloader-wide settings (the `DownloaderStoreConfig` blob)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fetchdeck::ledger::FjallStore;
//!
//! let store = FjallStore::open("data/ledger")?;
//! store.upsert_task(&task)?;
//! let tasks = store.load_tasks()?;
//! ```

pub mod error;
pub mod partitions;
pub mod store;

pub use error::{LedgerError, Result};
pub use store::{FjallStore, StoreStats};
