use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::engine::{DownloaderStoreConfig, Task};
use crate::extension::Extension;

use super::error::{LedgerError, Result};
use super::partitions::{
    DOWNLOADER_CONFIG, decode_extension_key, decode_task_key, encode_extension_key,
    encode_setting_key, encode_task_key,
};

/// Fjall-backed persistent storage for tasks, extensions, and settings
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    tasks: PartitionHandle,
    extensions: PartitionHandle,
    settings: PartitionHandle,
}

impl FjallStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let tasks = keyspace.open_partition("tasks", PartitionCreateOptions::default())?;
        let extensions =
            keyspace.open_partition("extensions", PartitionCreateOptions::default())?;
        let settings = keyspace.open_partition("settings", PartitionCreateOptions::default())?;

        info!("Fjall store opened successfully");
        Ok(Self {
            keyspace,
            tasks,
            extensions,
            settings,
        })
    }

    /// Store or update a task
    pub fn upsert_task(&self, task: &Task) -> Result<()> {
        put_json(&self.tasks, encode_task_key(&task.id), task)?;
        debug!(task_id = %task.id, status = %task.status, "Upserted task");
        Ok(())
    }

    pub fn remove_task(&self, task_id: &str) -> Result<()> {
        self.tasks.remove(encode_task_key(task_id))?;
        debug!(task_id, "Removed task");
        Ok(())
    }

    /// Load every persisted task, in key order
    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        load_all(&self.tasks, decode_task_key)
    }

    /// Store or update an installed extension
    pub fn upsert_extension(&self, extension: &Extension) -> Result<()> {
        put_json(
            &self.extensions,
            encode_extension_key(&extension.identity),
            extension,
        )?;
        debug!(identity = %extension.identity, "Upserted extension");
        Ok(())
    }

    pub fn remove_extension(&self, identity: &str) -> Result<()> {
        self.extensions.remove(encode_extension_key(identity))?;
        debug!(identity, "Removed extension");
        Ok(())
    }

    pub fn load_extensions(&self) -> Result<Vec<Extension>> {
        load_all(&self.extensions, decode_extension_key)
    }

    pub fn put_downloader_config(&self, config: &DownloaderStoreConfig) -> Result<()> {
        put_json(&self.settings, encode_setting_key(DOWNLOADER_CONFIG), config)
    }

    pub fn get_downloader_config(&self) -> Result<Option<DownloaderStoreConfig>> {
        let key = encode_setting_key(DOWNLOADER_CONFIG);
        match self.settings.get(&key)? {
            Some(value) => decode(&key, &value).map(Some),
            None => Ok(None),
        }
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Get internal statistics (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut task_count = 0;
        let mut extension_count = 0;

        for item in self.tasks.iter() {
            item?;
            task_count += 1;
        }

        for item in self.extensions.iter() {
            item?;
            extension_count += 1;
        }

        Ok(StoreStats {
            task_count,
            extension_count,
        })
    }
}

fn put_json<T: Serialize>(partition: &PartitionHandle, key: Vec<u8>, value: &T) -> Result<()> {
    let value = serde_json::to_vec(value)?;
    partition.insert(key, value)?;
    Ok(())
}

fn load_all<T, F>(partition: &PartitionHandle, decode_key: F) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(&[u8]) -> Option<String>,
{
    let mut items = Vec::new();
    for item in partition.iter() {
        let (key, value) = item?;
        if decode_key(&key).is_none() {
            return Err(LedgerError::InvalidKey(
                String::from_utf8_lossy(&key).into_owned(),
            ));
        }
        items.push(decode(&key, &value)?);
    }
    Ok(items)
}

fn decode<T: DeserializeOwned>(key: &[u8], value: &[u8]) -> Result<T> {
    serde_json::from_slice(value).map_err(|source| LedgerError::Corrupt {
        key: String::from_utf8_lossy(key).into_owned(),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub task_count: usize,
    pub extension_count: usize,
}
