// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Repository Implementations
//!
//! Adapters for the persistence ports in `crate::domain::repository`.
//!
//! - [`FileKeyValueStore`]: one file per slot under a storage directory. This
//!   is the durable store the CLI uses.
//! - [`InMemoryKeyValueStore`]: process-local slots, for tests and dry runs.
//! - [`KeyValueListingStore`]: the listing collection as a JSON array in a
//!   single key-value slot.
//! - [`InMemoryListingStore`]: listing collection held in a `Vec`.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::listing::LocalListingRecord;
use crate::domain::repository::{KeyValueStore, LocalListingStore, RepositoryError, LISTINGS_KEY};

// ============================================================================
// Key-value stores
// ============================================================================

/// Slots persisted as files named after their key.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, RepositoryError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            && !key.starts_with('.');
        if !valid {
            return Err(RepositoryError::Storage(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let path = self.slot_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        let path = self.slot_path(key)?;
        tokio::fs::create_dir_all(&self.root).await?;

        // Write then rename so a crash never leaves a half-written slot
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(key, path = %path.display(), "Wrote storage slot");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        let path = self.slot_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyValueStore {
    slots: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.slots.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        self.slots.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        self.slots.write().remove(key);
        Ok(())
    }
}

// ============================================================================
// Listing stores
// ============================================================================

/// Decode a stored listing array, skipping anything that is not a record.
fn decode_listings(raw: &str) -> Vec<LocalListingRecord> {
    let entries = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            warn!("Listing slot does not hold an array, treating as empty");
            return Vec::new();
        }
        Err(e) => {
            warn!("Listing slot is not valid JSON ({}), treating as empty", e);
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter(|entry| {
            entry.get("id").map(Value::is_string).unwrap_or(false)
                && entry.get("agentData").map(Value::is_object).unwrap_or(false)
        })
        .filter_map(|entry| match serde_json::from_value::<LocalListingRecord>(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Skipping undecodable listing entry: {}", e);
                None
            }
        })
        .collect()
}

/// Listing collection stored as a JSON array in one key-value slot.
///
/// Appends within this process are serialized; separate processes sharing
/// the slot resolve as last writer wins.
pub struct KeyValueListingStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Mutex<()>,
}

impl KeyValueListingStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, LISTINGS_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Raw entries currently in the slot, kept verbatim for rewriting.
    ///
    /// A slot that is not a JSON array is refused rather than overwritten.
    async fn raw_entries(&self) -> Result<Vec<Value>, RepositoryError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Value>(&raw)? {
            Value::Array(entries) => Ok(entries),
            _ => {
                warn!(key = %self.key, "Listing slot is not an array, refusing to rewrite it");
                Err(RepositoryError::Serialization(format!(
                    "slot '{}' does not hold a listing array",
                    self.key
                )))
            }
        }
    }
}

#[async_trait]
impl LocalListingStore for KeyValueListingStore {
    async fn append(&self, record: LocalListingRecord) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;

        // Entries this build cannot decode are written back untouched
        let mut entries = self.raw_entries().await?;
        entries.push(serde_json::to_value(&record)?);
        let serialized = serde_json::to_string(&entries)?;
        self.store.set(&self.key, &serialized).await?;

        debug!(listing_id = %record.id, total = entries.len(), "Appended local listing");
        Ok(())
    }

    async fn all(&self) -> Result<Vec<LocalListingRecord>, RepositoryError> {
        match self.store.get(&self.key).await? {
            Some(raw) => Ok(decode_listings(&raw)),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryListingStore {
    records: Arc<RwLock<Vec<LocalListingRecord>>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalListingStore for InMemoryListingStore {
    async fn append(&self, record: LocalListingRecord) -> Result<(), RepositoryError> {
        self.records.write().push(record);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<LocalListingRecord>, RepositoryError> {
        Ok(self.records.read().clone())
    }
}
