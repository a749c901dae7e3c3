// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts used by the builder, defined here and implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Holds | Implementations |
//! |-------|-------|----------------|
//! | `KeyValueStore` | Named string slots (browser-local storage) | `FileKeyValueStore`, `InMemoryKeyValueStore` |
//! | `LocalListingStore` | `LocalListingRecord` collection | `KeyValueListingStore`, `InMemoryListingStore` |
//!
//! The listing collection is append-only from the builder's point of view.
//! Writers do not coordinate: each append rewrites the whole collection, so
//! two concurrent sessions resolve as last-writer-wins.

use async_trait::async_trait;

use crate::domain::listing::LocalListingRecord;

/// Default slot holding the JSON array of listing records.
pub const LISTINGS_KEY: &str = "phantom.seller.listings";

/// Default slot holding agent attestation signatures.
pub const SIGNATURES_KEY: &str = "phantom.agent.signatures";

/// Default slot holding the local wallet key.
pub const WALLET_KEY: &str = "phantom.wallet.key";

/// Durable string slots keyed by a namespace string.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError>;

    async fn remove(&self, key: &str) -> Result<(), RepositoryError>;
}

/// Append-only collection of locally registered listings.
#[async_trait]
pub trait LocalListingStore: Send + Sync {
    /// Append a record to the collection
    async fn append(&self, record: LocalListingRecord) -> Result<(), RepositoryError>;

    /// All records in insertion order
    async fn all(&self) -> Result<Vec<LocalListingRecord>, RepositoryError>;

    /// First record with this id
    async fn find_by_id(&self, id: &str) -> Result<Option<LocalListingRecord>, RepositoryError> {
        Ok(self.all().await?.into_iter().find(|r| r.id == id))
    }

    /// First record whose draft name matches
    async fn find_by_name(&self, name: &str) -> Result<Option<LocalListingRecord>, RepositoryError> {
        Ok(self.all().await?.into_iter().find(|r| r.agent_data.name == name))
    }
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
