// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

//! Service wiring for CLI commands.
//!
//! Builds the adapters described by a [`BuilderConfig`]: the file-backed
//! storage slots, the listing store, the local wallet and the HTTP registry
//! client, plus the coordinator and attestation service over them.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use phantom_core::application::agent_settings::AgentSettingsService;
use phantom_core::application::attestation::AttestationService;
use phantom_core::application::registration::RegistrationCoordinator;
use phantom_core::domain::builder_config::BuilderConfig;
use phantom_core::domain::repository::KeyValueStore;
use phantom_core::infrastructure::event_bus::EventBus;
use phantom_core::infrastructure::registry_client::HttpRegistryClient;
use phantom_core::infrastructure::repositories::{FileKeyValueStore, KeyValueListingStore};
use phantom_core::infrastructure::signer::LocalWalletSigner;

pub struct BuilderServices {
    pub config: BuilderConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub listings: Arc<KeyValueListingStore>,
    pub wallet: Arc<LocalWalletSigner>,
    pub event_bus: EventBus,
}

impl BuilderServices {
    /// Load configuration (explicit path, discovery or defaults) and wire
    /// the local adapters.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config =
            BuilderConfig::load_or_default(config_path).context("Failed to load configuration")?;
        config
            .validate()
            .context("Configuration validation failed")?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: BuilderConfig) -> Self {
        let storage = &config.spec.storage;
        let path = storage.resolved_path();
        debug!(path = %path.display(), "Using local storage");

        let store: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(path));
        let listings = Arc::new(KeyValueListingStore::with_key(
            store.clone(),
            storage.listings_key.clone(),
        ));
        let wallet = Arc::new(LocalWalletSigner::with_slot(
            store.clone(),
            storage.wallet_key.clone(),
        ));

        Self {
            config,
            store,
            listings,
            wallet,
            event_bus: EventBus::default(),
        }
    }

    pub fn registry_client(&self) -> Result<HttpRegistryClient> {
        HttpRegistryClient::from_config(&self.config.spec.api)
            .context("Failed to create registry client")
    }

    pub fn coordinator(&self) -> Result<RegistrationCoordinator> {
        let api = Arc::new(self.registry_client()?);
        Ok(
            RegistrationCoordinator::new(api, self.listings.clone(), self.event_bus.clone())
                .with_signer(self.wallet.clone()),
        )
    }

    pub fn attestation_service(&self) -> AttestationService {
        AttestationService::new(self.wallet.clone(), self.store.clone(), self.event_bus.clone())
            .with_key(self.config.spec.storage.signatures_key.clone())
    }

    pub fn agent_settings(&self) -> AgentSettingsService {
        AgentSettingsService::new(self.store.clone())
    }

    pub fn explorer_base(&self) -> &str {
        &self.config.spec.explorer.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phantom_core::domain::repository::LocalListingStore;

    #[tokio::test]
    async fn test_services_share_one_storage_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuilderConfig::default();
        config.spec.storage.path = dir.path().to_path_buf();
        config.spec.storage.listings_key = "test.listings".to_string();

        let services = BuilderServices::from_config(config);
        assert!(services.listings.all().await.unwrap().is_empty());

        services.store.set("test.listings", "[]").await.unwrap();
        services
            .agent_settings()
            .add_policy("Oracle", "read only", "allow:read")
            .await
            .unwrap();
        assert!(dir.path().join("phantom.agent.Oracle.policies.json").exists());
        assert!(dir.path().join("test.listings.json").exists());
        assert!(services.registry_client().is_ok());
    }
}
