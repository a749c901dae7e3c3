// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! Section editors for agent policies and RAG sources.
//!
//! Reads tolerate a missing or unreadable slot and return an empty list.
//! Writes refuse a slot that does not hold a JSON array.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::agent_settings::{
    agent_slot_key, AgentPolicy, AgentSettings, AgentSettingsError, RagSource, POLICIES_SLOT,
    RAG_SLOT,
};
use crate::domain::repository::{KeyValueStore, RepositoryError};

pub struct AgentSettingsService {
    store: Arc<dyn KeyValueStore>,
}

impl AgentSettingsService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, agent_name: &str) -> Result<AgentSettings, AgentSettingsError> {
        Ok(AgentSettings {
            policies: self.policies(agent_name).await?,
            rag_sources: self.rag_sources(agent_name).await?,
        })
    }

    pub async fn policies(&self, agent_name: &str) -> Result<Vec<AgentPolicy>, AgentSettingsError> {
        self.read_list(&agent_slot_key(agent_name, POLICIES_SLOT)).await
    }

    /// Add a policy. Both `name` and `rule` must be non-blank.
    pub async fn add_policy(
        &self,
        agent_name: &str,
        name: &str,
        rule: &str,
    ) -> Result<AgentPolicy, AgentSettingsError> {
        let name = name.trim();
        let rule = rule.trim();
        if name.is_empty() {
            return Err(AgentSettingsError::MissingField("Policy name"));
        }
        if rule.is_empty() {
            return Err(AgentSettingsError::MissingField("Rule expression"));
        }

        let key = agent_slot_key(agent_name, POLICIES_SLOT);
        let mut policies: Vec<AgentPolicy> = self.writable_list(&key).await?;

        // Ids are creation millis, bumped past any existing id
        let mut id = Utc::now().timestamp_millis();
        while policies.iter().any(|p| p.id == id.to_string()) {
            id += 1;
        }
        let policy = AgentPolicy {
            id: id.to_string(),
            name: name.to_string(),
            rule: rule.to_string(),
        };
        policies.push(policy.clone());
        self.write_list(&key, &policies).await?;

        info!(agent = agent_name, policy = %policy.name, "Policy added");
        Ok(policy)
    }

    /// Remove the policy with `id`. Returns whether one was removed.
    pub async fn remove_policy(&self, agent_name: &str, id: &str) -> Result<bool, AgentSettingsError> {
        let key = agent_slot_key(agent_name, POLICIES_SLOT);
        let mut policies: Vec<AgentPolicy> = self.writable_list(&key).await?;
        let before = policies.len();
        policies.retain(|p| p.id != id);
        if policies.len() == before {
            return Ok(false);
        }
        self.write_list(&key, &policies).await?;
        Ok(true)
    }

    pub async fn rag_sources(&self, agent_name: &str) -> Result<Vec<RagSource>, AgentSettingsError> {
        self.read_list(&agent_slot_key(agent_name, RAG_SLOT)).await
    }

    pub async fn add_rag_source(
        &self,
        agent_name: &str,
        name: &str,
        content: &[u8],
    ) -> Result<RagSource, AgentSettingsError> {
        if name.trim().is_empty() {
            return Err(AgentSettingsError::MissingField("Source name"));
        }
        let key = agent_slot_key(agent_name, RAG_SLOT);
        let mut sources: Vec<RagSource> = self.writable_list(&key).await?;
        let source = RagSource::from_content(name.trim(), content);
        sources.push(source.clone());
        self.write_list(&key, &sources).await?;

        info!(agent = agent_name, source = %source.name, hash = %source.hash, "RAG source added");
        Ok(source)
    }

    /// Hash a local file and add it under its file name.
    pub async fn add_rag_file(&self, agent_name: &str, path: &Path) -> Result<RagSource, AgentSettingsError> {
        let content = tokio::fs::read(path).await.map_err(RepositoryError::from)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.add_rag_source(agent_name, &name, &content).await
    }

    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, AgentSettingsError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(key, "Unreadable settings slot, showing it as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn writable_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, AgentSettingsError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Vec::new());
        };
        let value: Value = serde_json::from_str(&raw).map_err(RepositoryError::from)?;
        if !value.is_array() {
            return Err(RepositoryError::Serialization(format!(
                "slot '{}' does not hold a list",
                key
            ))
            .into());
        }
        serde_json::from_value(value)
            .map_err(|e| AgentSettingsError::from(RepositoryError::from(e)))
    }

    async fn write_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), AgentSettingsError> {
        let serialized = serde_json::to_string(items).map_err(RepositoryError::from)?;
        self.store.set(key, &serialized).await?;
        debug!(key, count = items.len(), "Wrote settings slot");
        Ok(())
    }
}
