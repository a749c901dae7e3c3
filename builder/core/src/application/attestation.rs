// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Attestation
//!
//! Standalone "sign this agent" action. The connected wallet signs
//!
//! ```text
//! {"action":"attest-agent","agentId":"<id>","ts":<unix millis>}
//! ```
//!
//! and the signature is kept locally in a JSON object keyed by agent id,
//! stored in the signatures slot:
//!
//! ```text
//! { "<agentId>": { "signature": "0x…", "ts": 1700000000000, "signer": "0x…" } }
//! ```
//!
//! A later attestation of the same agent replaces the earlier one.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::events::AttestationEvent;
use crate::domain::registry_api::ATTEST_AGENT_ACTION;
use crate::domain::repository::{KeyValueStore, RepositoryError, SIGNATURES_KEY};
use crate::domain::signer::{Signature, SignerAdapter, SignerError, SignerIdentity};
use crate::infrastructure::event_bus::EventBus;

/// Stored attestation of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAttestation {
    pub signature: Signature,
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<SignerIdentity>,
}

#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("Connect your wallet before signing")]
    SignerRequired,

    #[error("Failed to sign agent: {0}")]
    Signing(#[from] SignerError),

    #[error("Failed to store attestation: {0}")]
    Storage(#[from] RepositoryError),
}

pub struct AttestationService {
    signer: Arc<dyn SignerAdapter>,
    store: Arc<dyn KeyValueStore>,
    key: String,
    event_bus: EventBus,
}

impl AttestationService {
    pub fn new(signer: Arc<dyn SignerAdapter>, store: Arc<dyn KeyValueStore>, event_bus: EventBus) -> Self {
        Self {
            signer,
            store,
            key: SIGNATURES_KEY.to_string(),
            event_bus,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Canonical message signed for `agent_id` at `ts`.
    pub fn attestation_message(agent_id: &str, ts: i64) -> String {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct AttestMessage<'a> {
            action: &'a str,
            agent_id: &'a str,
            ts: i64,
        }

        // Serializing a struct of strings and an integer cannot fail
        serde_json::to_string(&AttestMessage {
            action: ATTEST_AGENT_ACTION,
            agent_id,
            ts,
        })
        .unwrap_or_default()
    }

    pub async fn attest(&self, agent_id: &str) -> Result<AgentAttestation, AttestationError> {
        if self.signer.current_signer().is_none() {
            if let Err(e) = self.signer.connect().await {
                warn!("Wallet connection failed: {}", e);
            }
        }
        let signer = self
            .signer
            .current_signer()
            .ok_or(AttestationError::SignerRequired)?;

        let ts = Utc::now().timestamp_millis();
        let message = Self::attestation_message(agent_id, ts);
        let signature = self.signer.sign(&signer, &message).await?;

        let attestation = AgentAttestation {
            signature,
            ts,
            signer: Some(signer.clone()),
        };

        let mut all = self.load().await?;
        all.insert(agent_id.to_string(), serde_json::to_value(&attestation).map_err(RepositoryError::from)?);
        let serialized = serde_json::to_string(&Value::Object(all)).map_err(RepositoryError::from)?;
        self.store.set(&self.key, &serialized).await?;

        info!(agent_id, signer = %signer.short(), "Agent attested");
        self.event_bus
            .publish_attestation_event(AttestationEvent::AgentAttested {
                agent_id: agent_id.to_string(),
                signer,
                attested_at: Utc::now(),
            });

        Ok(attestation)
    }

    /// Stored attestation for `agent_id`, if any. An unreadable slot reads as empty.
    pub async fn signature_for(&self, agent_id: &str) -> Result<Option<AgentAttestation>, AttestationError> {
        let all = match self.load().await {
            Ok(all) => all,
            Err(AttestationError::Storage(RepositoryError::Serialization(e))) => {
                warn!(key = %self.key, "Signature slot is unreadable: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        Ok(all
            .get(agent_id)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok()))
    }

    /// Every stored attestation, keyed by agent id. Fails on a slot that is
    /// not a JSON object so a write never replaces it.
    async fn load(&self) -> Result<Map<String, Value>, AttestationError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Map::new());
        };
        match serde_json::from_str::<Value>(&raw).map_err(RepositoryError::from)? {
            Value::Object(map) => Ok(map),
            _ => Err(RepositoryError::Serialization(format!(
                "slot '{}' does not hold a signature map",
                self.key
            ))
            .into()),
        }
    }
}
