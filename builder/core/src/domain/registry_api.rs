// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Registry API Port
//!
//! Request/response contract of the remote services the coordinator calls.
//! The services themselves are opaque; only the JSON shapes are fixed here.
//!
//! | Operation | Endpoint | Body |
//! |-----------|----------|------|
//! | [`AgentRegistryApi::create_agent`] | `POST /api/agents/create` | [`CreateAgentRequest`] |
//! | [`AgentRegistryApi::register_agent`] | `POST /api/agents/{id}/register` | none |
//! | [`AgentRegistryApi::register_signed`] | `POST /api/starknet/register-agent` | [`SignedRegistrationPayload`] |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::draft::{AgentDraft, PersonalityTrait, Visibility};
use crate::domain::registration::RegistrationResult;
use crate::domain::signer::{Signature, SignerIdentity};

/// Action tag for the signed registration flow.
pub const REGISTER_AGENT_ACTION: &str = "register-agent";

/// Action tag for standalone agent attestations.
pub const ATTEST_AGENT_ACTION: &str = "attest-agent";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Transport(String),

    /// Non-2xx response. `message` is the body's `error` field when present.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Body of `POST /api/agents/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    pub description: String,
    pub personality: Vec<PersonalityTrait>,
    pub capabilities: Vec<String>,
    pub data_sources: Vec<String>,
    pub rules: serde_json::Map<String, serde_json::Value>,
    pub visibility: Visibility,
    pub pricing: Option<serde_json::Value>,
}

impl From<&AgentDraft> for CreateAgentRequest {
    fn from(draft: &AgentDraft) -> Self {
        Self {
            name: draft.name.clone(),
            description: draft.description.clone(),
            personality: draft.personality.iter().copied().collect(),
            capabilities: Vec::new(),
            data_sources: Vec::new(),
            rules: serde_json::Map::new(),
            visibility: draft.visibility,
            pricing: None,
        }
    }
}

/// Response of `POST /api/agents/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAgentResponse {
    pub agent_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /api/starknet/register-agent`.
///
/// `signer` and `signature` are present together or not at all; an unsigned
/// payload carries neither key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedRegistrationPayload {
    pub agent_data: AgentDraft,
    pub action: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<SignerIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl SignedRegistrationPayload {
    pub fn new(agent_data: AgentDraft, timestamp: i64) -> Self {
        Self {
            agent_data,
            action: REGISTER_AGENT_ACTION.to_string(),
            timestamp,
            signer: None,
            signature: None,
        }
    }

    pub fn attach_signature(&mut self, signer: SignerIdentity, signature: Signature) {
        self.signer = Some(signer);
        self.signature = Some(signature);
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Canonical message the signer is asked to sign for this payload.
    pub fn attestation_message(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RegisterMessage<'a> {
            action: &'a str,
            agent_data: &'a AgentDraft,
            ts: i64,
        }

        serde_json::to_string(&RegisterMessage {
            action: &self.action,
            agent_data: &self.agent_data,
            ts: self.timestamp,
        })
    }
}

/// Remote services behind agent registration.
#[async_trait]
pub trait AgentRegistryApi: Send + Sync {
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<CreateAgentResponse, RemoteError>;

    async fn register_agent(&self, agent_id: &str) -> Result<RegistrationResult, RemoteError>;

    async fn register_signed(
        &self,
        payload: &SignedRegistrationPayload,
    ) -> Result<RegistrationResult, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_payload_has_no_signer_keys() {
        let payload = SignedRegistrationPayload::new(AgentDraft::default(), 1_700_000_000_000);
        let json = serde_json::to_value(&payload).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["action"], "register-agent");
        assert_eq!(obj["agentData"]["name"], "My Agent");
        assert!(!obj.contains_key("signer"));
        assert!(!obj.contains_key("signature"));
    }

    #[test]
    fn test_attestation_message_is_stable() {
        let payload = SignedRegistrationPayload::new(AgentDraft::new("Oracle"), 42);
        let first = payload.attestation_message().unwrap();
        let second = payload.attestation_message().unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(r#"{"action":"register-agent","agentData":{"name":"Oracle""#));
        assert!(first.ends_with(r#""ts":42}"#));
    }

    #[test]
    fn test_create_request_from_draft() {
        let mut draft = AgentDraft::new("Crypto Trader Pro");
        draft.description = "Trades the majors".to_string();
        draft.personality.insert(PersonalityTrait::Cautious);

        let request = CreateAgentRequest::from(&draft);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["personality"][0], "Cautious");
        assert_eq!(json["visibility"], "private");
        assert!(json["pricing"].is_null());
        assert_eq!(json["rules"], serde_json::json!({}));
    }
}
