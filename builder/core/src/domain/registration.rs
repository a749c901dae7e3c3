// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Registration Attempt (Builder Context)
//!
//! State machine for the single "register agent" use case:
//!
//! ```text
//!            begin()                succeed()
//!   Idle ─────────────▶ InFlight ─────────────▶ Succeeded
//!    ▲                    │  │                       │
//!    │      abort()       │  │      fail()           │
//!    └────────────────────┘  └──────────▶ Failed     │
//!    ▲                                      │        │
//!    └──────────── dismiss() / begin() ─────┴────────┘
//! ```
//!
//! `begin()` is refused while an attempt is `InFlight`; that refusal is the
//! only concurrency control the builder has. A terminal state is left again
//! either by an explicit `dismiss()` or by starting the next attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::domain::registry_api::RemoteError;
use crate::domain::repository::RepositoryError;
use crate::domain::signer::{Signature, SignerIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub Uuid);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two registration call shapes an attempt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKind {
    /// Create on the backend, then register by id. No signer involved.
    Simple,
    /// Attestation payload sent to the relay, signed when possible.
    Signed,
}

/// Parsed body returned by a registration endpoint.
///
/// Fields are passed through unmodified; the accessors only read the
/// identifiers the builder cares about.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationResult(pub Map<String, Value>);

impl RegistrationResult {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap an arbitrary JSON value. Non-object bodies are kept under `raw`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                let mut map = Map::new();
                map.insert("raw".to_string(), other);
                Self(map)
            }
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string (or number rendered as string) under `key`.
    fn identifier(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Address of the agent's on-chain contract as reported by the relay.
    pub fn contract_address(&self) -> Option<String> {
        self.identifier("contractAddress")
    }

    pub fn token_id(&self) -> Option<String> {
        self.identifier("tokenId")
    }

    pub fn agent_id(&self) -> Option<String> {
        self.identifier("agent_id")
    }

    pub fn tx_hash(&self) -> Option<String> {
        self.identifier("tx_hash")
    }

    /// Identifier used as the local listing id, if the service returned one.
    ///
    /// Only the camelCase `contractAddress` counts as an on-chain identity:
    /// the backend's snake_case `contract_address` names the shared registry
    /// contract and would collide across agents.
    pub fn listing_id(&self) -> Option<String> {
        self.contract_address()
            .or_else(|| self.agent_id())
            .or_else(|| self.token_id())
    }

    /// Listing id for a result produced by the given flow.
    ///
    /// The relay behind the signed flow deploys one contract per agent and
    /// may spell its address `contract_address` or `address`.
    pub fn listing_id_for(&self, kind: RegistrationKind) -> Option<String> {
        match kind {
            RegistrationKind::Simple => self.listing_id(),
            RegistrationKind::Signed => self
                .contract_address()
                .or_else(|| self.identifier("contract_address"))
                .or_else(|| self.identifier("address"))
                .or_else(|| self.agent_id())
                .or_else(|| self.token_id()),
        }
    }

    /// Explorer link for the registration transaction.
    pub fn explorer_url(&self, explorer_base: &str) -> Option<String> {
        if let Some(url) = self.identifier("explorer_url") {
            return Some(url);
        }
        self.tx_hash()
            .map(|tx| format!("{}/{}", explorer_base.trim_end_matches('/'), tx))
    }

    /// Set `agent_id`, overriding any value the service returned.
    pub fn with_agent_id(mut self, agent_id: &str) -> Self {
        self.0
            .insert("agent_id".to_string(), Value::String(agent_id.to_string()));
        self
    }
}

/// Coarse status of the current attempt, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InFlightAttempt {
    pub id: AttemptId,
    pub kind: RegistrationKind,
    pub signer: Option<SignerIdentity>,
    pub signature: Option<Signature>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SucceededAttempt {
    pub id: AttemptId,
    pub kind: RegistrationKind,
    pub signer: Option<SignerIdentity>,
    pub signature: Option<Signature>,
    pub result: RegistrationResult,
    pub listing_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedAttempt {
    pub id: AttemptId,
    pub kind: RegistrationKind,
    pub signer: Option<SignerIdentity>,
    pub signature: Option<Signature>,
    pub reason: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Registration state machine. See the module docs for transitions.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RegistrationState {
    #[default]
    Idle,
    InFlight(InFlightAttempt),
    Succeeded(SucceededAttempt),
    Failed(FailedAttempt),
}

/// Flat view of the latest attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationAttempt {
    pub id: Option<AttemptId>,
    pub kind: Option<RegistrationKind>,
    pub status: RegistrationStatus,
    pub signer: Option<SignerIdentity>,
    pub signature: Option<Signature>,
    pub result: Option<RegistrationResult>,
    pub listing_id: Option<String>,
    pub failure: Option<String>,
}

impl RegistrationState {
    pub fn status(&self) -> RegistrationStatus {
        match self {
            RegistrationState::Idle => RegistrationStatus::Idle,
            RegistrationState::InFlight(_) => RegistrationStatus::InFlight,
            RegistrationState::Succeeded(_) => RegistrationStatus::Succeeded,
            RegistrationState::Failed(_) => RegistrationStatus::Failed,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, RegistrationState::InFlight(_))
    }

    /// Start a new attempt. Refused while another attempt is in flight.
    pub fn begin(&mut self, kind: RegistrationKind) -> Result<AttemptId, RegistrationError> {
        if self.is_in_flight() {
            return Err(RegistrationError::AlreadyInFlight);
        }
        let id = AttemptId::new();
        *self = RegistrationState::InFlight(InFlightAttempt {
            id,
            kind,
            signer: None,
            signature: None,
            started_at: Utc::now(),
        });
        Ok(id)
    }

    fn in_flight_mut(&mut self, id: AttemptId) -> Option<&mut InFlightAttempt> {
        match self {
            RegistrationState::InFlight(attempt) if attempt.id == id => Some(attempt),
            _ => None,
        }
    }

    pub fn record_signer(&mut self, id: AttemptId, signer: SignerIdentity) {
        if let Some(attempt) = self.in_flight_mut(id) {
            attempt.signer = Some(signer);
        }
    }

    pub fn record_signature(&mut self, id: AttemptId, signature: Signature) {
        if let Some(attempt) = self.in_flight_mut(id) {
            attempt.signature = Some(signature);
        }
    }

    /// `InFlight(id)` → `Succeeded`. Ignored for any other state.
    pub fn succeed(&mut self, id: AttemptId, result: RegistrationResult, listing_id: String) -> bool {
        let Some(attempt) = self.in_flight_mut(id).cloned() else {
            return false;
        };
        *self = RegistrationState::Succeeded(SucceededAttempt {
            id: attempt.id,
            kind: attempt.kind,
            signer: attempt.signer,
            signature: attempt.signature,
            result,
            listing_id,
            started_at: attempt.started_at,
            ended_at: Utc::now(),
        });
        true
    }

    /// `InFlight(id)` → `Failed`. Ignored for any other state.
    pub fn fail(&mut self, id: AttemptId, reason: impl Into<String>) -> bool {
        let Some(attempt) = self.in_flight_mut(id).cloned() else {
            return false;
        };
        *self = RegistrationState::Failed(FailedAttempt {
            id: attempt.id,
            kind: attempt.kind,
            signer: attempt.signer,
            signature: attempt.signature,
            reason: reason.into(),
            started_at: attempt.started_at,
            ended_at: Utc::now(),
        });
        true
    }

    /// `InFlight(id)` → `Idle`, for attempts refused before any remote call.
    pub fn abort(&mut self, id: AttemptId) -> bool {
        if self.in_flight_mut(id).is_none() {
            return false;
        }
        *self = RegistrationState::Idle;
        true
    }

    /// Terminal state → `Idle`. Does nothing while in flight.
    pub fn dismiss(&mut self) -> bool {
        match self {
            RegistrationState::Succeeded(_) | RegistrationState::Failed(_) => {
                *self = RegistrationState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> RegistrationAttempt {
        match self {
            RegistrationState::Idle => RegistrationAttempt {
                id: None,
                kind: None,
                status: RegistrationStatus::Idle,
                signer: None,
                signature: None,
                result: None,
                listing_id: None,
                failure: None,
            },
            RegistrationState::InFlight(a) => RegistrationAttempt {
                id: Some(a.id),
                kind: Some(a.kind),
                status: RegistrationStatus::InFlight,
                signer: a.signer.clone(),
                signature: a.signature.clone(),
                result: None,
                listing_id: None,
                failure: None,
            },
            RegistrationState::Succeeded(a) => RegistrationAttempt {
                id: Some(a.id),
                kind: Some(a.kind),
                status: RegistrationStatus::Succeeded,
                signer: a.signer.clone(),
                signature: a.signature.clone(),
                result: Some(a.result.clone()),
                listing_id: Some(a.listing_id.clone()),
                failure: None,
            },
            RegistrationState::Failed(a) => RegistrationAttempt {
                id: Some(a.id),
                kind: Some(a.kind),
                status: RegistrationStatus::Failed,
                signer: a.signer.clone(),
                signature: a.signature.clone(),
                result: None,
                listing_id: None,
                failure: Some(a.reason.clone()),
            },
        }
    }
}

/// Why a registration attempt did not succeed.
///
/// The `Display` text is meant for the user; callers decide how to show it.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("A registration is already in progress")]
    AlreadyInFlight,

    #[error("Connect your wallet before registering")]
    SignerRequired,

    #[error("Failed to register agent: {0}")]
    Remote(#[from] RemoteError),

    #[error("Agent was registered but the local listing could not be saved: {source}")]
    Persistence {
        result: RegistrationResult,
        #[source]
        source: RepositoryError,
    },

    #[error("Registration was interrupted before it completed")]
    Interrupted,
}

impl RegistrationError {
    /// Message suitable for a notification.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether the attempt reached the remote registration service.
    pub fn contacted_remote(&self) -> bool {
        matches!(
            self,
            RegistrationError::Remote(_) | RegistrationError::Persistence { .. }
        )
    }
}
