// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::registration::{AttemptId, RegistrationKind};
use crate::domain::signer::SignerIdentity;

/// Registration lifecycle events
///
/// Published by the registration coordinator so a presentation layer can show
/// the in-flight indicator and success/failure notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistrationEvent {
    Started {
        attempt_id: AttemptId,
        kind: RegistrationKind,
        agent_name: String,
        started_at: DateTime<Utc>,
    },
    SignerConnectFailed {
        attempt_id: AttemptId,
        error: String,
        failed_at: DateTime<Utc>,
    },
    SigningSkipped {
        attempt_id: AttemptId,
        signer: SignerIdentity,
        reason: String,
        skipped_at: DateTime<Utc>,
    },
    Succeeded {
        attempt_id: AttemptId,
        listing_id: String,
        signed: bool,
        completed_at: DateTime<Utc>,
    },
    Failed {
        attempt_id: AttemptId,
        error: String,
        failed_at: DateTime<Utc>,
    },
    /// Refused before contacting the remote service.
    Aborted {
        attempt_id: AttemptId,
        reason: String,
        aborted_at: DateTime<Utc>,
    },
}

impl RegistrationEvent {
    pub fn attempt_id(&self) -> AttemptId {
        match self {
            RegistrationEvent::Started { attempt_id, .. }
            | RegistrationEvent::SignerConnectFailed { attempt_id, .. }
            | RegistrationEvent::SigningSkipped { attempt_id, .. }
            | RegistrationEvent::Succeeded { attempt_id, .. }
            | RegistrationEvent::Failed { attempt_id, .. }
            | RegistrationEvent::Aborted { attempt_id, .. } => *attempt_id,
        }
    }

    /// Whether this event ends an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RegistrationEvent::Succeeded { .. }
                | RegistrationEvent::Failed { .. }
                | RegistrationEvent::Aborted { .. }
        )
    }
}

/// Attestation events (standalone "sign this agent" action)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AttestationEvent {
    AgentAttested {
        agent_id: String,
        signer: SignerIdentity,
        attested_at: DateTime<Utc>,
    },
}
