// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Registration Coordinator
//!
//! Drives the "register agent" use case, at most one attempt at a time.
//!
//! ## Signed flow
//!
//! ```text
//! register_signed(draft)
//!   1. begin()                      Idle/terminal → InFlight (refused if InFlight)
//!   2. signer.connect()             only if no identity yet; failure is logged
//!   3. signer.current_signer()      still none → abort to Idle, SignerRequired
//!   4. payload { agentData, action, timestamp }
//!   5. signer.sign(message)         failure is logged, payload goes unsigned
//!   6. api.register_signed(payload)
//!   7. listings.append(record)      id from result, else local-<millis>
//!   8. succeed()                    InFlight → Succeeded
//! ```
//!
//! ## Simple flow
//!
//! `api.create_agent(draft)` then `api.register_agent(agent_id)`; the signer is
//! never consulted. Steps 7 and 8 are shared.
//!
//! Any remote error ends the attempt `Failed` without writing a listing. The
//! coordinator never notifies the user itself; the returned
//! [`RegistrationError`] carries the message and the caller decides how to
//! show it. Lifecycle events go to the [`EventBus`] for progress indicators.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::draft::AgentDraft;
use crate::domain::events::RegistrationEvent;
use crate::domain::listing::LocalListingRecord;
use crate::domain::registration::{
    AttemptId, RegistrationAttempt, RegistrationError, RegistrationKind, RegistrationResult,
    RegistrationState, RegistrationStatus,
};
use crate::domain::registry_api::{AgentRegistryApi, CreateAgentRequest, SignedRegistrationPayload};
use crate::domain::repository::LocalListingStore;
use crate::domain::signer::{Signature, SignerAdapter, SignerIdentity};
use crate::infrastructure::event_bus::EventBus;

/// What a successful attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationOutcome {
    pub attempt_id: AttemptId,
    pub kind: RegistrationKind,
    pub result: RegistrationResult,
    pub listing: LocalListingRecord,
    pub signer: Option<SignerIdentity>,
    pub signature: Option<Signature>,
}

impl RegistrationOutcome {
    pub fn listing_id(&self) -> &str {
        &self.listing.id
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

pub struct RegistrationCoordinator {
    api: Arc<dyn AgentRegistryApi>,
    signer: Option<Arc<dyn SignerAdapter>>,
    listings: Arc<dyn LocalListingStore>,
    event_bus: EventBus,
    state: Mutex<RegistrationState>,
}

impl RegistrationCoordinator {
    pub fn new(
        api: Arc<dyn AgentRegistryApi>,
        listings: Arc<dyn LocalListingStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            api,
            signer: None,
            listings,
            event_bus,
            state: Mutex::new(RegistrationState::Idle),
        }
    }

    /// Attach the wallet used by [`Self::register_signed`].
    pub fn with_signer(mut self, signer: Arc<dyn SignerAdapter>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn status(&self) -> RegistrationStatus {
        self.state.lock().status()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().is_in_flight()
    }

    /// Snapshot of the latest attempt.
    pub fn attempt(&self) -> RegistrationAttempt {
        self.state.lock().snapshot()
    }

    /// Clear a finished attempt back to `Idle`.
    pub fn dismiss(&self) -> bool {
        self.state.lock().dismiss()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    fn begin(&self, kind: RegistrationKind, draft: &AgentDraft) -> Result<InFlightGuard<'_>, RegistrationError> {
        let id = self.state.lock().begin(kind).inspect_err(|_| {
            warn!("Registration refused: another attempt is in flight");
        })?;

        info!(attempt_id = %id, ?kind, agent = %draft.name, "Registration started");
        self.event_bus.publish_registration_event(RegistrationEvent::Started {
            attempt_id: id,
            kind,
            agent_name: draft.name.clone(),
            started_at: Utc::now(),
        });

        Ok(InFlightGuard {
            coordinator: self,
            id,
            settled: false,
        })
    }

    /// Create the agent on the backend, then register it by id.
    pub async fn register_simple(&self, draft: &AgentDraft) -> Result<RegistrationOutcome, RegistrationError> {
        let mut guard = self.begin(RegistrationKind::Simple, draft)?;

        let request = CreateAgentRequest::from(draft);
        let created = match self.api.create_agent(&request).await {
            Ok(created) => created,
            Err(e) => return Err(guard.fail(e.into())),
        };
        debug!(attempt_id = %guard.id, agent_id = %created.agent_id, "Agent created");

        let result = match self.api.register_agent(&created.agent_id).await {
            Ok(result) => result.with_agent_id(&created.agent_id),
            Err(e) => return Err(guard.fail(e.into())),
        };

        self.persist(guard, RegistrationKind::Simple, draft, result, None, None)
            .await
    }

    /// Register through the relay with a wallet identity, signing the
    /// payload when the wallet allows it.
    pub async fn register_signed(&self, draft: &AgentDraft) -> Result<RegistrationOutcome, RegistrationError> {
        let mut guard = self.begin(RegistrationKind::Signed, draft)?;

        let Some(signer) = self.signer.clone() else {
            return Err(guard.abort(RegistrationError::SignerRequired));
        };

        if signer.current_signer().is_none() {
            if let Err(e) = signer.connect().await {
                warn!(attempt_id = %guard.id, "Wallet connection failed: {}", e);
                self.event_bus
                    .publish_registration_event(RegistrationEvent::SignerConnectFailed {
                        attempt_id: guard.id,
                        error: e.to_string(),
                        failed_at: Utc::now(),
                    });
            }
        }

        let Some(identity) = signer.current_signer() else {
            return Err(guard.abort(RegistrationError::SignerRequired));
        };
        guard.record_signer(identity.clone());

        let mut payload = SignedRegistrationPayload::new(draft.clone(), Utc::now().timestamp_millis());
        let signature = self.try_sign(&guard, signer.as_ref(), &identity, &payload).await;
        if let Some(signature) = &signature {
            payload.attach_signature(identity.clone(), signature.clone());
            guard.record_signature(signature.clone());
        }

        let result = match self.api.register_signed(&payload).await {
            Ok(result) => result,
            Err(e) => return Err(guard.fail(e.into())),
        };

        self.persist(
            guard,
            RegistrationKind::Signed,
            draft,
            result,
            Some(identity),
            signature,
        )
        .await
    }

    async fn try_sign(
        &self,
        guard: &InFlightGuard<'_>,
        signer: &dyn SignerAdapter,
        identity: &SignerIdentity,
        payload: &SignedRegistrationPayload,
    ) -> Option<Signature> {
        let skip = |reason: String| {
            warn!(attempt_id = %guard.id, "Signing skipped, continuing unsigned: {}", reason);
            self.event_bus
                .publish_registration_event(RegistrationEvent::SigningSkipped {
                    attempt_id: guard.id,
                    signer: identity.clone(),
                    reason,
                    skipped_at: Utc::now(),
                });
            None
        };

        if !signer.supports_signing() {
            return skip("wallet has no signing capability".to_string());
        }
        let message = match payload.attestation_message() {
            Ok(message) => message,
            Err(e) => return skip(e.to_string()),
        };
        match signer.sign(identity, &message).await {
            Ok(signature) => Some(signature),
            Err(e) => skip(e.to_string()),
        }
    }

    async fn persist(
        &self,
        mut guard: InFlightGuard<'_>,
        kind: RegistrationKind,
        draft: &AgentDraft,
        result: RegistrationResult,
        signer: Option<SignerIdentity>,
        signature: Option<Signature>,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let listing_id = result
            .listing_id_for(kind)
            .unwrap_or_else(|| LocalListingRecord::fallback_id(Utc::now()));
        let listing = LocalListingRecord::new(listing_id.clone(), draft, result.clone());

        if let Err(source) = self.listings.append(listing.clone()).await {
            error!(
                attempt_id = %guard.id,
                %listing_id,
                "Agent registered remotely but local listing was not saved: {}",
                source
            );
            return Err(guard.fail(RegistrationError::Persistence { result, source }));
        }

        guard.succeed(result.clone(), listing_id, signature.is_some());
        Ok(RegistrationOutcome {
            attempt_id: guard.id,
            kind,
            result,
            listing,
            signer,
            signature,
        })
    }
}

/// Owns the `InFlight` state of one attempt.
///
/// Every exit path settles it. Dropping it unsettled (the register future
/// was cancelled) fails the attempt so a retry is possible.
struct InFlightGuard<'a> {
    coordinator: &'a RegistrationCoordinator,
    id: AttemptId,
    settled: bool,
}

impl InFlightGuard<'_> {
    fn record_signer(&self, signer: SignerIdentity) {
        self.coordinator.state.lock().record_signer(self.id, signer);
    }

    fn record_signature(&self, signature: Signature) {
        self.coordinator.state.lock().record_signature(self.id, signature);
    }

    fn succeed(&mut self, result: RegistrationResult, listing_id: String, signed: bool) {
        self.settled = true;
        self.coordinator
            .state
            .lock()
            .succeed(self.id, result, listing_id.clone());
        info!(attempt_id = %self.id, %listing_id, signed, "Registration succeeded");
        self.coordinator
            .event_bus
            .publish_registration_event(RegistrationEvent::Succeeded {
                attempt_id: self.id,
                listing_id,
                signed,
                completed_at: Utc::now(),
            });
    }

    fn fail(&mut self, err: RegistrationError) -> RegistrationError {
        self.settled = true;
        let message = err.user_message();
        self.coordinator.state.lock().fail(self.id, message.clone());
        error!(attempt_id = %self.id, "Registration failed: {}", message);
        self.coordinator
            .event_bus
            .publish_registration_event(RegistrationEvent::Failed {
                attempt_id: self.id,
                error: message,
                failed_at: Utc::now(),
            });
        err
    }

    /// Refuse before any remote call; status goes back to `Idle`.
    fn abort(&mut self, err: RegistrationError) -> RegistrationError {
        self.settled = true;
        self.coordinator.state.lock().abort(self.id);
        warn!(attempt_id = %self.id, "Registration aborted: {}", err);
        self.coordinator
            .event_bus
            .publish_registration_event(RegistrationEvent::Aborted {
                attempt_id: self.id,
                reason: err.user_message(),
                aborted_at: Utc::now(),
            });
        err
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let reason = RegistrationError::Interrupted.user_message();
        if self.coordinator.state.lock().fail(self.id, reason.clone()) {
            warn!(attempt_id = %self.id, "Registration interrupted before completion");
            self.coordinator
                .event_bus
                .publish_registration_event(RegistrationEvent::Failed {
                    attempt_id: self.id,
                    error: reason,
                    failed_at: Utc::now(),
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registry_api::{CreateAgentResponse, RemoteError};
    use crate::domain::repository::RepositoryError;
    use crate::domain::signer::SignerError;
    use crate::infrastructure::repositories::InMemoryListingStore;
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticApi;

    #[async_trait]
    impl AgentRegistryApi for StaticApi {
        async fn create_agent(&self, _: &CreateAgentRequest) -> Result<CreateAgentResponse, RemoteError> {
            Ok(CreateAgentResponse {
                agent_id: "agent-1".to_string(),
                extra: Default::default(),
            })
        }

        async fn register_agent(&self, _: &str) -> Result<RegistrationResult, RemoteError> {
            Ok(RegistrationResult::from_value(json!({
                "tx_hash": "0xfeed",
                "contract_address": "0xREGISTRY"
            })))
        }

        async fn register_signed(
            &self,
            _: &SignedRegistrationPayload,
        ) -> Result<RegistrationResult, RemoteError> {
            Ok(RegistrationResult::from_value(json!({"note": "no identifiers"})))
        }
    }

    struct ConnectedSigner;

    #[async_trait]
    impl SignerAdapter for ConnectedSigner {
        fn current_signer(&self) -> Option<SignerIdentity> {
            Some(SignerIdentity::new("0xme"))
        }

        async fn connect(&self) -> Result<SignerIdentity, SignerError> {
            Ok(SignerIdentity::new("0xme"))
        }

        fn supports_signing(&self) -> bool {
            false
        }

        async fn sign(&self, _: &SignerIdentity, _: &str) -> Result<Signature, SignerError> {
            Err(SignerError::Unsupported)
        }
    }

    struct BrokenListings;

    #[async_trait]
    impl LocalListingStore for BrokenListings {
        async fn append(&self, _: LocalListingRecord) -> Result<(), RepositoryError> {
            Err(RepositoryError::Storage("disk full".to_string()))
        }

        async fn all(&self) -> Result<Vec<LocalListingRecord>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_simple_flow_merges_agent_id_and_ignores_registry_contract() {
        let listings = Arc::new(InMemoryListingStore::new());
        let coordinator =
            RegistrationCoordinator::new(Arc::new(StaticApi), listings.clone(), EventBus::new(16));

        let outcome = coordinator
            .register_simple(&AgentDraft::new("Oracle"))
            .await
            .unwrap();

        assert_eq!(outcome.listing_id(), "agent-1");
        assert_eq!(outcome.result.agent_id().as_deref(), Some("agent-1"));
        assert!(!outcome.is_signed());
        assert_eq!(coordinator.status(), RegistrationStatus::Succeeded);
        assert_eq!(listings.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_signed_flow_without_signer_adapter_is_refused() {
        let coordinator = RegistrationCoordinator::new(
            Arc::new(StaticApi),
            Arc::new(InMemoryListingStore::new()),
            EventBus::new(16),
        );
        let err = coordinator
            .register_signed(&AgentDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::SignerRequired));
        assert_eq!(coordinator.status(), RegistrationStatus::Idle);
    }

    #[tokio::test]
    async fn test_wallet_without_signing_falls_back_to_local_id() {
        let listings = Arc::new(InMemoryListingStore::new());
        let coordinator =
            RegistrationCoordinator::new(Arc::new(StaticApi), listings.clone(), EventBus::new(16))
                .with_signer(Arc::new(ConnectedSigner));

        let outcome = coordinator
            .register_signed(&AgentDraft::new("Oracle"))
            .await
            .unwrap();

        assert!(outcome.listing_id().starts_with("local-"));
        assert_eq!(outcome.signer, Some(SignerIdentity::new("0xme")));
        assert!(!outcome.is_signed());

        let attempt = coordinator.attempt();
        assert_eq!(attempt.signer, Some(SignerIdentity::new("0xme")));
        assert_eq!(attempt.signature, None);
    }

    #[tokio::test]
    async fn test_persistence_failure_fails_the_attempt_but_keeps_result() {
        let coordinator = RegistrationCoordinator::new(
            Arc::new(StaticApi),
            Arc::new(BrokenListings),
            EventBus::new(16),
        );
        let mut events = coordinator.event_bus().subscribe();

        let err = coordinator
            .register_simple(&AgentDraft::new("Oracle"))
            .await
            .unwrap_err();

        match &err {
            RegistrationError::Persistence { result, .. } => {
                assert_eq!(result.tx_hash().as_deref(), Some("0xfeed"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.contacted_remote());
        assert_eq!(coordinator.status(), RegistrationStatus::Failed);

        // Started, then Failed
        let mut terminal = None;
        while let Ok(event) = events.try_recv() {
            if let crate::infrastructure::event_bus::DomainEvent::Registration(e) = event {
                if e.is_terminal() {
                    terminal = Some(e);
                }
            }
        }
        assert!(matches!(terminal, Some(RegistrationEvent::Failed { .. })));

        assert!(coordinator.dismiss());
        assert_eq!(coordinator.status(), RegistrationStatus::Idle);
    }
}
