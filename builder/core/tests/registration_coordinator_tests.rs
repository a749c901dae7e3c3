// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

use phantom_core::application::registration::RegistrationCoordinator;
use phantom_core::domain::draft::AgentDraft;
use phantom_core::domain::events::RegistrationEvent;
use phantom_core::domain::registration::{RegistrationError, RegistrationResult, RegistrationStatus};
use phantom_core::domain::registry_api::{
    AgentRegistryApi, CreateAgentRequest, CreateAgentResponse, RemoteError,
    SignedRegistrationPayload,
};
use phantom_core::domain::repository::{KeyValueStore, LocalListingStore, LISTINGS_KEY};
use phantom_core::domain::signer::{Signature, SignerAdapter, SignerError, SignerIdentity};
use phantom_core::infrastructure::event_bus::{DomainEvent, EventBus, EventReceiver};
use phantom_core::infrastructure::repositories::{
    InMemoryKeyValueStore, InMemoryListingStore, KeyValueListingStore,
};

// ============================================================================
// Fakes
// ============================================================================

/// Registry fake that counts calls, keeps the last signed payload and can
/// hold calls open until released.
struct RecordingApi {
    response: Result<Value, RemoteError>,
    signed_calls: AtomicUsize,
    create_calls: AtomicUsize,
    register_calls: AtomicUsize,
    last_payload: Mutex<Option<Value>>,
    entered: Notify,
    gate: Option<Notify>,
}

impl RecordingApi {
    fn responding(response: Value) -> Self {
        Self::with_result(Ok(response))
    }

    fn with_result(response: Result<Value, RemoteError>) -> Self {
        Self {
            response,
            signed_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
            entered: Notify::new(),
            gate: None,
        }
    }

    fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    fn remote_calls(&self) -> usize {
        self.signed_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
            + self.register_calls.load(Ordering::SeqCst)
    }

    async fn hold(&self) {
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl AgentRegistryApi for RecordingApi {
    async fn create_agent(&self, _: &CreateAgentRequest) -> Result<CreateAgentResponse, RemoteError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.hold().await;
        Ok(CreateAgentResponse {
            agent_id: "agent-42".to_string(),
            extra: Default::default(),
        })
    }

    async fn register_agent(&self, _: &str) -> Result<RegistrationResult, RemoteError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map(RegistrationResult::from_value)
    }

    async fn register_signed(
        &self,
        payload: &SignedRegistrationPayload,
    ) -> Result<RegistrationResult, RemoteError> {
        self.signed_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_payload.lock() = Some(serde_json::to_value(payload).unwrap());
        self.hold().await;
        self.response.clone().map(RegistrationResult::from_value)
    }
}

/// Wallet fake with scripted connect and sign behaviour.
struct FakeSigner {
    connected: Mutex<Option<SignerIdentity>>,
    connect_to: Option<SignerIdentity>,
    sign_fails: bool,
    connect_calls: AtomicUsize,
    sign_calls: AtomicUsize,
}

impl FakeSigner {
    fn connected(address: &str) -> Self {
        Self {
            connected: Mutex::new(Some(SignerIdentity::new(address))),
            connect_to: None,
            sign_fails: false,
            connect_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
        }
    }

    fn disconnected(connect_to: Option<&str>) -> Self {
        Self {
            connected: Mutex::new(None),
            connect_to: connect_to.map(SignerIdentity::new),
            sign_fails: false,
            connect_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
        }
    }

    fn failing_to_sign(mut self) -> Self {
        self.sign_fails = true;
        self
    }
}

#[async_trait]
impl SignerAdapter for FakeSigner {
    fn current_signer(&self) -> Option<SignerIdentity> {
        self.connected.lock().clone()
    }

    async fn connect(&self) -> Result<SignerIdentity, SignerError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        match &self.connect_to {
            Some(identity) => {
                *self.connected.lock() = Some(identity.clone());
                Ok(identity.clone())
            }
            None => Err(SignerError::ConnectionFailed("user closed the wallet popup".to_string())),
        }
    }

    async fn sign(&self, signer: &SignerIdentity, _message: &str) -> Result<Signature, SignerError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.sign_fails {
            return Err(SignerError::Rejected("user rejected".to_string()));
        }
        Ok(Signature(format!("sig-by-{}", signer)))
    }
}

struct Harness {
    api: Arc<RecordingApi>,
    signer: Arc<FakeSigner>,
    listings: Arc<InMemoryListingStore>,
    coordinator: Arc<RegistrationCoordinator>,
}

fn harness(api: RecordingApi, signer: FakeSigner) -> Harness {
    let api = Arc::new(api);
    let signer = Arc::new(signer);
    let listings = Arc::new(InMemoryListingStore::new());
    let coordinator = RegistrationCoordinator::new(api.clone(), listings.clone(), EventBus::new(64))
        .with_signer(signer.clone());
    Harness {
        api,
        signer,
        listings,
        coordinator: Arc::new(coordinator),
    }
}

fn draft() -> AgentDraft {
    let mut draft = AgentDraft::new("Crypto Trader Pro");
    draft.description = "Momentum trading on majors".to_string();
    draft
}

fn drain(receiver: &mut EventReceiver) -> Vec<RegistrationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let DomainEvent::Registration(e) = event {
            events.push(e);
        }
    }
    events
}

// ============================================================================
// Signed variant
// ============================================================================

#[tokio::test]
async fn test_no_signer_after_failed_connect_aborts_without_remote_call() {
    let h = harness(
        RecordingApi::responding(json!({"contractAddress": "0xABC"})),
        FakeSigner::disconnected(None),
    );
    let mut events = h.coordinator.event_bus().subscribe();

    let err = h.coordinator.register_signed(&draft()).await.unwrap_err();

    assert!(matches!(err, RegistrationError::SignerRequired));
    assert_eq!(err.user_message(), "Connect your wallet before registering");
    assert_eq!(h.signer.connect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.api.remote_calls(), 0);
    assert_eq!(h.coordinator.status(), RegistrationStatus::Idle);
    assert!(h.listings.all().await.unwrap().is_empty());

    let events = drain(&mut events);
    assert!(matches!(events.first(), Some(RegistrationEvent::Started { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, RegistrationEvent::SignerConnectFailed { .. })));
    assert!(matches!(events.last(), Some(RegistrationEvent::Aborted { .. })));
}

#[tokio::test]
async fn test_signing_failure_still_registers_unsigned() {
    let h = harness(
        RecordingApi::responding(json!({"contractAddress": "0xABC", "tokenId": "7"})),
        FakeSigner::connected("0xme").failing_to_sign(),
    );

    let outcome = assert_ok!(h.coordinator.register_signed(&draft()).await);

    assert_eq!(h.signer.sign_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.api.signed_calls.load(Ordering::SeqCst), 1);

    let payload = h.api.last_payload.lock().clone().unwrap();
    let payload = payload.as_object().unwrap();
    assert!(!payload.contains_key("signer"));
    assert!(!payload.contains_key("signature"));
    assert_eq!(payload["agentData"]["name"], "Crypto Trader Pro");
    assert_eq!(payload["action"], "register-agent");

    assert_eq!(outcome.listing_id(), "0xABC");
    assert!(!outcome.is_signed());

    let records = h.listings.all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "0xABC");
    assert_eq!(records[0].on_chain.contract_address().as_deref(), Some("0xABC"));
    assert_eq!(records[0].agent_data, draft());

    let attempt = h.coordinator.attempt();
    assert_eq!(attempt.status, RegistrationStatus::Succeeded);
    assert_eq!(attempt.signature, None);
    assert_eq!(attempt.listing_id.as_deref(), Some("0xABC"));
}

#[tokio::test]
async fn test_connect_then_sign_attaches_signature() {
    let h = harness(
        RecordingApi::responding(json!({"tokenId": 12})),
        FakeSigner::disconnected(Some("0xfresh")),
    );

    let outcome = h.coordinator.register_signed(&draft()).await.unwrap();

    let payload = h.api.last_payload.lock().clone().unwrap();
    assert_eq!(payload["signer"], "0xfresh");
    assert_eq!(payload["signature"], "sig-by-0xfresh");
    assert!(outcome.is_signed());
    assert_eq!(outcome.listing_id(), "12");
    assert_eq!(
        h.coordinator.attempt().signer,
        Some(SignerIdentity::new("0xfresh"))
    );
}

#[tokio::test]
async fn test_remote_failure_fails_attempt_and_writes_nothing() {
    let h = harness(
        RecordingApi::with_result(Err(RemoteError::Status {
            status: 500,
            message: "API error: 500".to_string(),
        })),
        FakeSigner::connected("0xme"),
    );

    let err = assert_err!(h.coordinator.register_signed(&draft()).await);

    assert!(matches!(err, RegistrationError::Remote(_)));
    assert_eq!(err.user_message(), "Failed to register agent: API error: 500");
    assert_eq!(h.coordinator.status(), RegistrationStatus::Failed);
    assert_eq!(
        h.coordinator.attempt().failure.as_deref(),
        Some("Failed to register agent: API error: 500")
    );
    assert!(h.listings.all().await.unwrap().is_empty());

    // A failed attempt does not block a retry
    assert!(h.coordinator.register_signed(&draft()).await.is_err());
    assert_eq!(h.api.signed_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_second_invocation_while_in_flight_makes_no_remote_call() {
    let h = harness(
        RecordingApi::responding(json!({"contractAddress": "0xABC"})).gated(),
        FakeSigner::connected("0xme"),
    );

    let first = {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move { coordinator.register_signed(&draft()).await })
    };
    h.api.entered.notified().await;
    assert_eq!(h.coordinator.status(), RegistrationStatus::InFlight);

    let second = h.coordinator.register_signed(&draft()).await;
    assert!(matches!(second, Err(RegistrationError::AlreadyInFlight)));
    let simple = h.coordinator.register_simple(&draft()).await;
    assert!(matches!(simple, Err(RegistrationError::AlreadyInFlight)));
    assert!(!h.coordinator.dismiss());

    h.api.release();
    let outcome = first.await.unwrap().unwrap();

    assert_eq!(outcome.listing_id(), "0xABC");
    assert_eq!(h.api.remote_calls(), 1);
    assert_eq!(h.listings.all().await.unwrap().len(), 1);
    assert_eq!(h.coordinator.status(), RegistrationStatus::Succeeded);
}

#[tokio::test]
async fn test_dropped_attempt_leaves_failed_interrupted() {
    let h = harness(
        RecordingApi::responding(json!({"contractAddress": "0xABC"})).gated(),
        FakeSigner::connected("0xme"),
    );
    let mut events = h.coordinator.event_bus().subscribe();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        h.coordinator.register_signed(&draft()),
    )
    .await;
    assert!(timed_out.is_err());

    let attempt = h.coordinator.attempt();
    assert_eq!(attempt.status, RegistrationStatus::Failed);
    assert_eq!(
        attempt.failure,
        Some(RegistrationError::Interrupted.user_message())
    );
    assert!(matches!(
        drain(&mut events).last(),
        Some(RegistrationEvent::Failed { .. })
    ));

    // The next attempt is allowed straight away
    h.api.release();
    assert!(h.coordinator.register_signed(&draft()).await.is_ok());
}

// ============================================================================
// Simple variant
// ============================================================================

#[tokio::test]
async fn test_simple_flow_never_touches_signer() {
    let h = harness(
        RecordingApi::responding(json!({"tx_hash": "0xfeed"})),
        FakeSigner::disconnected(None),
    );

    let outcome = h.coordinator.register_simple(&draft()).await.unwrap();

    assert_eq!(h.signer.connect_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.signer.sign_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.api.register_calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.listing_id(), "agent-42");
    assert_eq!(outcome.result.tx_hash().as_deref(), Some("0xfeed"));
    assert_eq!(
        outcome.result.explorer_url("https://sepolia.starkscan.co/tx").as_deref(),
        Some("https://sepolia.starkscan.co/tx/0xfeed")
    );
}

#[tokio::test]
async fn test_simple_register_failure_after_create() {
    let h = harness(
        RecordingApi::with_result(Err(RemoteError::Transport("connection reset".to_string()))),
        FakeSigner::disconnected(None),
    );

    let err = h.coordinator.register_simple(&draft()).await.unwrap_err();

    assert!(err.contacted_remote());
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.coordinator.status(), RegistrationStatus::Failed);
    assert!(h.listings.all().await.unwrap().is_empty());

    assert!(h.coordinator.dismiss());
    assert_eq!(h.coordinator.status(), RegistrationStatus::Idle);
}

#[tokio::test]
async fn test_corrupt_listing_slot_fails_attempt_and_keeps_slot() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
    let existing = r#"{"listings":[{"id":"0xOLD","agentData":{"name":"Old"}}]}"#;
    kv.set(LISTINGS_KEY, existing).await.unwrap();

    let api = Arc::new(RecordingApi::responding(json!({"contractAddress": "0xNEW"})));
    let listings = Arc::new(KeyValueListingStore::new(kv.clone()));
    let coordinator = RegistrationCoordinator::new(api.clone(), listings, EventBus::new(16))
        .with_signer(Arc::new(FakeSigner::connected("0xSIGNER")));

    let err = coordinator.register_signed(&draft()).await.unwrap_err();

    match err {
        RegistrationError::Persistence { result, .. } => {
            assert_eq!(result.contract_address().as_deref(), Some("0xNEW"));
        }
        other => panic!("expected persistence failure, got {:?}", other),
    }
    assert_eq!(coordinator.status(), RegistrationStatus::Failed);
    assert_eq!(kv.get(LISTINGS_KEY).await.unwrap().as_deref(), Some(existing));
}
