// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

//! Local ed25519 wallet.
//!
//! The key is kept base64-encoded in a key-value slot so the same identity
//! survives restarts. `connect()` opens a session with that key, creating
//! and persisting a fresh one on first use.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, Verifier};
use parking_lot::RwLock;
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::repository::{KeyValueStore, WALLET_KEY};
use crate::domain::signer::{Signature, SignerAdapter, SignerError, SignerIdentity};

struct Session {
    identity: SignerIdentity,
    key: SigningKey,
}

pub struct LocalWalletSigner {
    store: Arc<dyn KeyValueStore>,
    slot: String,
    session: RwLock<Option<Session>>,
}

impl LocalWalletSigner {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_slot(store, WALLET_KEY)
    }

    pub fn with_slot(store: Arc<dyn KeyValueStore>, slot: impl Into<String>) -> Self {
        Self {
            store,
            slot: slot.into(),
            session: RwLock::new(None),
        }
    }

    /// `0x` + first 20 bytes of SHA-256 over the public key.
    pub fn address_for(key: &SigningKey) -> SignerIdentity {
        let digest = Sha256::digest(key.verifying_key().to_bytes());
        SignerIdentity::new(format!("0x{}", hex::encode(&digest[..20])))
    }

    /// Forget the in-memory session. The persisted key is kept.
    pub fn disconnect(&self) {
        if self.session.write().take().is_some() {
            info!("Wallet disconnected");
        }
    }

    /// Check `signature` over `message` against the connected key.
    pub fn verify(&self, message: &str, signature: &Signature) -> Result<(), SignerError> {
        let session = self.session.read();
        let session = session.as_ref().ok_or(SignerError::NotConnected)?;

        let raw = signature
            .as_str()
            .strip_prefix("0x")
            .ok_or_else(|| SignerError::SigningFailed("Signature is not 0x-prefixed".to_string()))?;
        let bytes = hex::decode(raw)
            .map_err(|e| SignerError::SigningFailed(format!("Invalid signature hex: {}", e)))?;
        let bytes: [u8; 64] = bytes
            .try_into()
            .map_err(|_| SignerError::SigningFailed("Invalid signature length (must be 64 bytes)".to_string()))?;

        session
            .key
            .verifying_key()
            .verify(message.as_bytes(), &Ed25519Signature::from_bytes(&bytes))
            .map_err(|e| SignerError::SigningFailed(format!("Signature verification failed: {}", e)))
    }

    async fn load_or_create_key(&self) -> Result<SigningKey, SignerError> {
        let stored = self
            .store
            .get(&self.slot)
            .await
            .map_err(|e| SignerError::ConnectionFailed(e.to_string()))?;

        if let Some(encoded) = stored {
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|e| SignerError::ConnectionFailed(format!("Invalid stored wallet key: {}", e)))?;
            let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
                SignerError::ConnectionFailed("Invalid stored wallet key length (must be 32 bytes)".to_string())
            })?;
            debug!("Loaded wallet key from storage");
            return Ok(SigningKey::from_bytes(&bytes));
        }

        let key = SigningKey::generate(&mut OsRng);
        self.store
            .set(&self.slot, &STANDARD.encode(key.to_bytes()))
            .await
            .map_err(|e| SignerError::ConnectionFailed(e.to_string()))?;
        info!("Generated new wallet key");
        Ok(key)
    }
}

#[async_trait]
impl SignerAdapter for LocalWalletSigner {
    fn current_signer(&self) -> Option<SignerIdentity> {
        self.session.read().as_ref().map(|s| s.identity.clone())
    }

    async fn connect(&self) -> Result<SignerIdentity, SignerError> {
        if let Some(identity) = self.current_signer() {
            return Ok(identity);
        }

        let key = self.load_or_create_key().await?;
        let identity = Self::address_for(&key);
        info!(address = %identity.short(), "Wallet connected");

        *self.session.write() = Some(Session {
            identity: identity.clone(),
            key,
        });
        Ok(identity)
    }

    async fn sign(&self, signer: &SignerIdentity, message: &str) -> Result<Signature, SignerError> {
        let session = self.session.read();
        let session = session.as_ref().ok_or(SignerError::NotConnected)?;
        if &session.identity != signer {
            return Err(SignerError::Rejected(format!(
                "Connected account {} cannot sign for {}",
                session.identity.short(),
                signer.short()
            )));
        }

        let signature = session.key.sign(message.as_bytes());
        Ok(Signature(format!("0x{}", hex::encode(signature.to_bytes()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryKeyValueStore;

    fn signer_over(store: &Arc<dyn KeyValueStore>) -> LocalWalletSigner {
        LocalWalletSigner::new(store.clone())
    }

    #[tokio::test]
    async fn test_identity_is_stable_across_sessions() {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());

        let first = signer_over(&store);
        assert!(first.current_signer().is_none());
        let address = first.connect().await.unwrap();
        assert!(address.as_str().starts_with("0x"));
        assert_eq!(address.as_str().len(), 42);
        assert!(store.get(WALLET_KEY).await.unwrap().is_some());

        let second = signer_over(&store);
        assert_eq!(second.connect().await.unwrap(), address);
    }

    #[tokio::test]
    async fn test_sign_and_verify() {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        let signer = signer_over(&store);
        let identity = signer.connect().await.unwrap();

        let signature = signer.sign(&identity, "hello").await.unwrap();
        assert!(signature.as_str().starts_with("0x"));
        assert_eq!(signature.as_str().len(), 2 + 128);
        signer.verify("hello", &signature).unwrap();
        assert!(signer.verify("tampered", &signature).is_err());
    }

    #[tokio::test]
    async fn test_sign_requires_session_for_that_identity() {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        let signer = signer_over(&store);

        let stranger = SignerIdentity::new("0xstranger");
        assert_eq!(
            signer.sign(&stranger, "m").await.unwrap_err(),
            SignerError::NotConnected
        );

        signer.connect().await.unwrap();
        assert!(matches!(
            signer.sign(&stranger, "m").await.unwrap_err(),
            SignerError::Rejected(_)
        ));

        signer.disconnect();
        assert!(signer.current_signer().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_stored_key_fails_connect() {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        store.set(WALLET_KEY, "not base64!").await.unwrap();
        let err = signer_over(&store).connect().await.unwrap_err();
        assert!(matches!(err, SignerError::ConnectionFailed(_)));
    }
}
