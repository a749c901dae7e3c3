// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! Signer port.
//!
//! The builder only needs three things from a wallet: the currently connected
//! identity (if any), a way to try connecting, and a way to sign a message.
//! How the wallet is reached is an infrastructure concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account address of a connected wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignerIdentity(pub String);

impl SignerIdentity {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd` form for display.
    pub fn short(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 10 {
            return self.0.clone();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl fmt::Display for SignerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque signature produced by a [`SignerAdapter`], normalized to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(pub String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("Wallet connection failed: {0}")]
    ConnectionFailed(String),

    #[error("No account available to sign")]
    NotConnected,

    #[error("Signature request rejected: {0}")]
    Rejected(String),

    #[error("No supported signing method on account")]
    Unsupported,

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// Wallet abstraction consumed by the registration coordinator.
#[async_trait]
pub trait SignerAdapter: Send + Sync {
    /// The connected identity, or `None` when no wallet session exists.
    fn current_signer(&self) -> Option<SignerIdentity>;

    /// Try to establish a wallet session.
    async fn connect(&self) -> Result<SignerIdentity, SignerError>;

    /// Whether [`SignerAdapter::sign`] is available at all.
    fn supports_signing(&self) -> bool {
        true
    }

    /// Sign `message` as `signer`.
    async fn sign(&self, signer: &SignerIdentity, message: &str) -> Result<Signature, SignerError>;
}
