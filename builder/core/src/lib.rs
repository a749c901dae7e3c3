// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! Phantom agent builder core.
//!
//! # Architecture
//!
//! - **domain:** draft model, wizard controller, registration state machine, ports
//! - **application:** registration coordinator, agent attestation and the
//!   per-agent policy and RAG source editors
//! - **infrastructure:** HTTP registry client, key-value and listing stores,
//!   local wallet signer, event bus

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
