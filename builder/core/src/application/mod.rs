// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

pub mod agent_settings;
pub mod attestation;
pub mod registration;
