// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod registry_client;
pub mod repositories;
pub mod signer;
