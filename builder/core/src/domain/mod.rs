// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: builder data model, wizard controller, registration state
//! machine and the port traits the application layer depends on.

pub mod agent_settings;
pub mod builder_config;
pub mod draft;
pub mod events;
pub mod listing;
pub mod registration;
pub mod registry_api;
pub mod repository;
pub mod section;
pub mod signer;
pub mod wizard;
