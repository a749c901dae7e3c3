// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! Section registry for the agent builder wizard.
//!
//! The registry is static: descriptors are defined once and never mutated.

use serde::{Deserialize, Serialize};

/// Static metadata for one wizard page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    pub id: String,
    pub label: String,
    pub description: String,
    pub badge: String,
}

impl SectionDescriptor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        badge: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
            badge: badge.into(),
        }
    }
}

pub const IDENTITY: &str = "identity";
pub const CAPABILITIES: &str = "capabilities";
pub const DATA_SOURCES: &str = "data";
pub const INTEGRATIONS: &str = "integrations";
pub const RULES: &str = "rules";
pub const MONETIZATION: &str = "monetization";
pub const TESTING: &str = "testing";

/// The seven builder sections, in wizard order.
pub fn builder_sections() -> Vec<SectionDescriptor> {
    vec![
        SectionDescriptor::new(
            IDENTITY,
            "Identity & Profile",
            "Define your agent's name, personality, and core identity",
            "BASIC",
        ),
        SectionDescriptor::new(
            CAPABILITIES,
            "Capabilities",
            "Enable and configure agent capabilities and actions",
            "FEATURES",
        ),
        SectionDescriptor::new(
            DATA_SOURCES,
            "Data Sources",
            "Connect knowledge bases, APIs, and data sources",
            "INTEGRATION",
        ),
        SectionDescriptor::new(
            INTEGRATIONS,
            "Integrations",
            "Connect external tools and platforms",
            "INTEGRATION",
        ),
        SectionDescriptor::new(
            RULES,
            "Rules & Constraints",
            "Set safety rules, rate limits, and validation",
            "SAFETY",
        ),
        SectionDescriptor::new(
            MONETIZATION,
            "Monetization",
            "Configure pricing and revenue models",
            "BUSINESS",
        ),
        SectionDescriptor::new(
            TESTING,
            "Testing & Deploy",
            "Test, preview, and deploy your agent",
            "DEPLOYMENT",
        ),
    ]
}
