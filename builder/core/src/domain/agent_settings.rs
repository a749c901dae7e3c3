// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Per-agent Builder Settings
//!
//! Section editors keep their data in namespaced key-value slots, one per
//! agent and editor:
//!
//! ```text
//! phantom.agent.<agent>.policies   JSON array of AgentPolicy   (rules section)
//! phantom.agent.<agent>.rag        JSON array of RagSource     (data sources section)
//! ```
//!
//! `<agent>` is the draft name, or `default` when the name is blank.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::section::{DATA_SOURCES, RULES};

pub const POLICIES_SLOT: &str = "policies";
pub const RAG_SLOT: &str = "rag";

/// Key-value slot for one editor of one agent.
///
/// Characters outside `[A-Za-z0-9_-]` become `_` so the key stays usable
/// as a file name.
pub fn agent_slot_key(agent_name: &str, slot: &str) -> String {
    let trimmed = agent_name.trim();
    let segment: String = if trimmed.is_empty() {
        "default".to_string()
    } else {
        trimmed
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') { c } else { '_' })
            .collect()
    };
    format!("phantom.agent.{}.{}", segment, slot)
}

/// A local enforcement rule, e.g. `allow:read; deny:write`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPolicy {
    pub id: String,
    pub name: String,
    pub rule: String,
}

/// A retrieval document registered for offline indexing. Only the name and
/// the SHA-256 of its content are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagSource {
    pub name: String,
    pub hash: String,
}

impl RagSource {
    pub fn from_content(name: impl Into<String>, content: &[u8]) -> Self {
        Self {
            name: name.into(),
            hash: hex::encode(Sha256::digest(content)),
        }
    }
}

/// What the section editors currently hold for one agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentSettings {
    pub policies: Vec<AgentPolicy>,
    pub rag_sources: Vec<RagSource>,
}

impl AgentSettings {
    /// Sections whose editors have at least one entry.
    pub fn completed_sections(&self) -> Vec<&'static str> {
        let mut done = Vec::new();
        if !self.rag_sources.is_empty() {
            done.push(DATA_SOURCES);
        }
        if !self.policies.is_empty() {
            done.push(RULES);
        }
        done
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentSettingsError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error(transparent)]
    Storage(#[from] crate::domain::repository::RepositoryError),
}
