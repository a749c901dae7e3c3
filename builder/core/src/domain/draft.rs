// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Draft (Builder Context)
//!
//! The in-progress agent description edited by the builder wizard. A single
//! `AgentDraft` lives for the whole builder session; section editors mutate it
//! in place and the registration coordinator snapshots it at submit time.
//!
//! ## Vocabularies
//!
//! | Type | Values |
//! |------|--------|
//! | [`AgentType`] | `Trading Agent`, `Prediction Oracle`, `Governance Delegate`, `Research Assistant`, `Task Manager`, `Social Agent`, `Custom` |
//! | [`PersonalityTrait`] | `Analytical`, `Aggressive`, `Cautious`, `Humorous`, `Formal`, `Creative`, `Data-Driven` |
//! | [`Visibility`] | `private`, `public` |
//!
//! The wire names above are what the remote services and the local listing
//! store see; they are fixed by the serde attributes below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Maximum tagline length in characters. Longer input is truncated by
/// [`AgentDraft::set_tagline`].
pub const TAGLINE_MAX_CHARS: usize = 80;

/// Minimum agent name length accepted by [`AgentDraft::validate`].
pub const NAME_MIN_CHARS: usize = 3;

/// Maximum agent name length accepted by [`AgentDraft::validate`].
pub const NAME_MAX_CHARS: usize = 50;

/// Minimum description length accepted by [`AgentDraft::validate`].
pub const DESCRIPTION_MIN_CHARS: usize = 10;

/// Agent category chosen on the identity section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum AgentType {
    #[default]
    #[serde(rename = "Trading Agent")]
    TradingAgent,
    #[serde(rename = "Prediction Oracle")]
    PredictionOracle,
    #[serde(rename = "Governance Delegate")]
    GovernanceDelegate,
    #[serde(rename = "Research Assistant")]
    ResearchAssistant,
    #[serde(rename = "Task Manager")]
    TaskManager,
    #[serde(rename = "Social Agent")]
    SocialAgent,
    Custom,
}

impl AgentType {
    pub const ALL: [AgentType; 7] = [
        AgentType::TradingAgent,
        AgentType::PredictionOracle,
        AgentType::GovernanceDelegate,
        AgentType::ResearchAssistant,
        AgentType::TaskManager,
        AgentType::SocialAgent,
        AgentType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::TradingAgent => "Trading Agent",
            AgentType::PredictionOracle => "Prediction Oracle",
            AgentType::GovernanceDelegate => "Governance Delegate",
            AgentType::ResearchAssistant => "Research Assistant",
            AgentType::TaskManager => "Task Manager",
            AgentType::SocialAgent => "Social Agent",
            AgentType::Custom => "Custom",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = DraftValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DraftValidationError::UnknownAgentType(s.to_string()))
    }
}

/// Personality tag from the fixed builder vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PersonalityTrait {
    Analytical,
    Aggressive,
    Cautious,
    Humorous,
    Formal,
    Creative,
    #[serde(rename = "Data-Driven")]
    DataDriven,
}

impl PersonalityTrait {
    pub const ALL: [PersonalityTrait; 7] = [
        PersonalityTrait::Analytical,
        PersonalityTrait::Aggressive,
        PersonalityTrait::Cautious,
        PersonalityTrait::Humorous,
        PersonalityTrait::Formal,
        PersonalityTrait::Creative,
        PersonalityTrait::DataDriven,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonalityTrait::Analytical => "Analytical",
            PersonalityTrait::Aggressive => "Aggressive",
            PersonalityTrait::Cautious => "Cautious",
            PersonalityTrait::Humorous => "Humorous",
            PersonalityTrait::Formal => "Formal",
            PersonalityTrait::Creative => "Creative",
            PersonalityTrait::DataDriven => "Data-Driven",
        }
    }
}

impl fmt::Display for PersonalityTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonalityTrait {
    type Err = DraftValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PersonalityTrait::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DraftValidationError::UnknownPersonalityTrait(s.to_string()))
    }
}

/// Marketplace visibility of the agent once registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Private => f.write_str("private"),
            Visibility::Public => f.write_str("public"),
        }
    }
}

/// The agent description being assembled by the builder.
///
/// Serialized with camelCase keys and `type` for the category, which is the
/// shape persisted under `agentData` in local listing records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDraft {
    pub name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub agent_type: AgentType,
    #[serde(default)]
    pub personality: BTreeSet<PersonalityTrait>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl Default for AgentDraft {
    fn default() -> Self {
        Self {
            name: "My Agent".to_string(),
            tagline: String::new(),
            description: String::new(),
            agent_type: AgentType::TradingAgent,
            personality: BTreeSet::new(),
            visibility: Visibility::Private,
        }
    }
}

impl AgentDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the tagline, truncating to [`TAGLINE_MAX_CHARS`] characters.
    pub fn set_tagline(&mut self, tagline: &str) {
        self.tagline = tagline.chars().take(TAGLINE_MAX_CHARS).collect();
    }

    /// Toggle a personality tag; returns `true` if the tag is now selected.
    pub fn toggle_personality(&mut self, tag: PersonalityTrait) -> bool {
        if self.personality.remove(&tag) {
            false
        } else {
            self.personality.insert(tag);
            true
        }
    }

    /// Completion predicate for the identity section.
    pub fn is_identity_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.description.trim().is_empty()
    }

    /// Check every field and return all violations, empty when valid.
    pub fn validate(&self) -> Vec<DraftValidationError> {
        let mut errors = Vec::new();

        let name_len = self.name.trim().chars().count();
        if name_len < NAME_MIN_CHARS {
            errors.push(DraftValidationError::NameTooShort);
        } else if name_len > NAME_MAX_CHARS {
            errors.push(DraftValidationError::NameTooLong);
        }

        if self.description.trim().chars().count() < DESCRIPTION_MIN_CHARS {
            errors.push(DraftValidationError::DescriptionTooShort);
        }

        if self.tagline.chars().count() > TAGLINE_MAX_CHARS {
            errors.push(DraftValidationError::TaglineTooLong);
        }

        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftValidationError {
    #[error("Agent name must be at least 3 characters")]
    NameTooShort,

    #[error("Agent name must not exceed 50 characters")]
    NameTooLong,

    #[error("Description must be at least 10 characters")]
    DescriptionTooShort,

    #[error("Tagline must not exceed 80 characters")]
    TaglineTooLong,

    #[error("Unknown agent type: '{0}'")]
    UnknownAgentType(String),

    #[error("Unknown personality trait: '{0}'")]
    UnknownPersonalityTrait(String),
}

impl DraftValidationError {
    /// Name of the draft field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            DraftValidationError::NameTooShort | DraftValidationError::NameTooLong => "name",
            DraftValidationError::DescriptionTooShort => "description",
            DraftValidationError::TaglineTooLong => "tagline",
            DraftValidationError::UnknownAgentType(_) => "type",
            DraftValidationError::UnknownPersonalityTrait(_) => "personality",
        }
    }
}
