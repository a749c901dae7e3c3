// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! Local listing records.
//!
//! A record is written once, after a successful registration, and never
//! mutated afterwards. Marketplace and detail views look records up by `id`
//! or by the draft name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::draft::AgentDraft;
use crate::domain::registration::RegistrationResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalListingRecord {
    pub id: String,
    pub agent_data: AgentDraft,
    #[serde(default)]
    pub on_chain: RegistrationResult,
    #[serde(
        rename = "saved_at",
        alias = "savedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub saved_at: Option<DateTime<Utc>>,
}

impl LocalListingRecord {
    /// Snapshot `draft` together with the registration result.
    pub fn new(id: impl Into<String>, draft: &AgentDraft, on_chain: RegistrationResult) -> Self {
        Self {
            id: id.into(),
            agent_data: draft.clone(),
            on_chain,
            saved_at: Some(Utc::now()),
        }
    }

    /// Id for a result that carried no usable identifier.
    pub fn fallback_id(now: DateTime<Utc>) -> String {
        format!("local-{}", now.timestamp_millis())
    }

    pub fn matches(&self, id_or_name: &str) -> bool {
        self.id == id_or_name || self.agent_data.name == id_or_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_record_wire_shape() {
        let draft = AgentDraft::new("Market Oracle");
        let record = LocalListingRecord::new(
            "0xABC",
            &draft,
            RegistrationResult::from_value(json!({"contractAddress": "0xABC"})),
        );
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], "0xABC");
        assert_eq!(json["agentData"]["name"], "Market Oracle");
        assert_eq!(json["onChain"]["contractAddress"], "0xABC");
        assert!(json.get("saved_at").is_some());
        assert!(json.get("savedAt").is_none());
    }

    #[test]
    fn test_saved_at_reads_either_spelling() {
        for field in ["saved_at", "savedAt"] {
            let raw = json!({
                "id": "0xABC",
                "agentData": {"name": "Market Oracle"},
                field: "2026-01-02T03:04:05Z"
            });
            let record: LocalListingRecord = serde_json::from_value(raw).unwrap();
            let saved = record.saved_at.unwrap();
            assert_eq!(saved, Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap());
        }
    }

    #[test]
    fn test_record_is_a_copy_of_the_draft() {
        let mut draft = AgentDraft::new("Before");
        let record = LocalListingRecord::new("id", &draft, RegistrationResult::default());
        draft.name = "After".to_string();
        assert_eq!(record.agent_data.name, "Before");
        assert!(record.matches("Before"));
        assert!(record.matches("id"));
        assert!(!record.matches("After"));
    }

    #[test]
    fn test_fallback_id_uses_millis() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(LocalListingRecord::fallback_id(now), "local-1700000000123");
    }
}
