use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What kind of divergence a mismatch describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// A remote-originated scalar field differs.
    Field,
    /// A nested item exists remotely but not in the cache.
    MissingNested,
    /// A nested item exists in the cache but no longer remotely.
    StaleNested,
}

/// A single reported divergence between the cache and the remote snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MismatchRecord {
    pub entity_id: String,
    pub field: String,
    pub cached: Value,
    pub remote: Value,
    pub kind: MismatchKind,
}

impl MismatchRecord {
    pub fn field(
        entity_id: impl Into<String>,
        field: impl Into<String>,
        cached: Value,
        remote: Value,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            field: field.into(),
            cached,
            remote,
            kind: MismatchKind::Field,
        }
    }

    pub fn missing_nested(entity_id: &str, field: &str, key: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            field: field.to_string(),
            cached: Value::Null,
            remote: Value::String(key.to_string()),
            kind: MismatchKind::MissingNested,
        }
    }

    pub fn stale_nested(entity_id: &str, field: &str, key: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            field: field.to_string(),
            cached: Value::String(key.to_string()),
            remote: Value::Null,
            kind: MismatchKind::StaleNested,
        }
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub collection: String,
    pub checked_at: DateTime<Utc>,
    pub mismatches: Vec<MismatchRecord>,
    /// Orphans dropped from the cache.
    pub removed: Vec<String>,
    /// Remote ids newly added to the cache.
    pub added: Vec<String>,
}

impl ValidationReport {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            checked_at: Utc::now(),
            mismatches: Vec::new(),
            removed: Vec::new(),
            added: Vec::new(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty() && self.removed.is_empty() && self.added.is_empty()
    }
}
