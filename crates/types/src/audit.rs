//! Immutable audit trail entries.

use serde::{Deserialize, Serialize};

/// What kind of action produced a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A user-initiated transition through the validator.
    Manual,
    /// An automatic advance triggered by a document upload.
    Document,
    /// A write-back from accounting reconciliation.
    Reconciliation,
}

/// An immutable record of a single accepted transition.
///
/// Created exactly once per committed state change; never mutated or
/// deleted. The audit store owns the append-only log; the engine holds
/// no reference after writing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub record_id: String,
    pub actor_id: String,
    pub action: AuditAction,
    pub from_state_id: String,
    pub to_state_id: String,
    #[serde(default)]
    pub note: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub occurred_at: String,
}
