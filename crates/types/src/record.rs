//! The business event record, the subject of the workflow.

use serde::{Deserialize, Serialize};

/// Invoicing status of an event record.
///
/// Set by the invoicing module when invoice documents are generated;
/// the workflow engine reads it as a gate input (entry into the paid
/// state requires `Invoiced`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoicingStatus {
    NotInvoiced,
    Invoiced,
}

/// A business event as seen by the workflow engine.
///
/// Owned by the record store; the engine reads the current state and
/// invoicing status and issues state-mutation commands against it. The
/// `version` field is the optimistic concurrency token: every committed
/// state write increments it, and a write conditioned on a stale version
/// fails with a conflict instead of silently overwriting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub state_id: String,
    pub invoicing_status: InvoicingStatus,
    pub version: i64,
    /// ISO 8601 / RFC 3339 timestamp string of the last state write.
    pub updated_at: String,
}
