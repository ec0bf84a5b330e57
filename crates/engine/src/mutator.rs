//! The single state-write path.
//!
//! Every accepted transition, whether manual, document-triggered, or
//! reconciliation-driven, goes through [`StateMutator::transition`], so
//! audit behavior is identical for all of them. The mutator performs no
//! validation: deciding whether a transition is permitted is the caller's
//! job.

use std::sync::Arc;

use coda_storage::{AuditStore, RecordStore};
use coda_types::{AuditAction, AuditEntry};

use crate::clock::Clock;
use crate::error::EngineError;

/// Caller-supplied details for one transition.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub action: AuditAction,
    pub note: Option<String>,
    /// RFC 3339 timestamp for the audit entry; defaults to now.
    pub occurred_at: Option<String>,
}

impl TransitionRequest {
    pub fn manual(note: Option<String>) -> Self {
        Self {
            action: AuditAction::Manual,
            note,
            occurred_at: None,
        }
    }

    pub fn document(note: String) -> Self {
        Self {
            action: AuditAction::Document,
            note: Some(note),
            occurred_at: None,
        }
    }

    pub fn reconciliation(note: String) -> Self {
        Self {
            action: AuditAction::Reconciliation,
            note: Some(note),
            occurred_at: None,
        }
    }
}

/// The mutator's account of one committed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReceipt {
    pub record_id: String,
    pub from_state_id: String,
    pub to_state_id: String,
    pub new_version: i64,
    /// False when the state write committed but the audit append failed.
    pub audit_recorded: bool,
}

/// Applies state changes and writes the audit trail.
pub struct StateMutator {
    records: Arc<dyn RecordStore>,
    audit: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
}

impl StateMutator {
    pub fn new(
        records: Arc<dyn RecordStore>,
        audit: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            audit,
            clock,
        }
    }

    /// Move a record to `to_state_id` and append exactly one audit entry.
    ///
    /// The state write is version-conditioned on the record as read here;
    /// a concurrent writer surfaces as a conflict error, not a silent
    /// overwrite. The record store and the audit store share no
    /// transaction: if the audit append fails after the state write
    /// committed, the transition stands; the failure is logged and
    /// reported through `audit_recorded`, never rolled back.
    pub async fn transition(
        &self,
        record_id: &str,
        to_state_id: &str,
        actor_id: &str,
        request: TransitionRequest,
    ) -> Result<TransitionReceipt, EngineError> {
        let record = self.records.get_record(record_id).await?;
        let from_state_id = record.state_id.clone();

        let new_version = self
            .records
            .update_record_state(record_id, record.version, to_state_id)
            .await?;

        let occurred_at = request
            .occurred_at
            .unwrap_or_else(|| self.clock.now_rfc3339());
        let entry = AuditEntry {
            // Versions increment once per committed write, so this id is
            // unique per transition of the record.
            id: format!("audit-{record_id}-{new_version}"),
            record_id: record_id.to_string(),
            actor_id: actor_id.to_string(),
            action: request.action,
            from_state_id: from_state_id.clone(),
            to_state_id: to_state_id.to_string(),
            note: request.note,
            occurred_at,
        };

        let audit_recorded = match self.audit.append(entry).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    record_id,
                    from = %from_state_id,
                    to = %to_state_id,
                    error = %e,
                    "state change committed but audit append failed"
                );
                false
            }
        };

        Ok(TransitionReceipt {
            record_id: record_id.to_string(),
            from_state_id,
            to_state_id: to_state_id.to_string(),
            new_version,
            audit_recorded,
        })
    }
}
