//! Event lifecycle workflow and accounting reconciliation engine.
//!
//! Governs how a business event record progresses through an ordered,
//! administratively configured sequence of workflow states (by manual
//! transition, by document upload, or by accounting reconciliation) and
//! keeps an append-only audit trail of every accepted transition.
//!
//! The engine owns no data: records, line items, audit entries, and the
//! state configuration live behind the store traits in `coda-storage`,
//! injected at construction so callers (and tests) choose the backends.

pub mod advancer;
pub mod clock;
pub mod error;
pub mod mutator;
pub mod reconcile;
pub mod registry;
pub mod validator;

use std::sync::Arc;

use coda_storage::{AuditStore, LineItemStore, RecordStore, StateConfigStore};
use coda_types::{AuditEntry, PaymentDetails, WorkflowState};

pub use advancer::{DocumentAdvancer, DocumentOutcome, DocumentRouting};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::EngineError;
pub use mutator::{StateMutator, TransitionReceipt, TransitionRequest};
pub use reconcile::{
    BatchReport, RecalcFailure, RecalcShift, Reconciliation, ReconciliationEngine,
};
pub use registry::StateRegistry;
pub use validator::{Gate, GateTable, TransitionCheck, TransitionValidator};

/// The assembled engine: registry, validator, mutator, advancer, and
/// reconciliation wired to one set of stores, with the standard gate and
/// routing tables.
///
/// Components remain individually constructible for callers that need a
/// different wiring; this facade is the common case.
pub struct WorkflowEngine {
    registry: Arc<StateRegistry>,
    validator: TransitionValidator,
    mutator: Arc<StateMutator>,
    advancer: DocumentAdvancer,
    reconciler: ReconciliationEngine,
    records: Arc<dyn RecordStore>,
    audit: Arc<dyn AuditStore>,
}

impl WorkflowEngine {
    pub fn new(
        records: Arc<dyn RecordStore>,
        line_items: Arc<dyn LineItemStore>,
        audit: Arc<dyn AuditStore>,
        config: Arc<dyn StateConfigStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = Arc::new(StateRegistry::new(config));
        let mutator = Arc::new(StateMutator::new(
            records.clone(),
            audit.clone(),
            clock.clone(),
        ));
        let validator = TransitionValidator::new(
            registry.clone(),
            records.clone(),
            line_items.clone(),
            GateTable::standard(),
        );
        let advancer = DocumentAdvancer::new(
            registry.clone(),
            records.clone(),
            mutator.clone(),
            DocumentRouting::standard(),
        );
        let reconciler = ReconciliationEngine::new(
            registry.clone(),
            records.clone(),
            line_items,
            mutator.clone(),
            clock,
        );
        Self {
            registry,
            validator,
            mutator,
            advancer,
            reconciler,
            records,
            audit,
        }
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// The advancing sequence, ascending.
    pub async fn list_states(&self) -> Result<Vec<WorkflowState>, EngineError> {
        self.registry.list_states().await
    }

    /// Pre-flight check of a manual transition; pure read, reports every
    /// violation.
    pub async fn check_transition(
        &self,
        record_id: &str,
        from_state_id: &str,
        to_state_id: &str,
    ) -> Result<TransitionCheck, EngineError> {
        self.validator
            .check(record_id, from_state_id, to_state_id)
            .await
    }

    /// Validate and apply a manual transition.
    ///
    /// Rejections carry the full violation list in
    /// [`EngineError::TransitionRejected`].
    pub async fn transition(
        &self,
        record_id: &str,
        to_state_id: &str,
        actor_id: &str,
        note: Option<String>,
    ) -> Result<TransitionReceipt, EngineError> {
        let record = self.records.get_record(record_id).await?;
        let check = self
            .validator
            .check(record_id, &record.state_id, to_state_id)
            .await?;
        if !check.ok {
            return Err(EngineError::TransitionRejected {
                violations: check.violations,
            });
        }
        self.mutator
            .transition(record_id, to_state_id, actor_id, TransitionRequest::manual(note))
            .await
    }

    /// Handle a document upload; advances the record when the document's
    /// type maps to a later state.
    pub async fn on_document_uploaded(
        &self,
        record_id: &str,
        type_tag: &str,
        actor_id: &str,
    ) -> Result<DocumentOutcome, EngineError> {
        self.advancer
            .on_document_uploaded(record_id, type_tag, actor_id)
            .await
    }

    /// Reconcile one record's accounting state.
    pub async fn calculate(
        &self,
        record_id: &str,
        actor_id: &str,
    ) -> Result<Reconciliation, EngineError> {
        self.reconciler.calculate(record_id, actor_id).await
    }

    /// Reconcile every finalized or accounting-state record.
    pub async fn recalculate_all(&self, actor_id: &str) -> Result<BatchReport, EngineError> {
        self.reconciler.recalculate_all(actor_id).await
    }

    /// Record a payment and reconcile the owning record.
    pub async fn mark_as_paid(
        &self,
        line_item_id: &str,
        payment: PaymentDetails,
        actor_id: &str,
    ) -> Result<Reconciliation, EngineError> {
        self.reconciler
            .mark_as_paid(line_item_id, payment, actor_id)
            .await
    }

    /// A record's audit trail, newest first.
    pub async fn history(&self, record_id: &str) -> Result<Vec<AuditEntry>, EngineError> {
        Ok(self.audit.list_by_record(record_id).await?)
    }
}
