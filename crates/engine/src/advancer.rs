//! Document-triggered workflow advancement.
//!
//! An uploaded document's declared type tag maps, through a closed routing
//! table, to a target state role. The advancer moves the record forward
//! only when the target lies strictly ahead of the current state, which
//! makes re-uploads idempotent and guarantees a document can never regress
//! the workflow. Document jumps may cross several states in one step; the
//! one-step rule applies to manual transitions only.

use std::collections::BTreeMap;
use std::sync::Arc;

use coda_storage::RecordStore;
use coda_types::{DocumentKind, StateRole};

use crate::error::EngineError;
use crate::mutator::{StateMutator, TransitionRequest};
use crate::registry::StateRegistry;

/// Closed table mapping workflow-significant document kinds to the role
/// of the state they advance a record into. Built at startup; not
/// configurable at runtime.
#[derive(Debug, Clone, Default)]
pub struct DocumentRouting {
    routes: BTreeMap<DocumentKind, StateRole>,
}

impl DocumentRouting {
    /// The standard routes: agreements, purchase orders, and closure
    /// documents advance into their namesake states.
    pub fn standard() -> Self {
        let mut routes = BTreeMap::new();
        routes.insert(DocumentKind::Agreement, StateRole::Agreement);
        routes.insert(DocumentKind::PurchaseOrder, StateRole::PurchaseOrder);
        routes.insert(DocumentKind::Closure, StateRole::Finalized);
        Self { routes }
    }

    pub fn target_role(&self, kind: DocumentKind) -> Option<StateRole> {
        self.routes.get(&kind).copied()
    }
}

/// Result of handling one document upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub advanced: bool,
    /// User-facing explanation; informational even when nothing advanced.
    pub message: String,
    pub new_state_name: Option<String>,
}

impl DocumentOutcome {
    fn unchanged(message: &str) -> Self {
        Self {
            advanced: false,
            message: message.to_string(),
            new_state_name: None,
        }
    }
}

/// Advances records in response to document uploads.
pub struct DocumentAdvancer {
    registry: Arc<StateRegistry>,
    records: Arc<dyn RecordStore>,
    mutator: Arc<StateMutator>,
    routing: DocumentRouting,
}

impl DocumentAdvancer {
    pub fn new(
        registry: Arc<StateRegistry>,
        records: Arc<dyn RecordStore>,
        mutator: Arc<StateMutator>,
        routing: DocumentRouting,
    ) -> Self {
        Self {
            registry,
            records,
            mutator,
            routing,
        }
    }

    /// Handle an uploaded document with the given declared type tag.
    ///
    /// A tag with no workflow significance, or a target at or behind the
    /// record's current state, is an informational non-change: never an
    /// error and never an audit entry.
    pub async fn on_document_uploaded(
        &self,
        record_id: &str,
        type_tag: &str,
        actor_id: &str,
    ) -> Result<DocumentOutcome, EngineError> {
        let target_role = DocumentKind::from_type_tag(type_tag)
            .and_then(|kind| self.routing.target_role(kind));
        let Some(target_role) = target_role else {
            return Ok(DocumentOutcome::unchanged(
                "document received, no state change",
            ));
        };

        let target = self.registry.state_for_role(target_role).await?;
        let record = self.records.get_record(record_id).await?;
        let current = self.registry.get_state(&record.state_id).await?;

        if target.position <= current.position {
            return Ok(DocumentOutcome::unchanged(
                "already at an equal or later state",
            ));
        }

        let receipt = self
            .mutator
            .transition(
                record_id,
                &target.id,
                actor_id,
                TransitionRequest::document(format!("advanced by {type_tag} upload")),
            )
            .await?;
        tracing::debug!(
            record_id,
            from = %receipt.from_state_id,
            to = %receipt.to_state_id,
            "document upload advanced record"
        );

        Ok(DocumentOutcome {
            advanced: true,
            message: format!("record advanced to {}", target.name),
            new_state_name: Some(target.name),
        })
    }
}
