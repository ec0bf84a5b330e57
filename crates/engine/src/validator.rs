//! Manual transition validation.
//!
//! Checks are evaluated in order and every violation is collected, so a
//! rejected transition reports the complete list rather than the first
//! failure. The validator performs only reads; it is safe to call
//! repeatedly and concurrently, and it never mutates anything.

use std::collections::BTreeMap;
use std::sync::Arc;

use coda_storage::{LineItemStore, RecordStore};
use coda_types::{InvoicingStatus, StateRole, WorkflowState};

use crate::error::EngineError;
use crate::registry::StateRegistry;

/// A precondition attached to entering a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The record must have at least one financial line item.
    RequiresLineItems,
    /// The record's invoicing status must already be `Invoiced`.
    RequiresInvoicedStatus,
}

/// Role-keyed table of entry gates.
///
/// Closed at startup: roles absent from the table attract no extra check,
/// so an unrecognized state degrades to the structural rules alone.
#[derive(Debug, Clone, Default)]
pub struct GateTable {
    gates: BTreeMap<StateRole, Gate>,
}

impl GateTable {
    /// The standard gate set: invoicing needs line items, payment needs
    /// a completed invoicing run.
    pub fn standard() -> Self {
        let mut gates = BTreeMap::new();
        gates.insert(StateRole::Invoiced, Gate::RequiresLineItems);
        gates.insert(StateRole::Paid, Gate::RequiresInvoicedStatus);
        Self { gates }
    }

    pub fn for_role(&self, role: StateRole) -> Option<Gate> {
        self.gates.get(&role).copied()
    }
}

/// Outcome of a transition check: the conjunction of all rules, plus the
/// human-readable violation list for display and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCheck {
    pub ok: bool,
    pub violations: Vec<String>,
}

impl TransitionCheck {
    fn from_violations(violations: Vec<String>) -> Self {
        Self {
            ok: violations.is_empty(),
            violations,
        }
    }
}

/// Validates manual workflow transitions.
pub struct TransitionValidator {
    registry: Arc<StateRegistry>,
    records: Arc<dyn RecordStore>,
    line_items: Arc<dyn LineItemStore>,
    gates: GateTable,
}

impl TransitionValidator {
    pub fn new(
        registry: Arc<StateRegistry>,
        records: Arc<dyn RecordStore>,
        line_items: Arc<dyn LineItemStore>,
        gates: GateTable,
    ) -> Self {
        Self {
            registry,
            records,
            line_items,
            gates,
        }
    }

    /// Check whether `record_id` may move from `from_state_id` to
    /// `to_state_id`.
    ///
    /// Rules, in order:
    /// 1. Both states must exist in the registry.
    /// 2. Forward moves must advance exactly one step in the sequence;
    ///    regression to any earlier state is structurally allowed.
    /// 3. The target state's entry gate, if any, must hold.
    pub async fn check(
        &self,
        record_id: &str,
        from_state_id: &str,
        to_state_id: &str,
    ) -> Result<TransitionCheck, EngineError> {
        let mut violations = Vec::new();

        let from = self.resolve(from_state_id, &mut violations).await?;
        let to = self.resolve(to_state_id, &mut violations).await?;

        if let (Some(from), Some(to)) = (&from, &to) {
            if to.position > from.position {
                let next = self.registry.next_state(&from.id).await?;
                let is_single_step = next.map(|n| n.id == to.id).unwrap_or(false);
                if !is_single_step {
                    violations
                        .push("only one state may be advanced at a time".to_string());
                }
            }
        }

        if let Some(to) = &to {
            match self.gates.for_role(to.role) {
                Some(Gate::RequiresLineItems) => {
                    let items = self.line_items.list_line_items(record_id).await?;
                    if items.is_empty() {
                        violations.push(format!(
                            "record {record_id} cannot be invoiced: no financial line items exist"
                        ));
                    }
                }
                Some(Gate::RequiresInvoicedStatus) => {
                    let record = self.records.get_record(record_id).await?;
                    if record.invoicing_status != InvoicingStatus::Invoiced {
                        violations.push(format!(
                            "record {record_id} cannot be marked paid: it has not been invoiced"
                        ));
                    }
                }
                None => {}
            }
        }

        Ok(TransitionCheck::from_violations(violations))
    }

    /// Resolve a state id, downgrading a missing state to a violation so
    /// the remaining checks still run.
    async fn resolve(
        &self,
        state_id: &str,
        violations: &mut Vec<String>,
    ) -> Result<Option<WorkflowState>, EngineError> {
        match self.registry.get_state(state_id).await {
            Ok(state) => Ok(Some(state)),
            Err(EngineError::StateNotFound { state_id }) => {
                violations.push(format!("state not found: {state_id}"));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
