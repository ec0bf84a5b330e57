//! Accounting-state reconciliation.
//!
//! Independent of the linear workflow: recomputes a record's derived
//! payment state from its financial line items and, when warranted,
//! writes the matching workflow state back through the mutator. The
//! derived states are themselves members of the ordered registry,
//! positioned after the terminal operational state, so the workflow field
//! stays the single source of truth for both.

use std::sync::Arc;

use coda_storage::{LineItemStore, RecordStore};
use coda_types::{
    AccountingStatus, InvoicingStatus, LineItem, PaymentDetails, ReconciliationTotals, StateRole,
};

use crate::clock::Clock;
use crate::error::EngineError;
use crate::mutator::{StateMutator, TransitionRequest};
use crate::registry::StateRegistry;

/// Result of reconciling one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub record_id: String,
    pub totals: ReconciliationTotals,
    /// None while the record is not yet fully invoiced: it remains in its
    /// current pre-invoicing state.
    pub outcome: Option<AccountingStatus>,
    /// Display name of the state the outcome maps onto.
    pub new_state_name: Option<String>,
    /// Whether a state write was performed. False when the record already
    /// sat in the target state, or when the paid gate withheld the write.
    pub applied: bool,
}

/// One record moved by a batch recalculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalcShift {
    pub record_id: String,
    pub old_state_name: String,
    pub new_state_name: String,
}

/// One record that failed during a batch recalculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalcFailure {
    pub record_id: String,
    pub error: String,
}

/// Outcome of a full batch recalculation. Failures never abort the scan;
/// they are collected here alongside the successful shifts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub shifts: Vec<RecalcShift>,
    pub failures: Vec<RecalcFailure>,
}

/// Recomputes derived accounting states from line-item facts.
pub struct ReconciliationEngine {
    registry: Arc<StateRegistry>,
    records: Arc<dyn RecordStore>,
    line_items: Arc<dyn LineItemStore>,
    mutator: Arc<StateMutator>,
    clock: Arc<dyn Clock>,
}

impl ReconciliationEngine {
    pub fn new(
        registry: Arc<StateRegistry>,
        records: Arc<dyn RecordStore>,
        line_items: Arc<dyn LineItemStore>,
        mutator: Arc<StateMutator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            records,
            line_items,
            mutator,
            clock,
        }
    }

    /// Recompute one record's accounting state and write it back if it
    /// changed.
    ///
    /// The write goes through the single mutator path, so it produces the
    /// same audit entry any other transition does. Re-running against
    /// unchanged facts is a no-op: a record already in the derived state
    /// is not rewritten and gains no duplicate audit entry.
    pub async fn calculate(
        &self,
        record_id: &str,
        actor_id: &str,
    ) -> Result<Reconciliation, EngineError> {
        let items = self.line_items.list_line_items(record_id).await?;
        let today = self.clock.today_iso();
        let totals = tally(&items, &today);

        let Some(status) = derive_status(&totals) else {
            return Ok(Reconciliation {
                record_id: record_id.to_string(),
                totals,
                outcome: None,
                new_state_name: None,
                applied: false,
            });
        };

        let target = self.registry.state_for_role(status.role()).await?;
        let record = self.records.get_record(record_id).await?;

        if record.state_id == target.id {
            return Ok(Reconciliation {
                record_id: record_id.to_string(),
                totals,
                outcome: Some(status),
                new_state_name: Some(target.name),
                applied: false,
            });
        }

        // The paid gate holds here as it does for manual transitions: a
        // record that was never invoiced cannot surface as paid, however
        // its line items are flagged.
        if status == AccountingStatus::Paid && record.invoicing_status != InvoicingStatus::Invoiced
        {
            tracing::warn!(
                record_id,
                "line items compute as paid but the record was never invoiced; state left unchanged"
            );
            return Ok(Reconciliation {
                record_id: record_id.to_string(),
                totals,
                outcome: Some(status),
                new_state_name: None,
                applied: false,
            });
        }

        let note = format!(
            "{} of {} line items invoiced, {} paid, {} overdue",
            totals.invoiced, totals.total, totals.paid, totals.overdue
        );
        self.mutator
            .transition(
                record_id,
                &target.id,
                actor_id,
                TransitionRequest::reconciliation(note),
            )
            .await?;

        Ok(Reconciliation {
            record_id: record_id.to_string(),
            totals,
            outcome: Some(status),
            new_state_name: Some(target.name),
            applied: true,
        })
    }

    /// Recalculate every record in the terminal operational state or one
    /// of the accounting states.
    ///
    /// Sequential scan with per-record independence: a failing record is
    /// reported and the scan continues.
    pub async fn recalculate_all(&self, actor_id: &str) -> Result<BatchReport, EngineError> {
        let mut state_ids = Vec::new();
        for role in [
            StateRole::Finalized,
            StateRole::Paid,
            StateRole::PaymentsOverdue,
            StateRole::PaymentsPending,
        ] {
            state_ids.push(self.registry.state_for_role(role).await?.id);
        }

        let records = self.records.list_records_in_states(&state_ids).await?;
        let mut report = BatchReport::default();

        for record in records {
            let old_state_name = match self.registry.get_state(&record.state_id).await {
                Ok(state) => state.name,
                Err(_) => record.state_id.clone(),
            };
            match self.calculate(&record.id, actor_id).await {
                Ok(recon) if recon.applied => report.shifts.push(RecalcShift {
                    record_id: record.id,
                    old_state_name,
                    new_state_name: recon.new_state_name.unwrap_or_default(),
                }),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(record_id = %record.id, error = %e, "batch recalculation failed for record");
                    report.failures.push(RecalcFailure {
                        record_id: record.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Record a collected payment against a line item, then reconcile the
    /// owning record so the derived state never goes stale.
    ///
    /// Rejected outright when the line item was never invoiced: a
    /// payment against an uninvoiced item cannot silently surface as
    /// paid.
    pub async fn mark_as_paid(
        &self,
        line_item_id: &str,
        payment: PaymentDetails,
        actor_id: &str,
    ) -> Result<Reconciliation, EngineError> {
        let item = self.line_items.get_line_item(line_item_id).await?;
        if !item.invoiced {
            return Err(EngineError::LineItemNotInvoiced {
                line_item_id: line_item_id.to_string(),
            });
        }

        let updated = self.line_items.apply_payment(line_item_id, &payment).await?;
        self.calculate(&updated.record_id, actor_id).await
    }
}

// ── Pure derivation ─────────────────────────────────────────────────────────

/// Count the line-item facts. `today` is an ISO date; due dates order
/// lexicographically, so "past due" is a plain string comparison.
fn tally(items: &[LineItem], today: &str) -> ReconciliationTotals {
    let mut totals = ReconciliationTotals::default();
    for item in items {
        totals.total += 1;
        if !item.invoiced {
            continue;
        }
        totals.invoiced += 1;
        if item.collected {
            totals.paid += 1;
        } else if item
            .payment_due_date
            .as_deref()
            .map(|due| due < today)
            .unwrap_or(false)
        {
            totals.overdue += 1;
        }
    }
    totals
}

/// The closed decision table, top-down, first match wins. A record with
/// no line items derives nothing: there are no facts to reconcile.
fn derive_status(totals: &ReconciliationTotals) -> Option<AccountingStatus> {
    if totals.total == 0 || totals.invoiced < totals.total {
        None
    } else if totals.paid == totals.total {
        Some(AccountingStatus::Paid)
    } else if totals.overdue > 0 {
        Some(AccountingStatus::PaymentsOverdue)
    } else {
        Some(AccountingStatus::PaymentsPending)
    }
}
