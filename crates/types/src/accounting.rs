//! Derived accounting state labels.

use serde::{Deserialize, Serialize};

use crate::state::StateRole;

/// Derived payment/invoicing label for a fully invoiced record.
///
/// Not a stored entity: a pure function of the record's line items at
/// calculation time. Persisted only when reconciliation writes the
/// matching workflow state back through the mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountingStatus {
    Paid,
    PaymentsOverdue,
    PaymentsPending,
}

impl AccountingStatus {
    /// The workflow state role this label maps onto.
    pub fn role(&self) -> StateRole {
        match self {
            AccountingStatus::Paid => StateRole::Paid,
            AccountingStatus::PaymentsOverdue => StateRole::PaymentsOverdue,
            AccountingStatus::PaymentsPending => StateRole::PaymentsPending,
        }
    }
}

/// Aggregate line-item counts justifying a derived label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationTotals {
    /// Number of line items on the record.
    pub total: u64,
    /// Count with `invoiced = true`.
    pub invoiced: u64,
    /// Count invoiced and collected.
    pub paid: u64,
    /// Count invoiced, uncollected, and past their due date.
    pub overdue: u64,
}
