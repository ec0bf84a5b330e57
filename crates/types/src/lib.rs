//! Shared domain types for the coda event lifecycle engine.
//!
//! These are the records exchanged between the workflow engine and its
//! storage collaborators: workflow states, event records, financial line
//! items, audit entries, and the derived accounting labels. All types
//! serialize to/from JSON; timestamps and dates are carried as ISO 8601 /
//! RFC 3339 strings throughout.

mod accounting;
mod audit;
mod document;
mod line_item;
mod record;
mod state;

pub use accounting::{AccountingStatus, ReconciliationTotals};
pub use audit::{AuditAction, AuditEntry};
pub use document::DocumentKind;
pub use line_item::{LineItem, PaymentDetails};
pub use record::{EventRecord, InvoicingStatus};
pub use state::{StateRole, WorkflowState};
