//! End-to-end tests of the assembled engine over the in-memory backend:
//! manual transitions, document advancement, reconciliation, and the
//! audit trail they share.

use std::sync::Arc;

use async_trait::async_trait;

use coda_engine::{EngineError, FixedClock, WorkflowEngine};
use coda_storage::{LineItemStore, MemoryStore, RecordStore, StorageError};
use coda_types::{
    AuditAction, EventRecord, InvoicingStatus, LineItem, PaymentDetails, StateRole, WorkflowState,
};

const TODAY: &str = "2026-08-06";

fn state(id: &str, name: &str, position: i64, role: StateRole) -> WorkflowState {
    WorkflowState {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        position,
        color: None,
        workflow_step: 1,
        role,
    }
}

fn record(id: &str, state_id: &str, status: InvoicingStatus) -> EventRecord {
    EventRecord {
        id: id.to_string(),
        state_id: state_id.to_string(),
        invoicing_status: status,
        version: 0,
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

fn item(id: &str, record_id: &str, invoiced: bool, collected: bool, due: Option<&str>) -> LineItem {
    LineItem {
        id: id.to_string(),
        record_id: record_id.to_string(),
        description: "venue hire".to_string(),
        amount: rust_decimal::Decimal::new(250_000, 2),
        invoiced,
        collected,
        payment_due_date: due.map(str::to_string),
        paid_at: None,
        payment_method: None,
        payment_reference: None,
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.seed_state(state("st-1", "Enquiry", 1, StateRole::General));
    store.seed_state(state("st-2", "Agreement", 2, StateRole::Agreement));
    store.seed_state(state("st-3", "Purchase Order", 3, StateRole::PurchaseOrder));
    store.seed_state(state("st-4", "Invoiced", 4, StateRole::Invoiced));
    store.seed_state(state("st-5", "Finalized", 5, StateRole::Finalized));
    store.seed_state(state("st-6", "Payments Pending", 6, StateRole::PaymentsPending));
    store.seed_state(state("st-7", "Payments Overdue", 7, StateRole::PaymentsOverdue));
    store.seed_state(state("st-8", "Paid", 8, StateRole::Paid));
    let mut cancelled = state("st-99", "Cancelled", 99, StateRole::General);
    cancelled.workflow_step = 0;
    store.seed_state(cancelled);
    store
}

fn engine_over(store: &Arc<MemoryStore>) -> WorkflowEngine {
    WorkflowEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(FixedClock::at("2026-08-06T09:30:00Z", TODAY)),
    )
}

// ── Manual transitions ──────────────────────────────────────────────────────

#[tokio::test]
async fn manual_walk_advances_one_step_at_a_time() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-1", InvoicingStatus::NotInvoiced));

    let receipt = engine
        .transition("ev-1", "st-2", "user-1", Some("signed at the fair".to_string()))
        .await
        .unwrap();
    assert_eq!(receipt.from_state_id, "st-1");
    assert_eq!(receipt.to_state_id, "st-2");
    assert!(receipt.audit_recorded);

    // Skipping from Agreement straight to Invoiced is rejected.
    let err = engine
        .transition("ev-1", "st-4", "user-1", None)
        .await
        .unwrap_err();
    match err {
        EngineError::TransitionRejected { violations } => {
            assert!(violations
                .iter()
                .any(|v| v.contains("only one state may be advanced")));
        }
        other => panic!("expected rejection, got {other}"),
    }

    // The rejected attempt must not have produced an audit entry.
    assert_eq!(engine.history("ev-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn regression_is_allowed_and_audited() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-5", InvoicingStatus::NotInvoiced));

    let receipt = engine
        .transition("ev-1", "st-1", "user-1", None)
        .await
        .unwrap();
    assert_eq!(receipt.from_state_id, "st-5");
    assert_eq!(receipt.to_state_id, "st-1");

    let trail = engine.history("ev-1").await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, AuditAction::Manual);
}

#[tokio::test]
async fn invoicing_gate_clears_once_a_line_item_exists() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-3", InvoicingStatus::NotInvoiced));

    let err = engine
        .transition("ev-1", "st-4", "user-1", None)
        .await
        .unwrap_err();
    match err {
        EngineError::TransitionRejected { violations } => {
            assert!(violations[0].contains("no financial line items"));
        }
        other => panic!("expected rejection, got {other}"),
    }

    store.seed_line_item(item("li-1", "ev-1", false, false, None));
    engine
        .transition("ev-1", "st-4", "user-1", None)
        .await
        .unwrap();
    assert_eq!(store.get_record("ev-1").await.unwrap().state_id, "st-4");
}

#[tokio::test]
async fn paid_gate_requires_completed_invoicing() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-7", InvoicingStatus::NotInvoiced));
    store.seed_line_item(item("li-1", "ev-1", true, true, None));

    let err = engine
        .transition("ev-1", "st-8", "user-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::TransitionRejected { .. }));

    store
        .set_invoicing_status("ev-1", InvoicingStatus::Invoiced)
        .await
        .unwrap();
    engine
        .transition("ev-1", "st-8", "user-1", None)
        .await
        .unwrap();
}

// ── Document advancement ────────────────────────────────────────────────────

#[tokio::test]
async fn document_uploads_drive_the_lifecycle() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-1", InvoicingStatus::NotInvoiced));

    let outcome = engine
        .on_document_uploaded("ev-1", "agreement-document", "user-1")
        .await
        .unwrap();
    assert!(outcome.advanced);
    assert_eq!(outcome.new_state_name.as_deref(), Some("Agreement"));

    let outcome = engine
        .on_document_uploaded("ev-1", "purchase-order-document", "user-1")
        .await
        .unwrap();
    assert!(outcome.advanced);

    // Re-upload of an earlier document: idempotent, nothing written.
    for _ in 0..2 {
        let outcome = engine
            .on_document_uploaded("ev-1", "agreement-document", "user-1")
            .await
            .unwrap();
        assert!(!outcome.advanced);
        assert_eq!(outcome.message, "already at an equal or later state");
    }

    // A closure document jumps the remaining states in one step.
    let outcome = engine
        .on_document_uploaded("ev-1", "closure-document", "user-1")
        .await
        .unwrap();
    assert!(outcome.advanced);
    assert_eq!(outcome.new_state_name.as_deref(), Some("Finalized"));

    let trail = engine.history("ev-1").await.unwrap();
    assert_eq!(trail.len(), 3);
    assert!(trail.iter().all(|e| e.action == AuditAction::Document));
}

#[tokio::test]
async fn insignificant_document_is_reported_as_informational() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-1", InvoicingStatus::NotInvoiced));

    let outcome = engine
        .on_document_uploaded("ev-1", "seating-plan", "user-1")
        .await
        .unwrap();
    assert!(!outcome.advanced);
    assert_eq!(outcome.message, "document received, no state change");
    assert!(engine.history("ev-1").await.unwrap().is_empty());
}

// ── The audit trail ─────────────────────────────────────────────────────────

#[tokio::test]
async fn every_transition_audits_actual_prior_and_new_state() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-1", InvoicingStatus::NotInvoiced));

    engine.transition("ev-1", "st-2", "user-1", None).await.unwrap();
    engine
        .on_document_uploaded("ev-1", "closure-document", "user-2")
        .await
        .unwrap();

    // Newest first: closure jump, then the manual step.
    let trail = engine.history("ev-1").await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(
        (trail[0].from_state_id.as_str(), trail[0].to_state_id.as_str()),
        ("st-2", "st-5")
    );
    assert_eq!(
        (trail[1].from_state_id.as_str(), trail[1].to_state_id.as_str()),
        ("st-1", "st-2")
    );
    assert_eq!(trail[0].actor_id, "user-2");
    assert_eq!(trail[1].actor_id, "user-1");
}

// ── Reconciliation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn fully_collected_record_reconciles_to_paid_once() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-5", InvoicingStatus::Invoiced));
    for i in 0..3 {
        store.seed_line_item(item(&format!("li-{i}"), "ev-1", true, true, None));
    }

    let recon = engine.calculate("ev-1", "system").await.unwrap();
    assert!(recon.applied);
    assert_eq!(recon.new_state_name.as_deref(), Some("Paid"));
    assert_eq!(store.get_record("ev-1").await.unwrap().state_id, "st-8");

    // Unchanged facts: re-running writes nothing and audits nothing.
    let recon = engine.calculate("ev-1", "system").await.unwrap();
    assert!(!recon.applied);
    let trail = engine.history("ev-1").await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, AuditAction::Reconciliation);
}

#[tokio::test]
async fn partially_invoiced_record_keeps_its_state() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-5", InvoicingStatus::NotInvoiced));
    store.seed_line_item(item("li-1", "ev-1", true, false, None));
    store.seed_line_item(item("li-2", "ev-1", false, false, None));

    let recon = engine.calculate("ev-1", "system").await.unwrap();
    assert_eq!(recon.outcome, None);
    assert!(!recon.applied);
    assert_eq!(store.get_record("ev-1").await.unwrap().state_id, "st-5");
    assert!(engine.history("ev-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn overdue_then_payment_completes_the_cycle() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-5", InvoicingStatus::Invoiced));
    store.seed_line_item(item("li-1", "ev-1", true, true, None));
    store.seed_line_item(item("li-2", "ev-1", true, false, Some("2026-07-01")));

    let recon = engine.calculate("ev-1", "system").await.unwrap();
    assert_eq!(recon.new_state_name.as_deref(), Some("Payments Overdue"));
    assert_eq!(recon.totals.overdue, 1);

    // Recording the outstanding payment re-reconciles automatically.
    let payment = PaymentDetails {
        paid_at: "2026-08-06T10:00:00Z".to_string(),
        method: Some("bank transfer".to_string()),
        reference: Some("TX-4711".to_string()),
    };
    let recon = engine.mark_as_paid("li-2", payment, "user-9").await.unwrap();
    assert!(recon.applied);
    assert_eq!(recon.new_state_name.as_deref(), Some("Paid"));

    let li = store.get_line_item("li-2").await.unwrap();
    assert!(li.collected);
    assert_eq!(li.payment_reference.as_deref(), Some("TX-4711"));

    let trail = engine.history("ev-1").await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].to_state_id, "st-8");
    assert_eq!(trail[1].to_state_id, "st-7");
}

#[tokio::test]
async fn payment_against_uninvoiced_item_is_rejected() {
    let store = seeded_store();
    let engine = engine_over(&store);
    store.seed_record(record("ev-1", "st-5", InvoicingStatus::NotInvoiced));
    store.seed_line_item(item("li-1", "ev-1", false, false, None));

    let payment = PaymentDetails {
        paid_at: "2026-08-06T10:00:00Z".to_string(),
        method: None,
        reference: None,
    };
    let err = engine
        .mark_as_paid("li-1", payment, "user-9")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::LineItemNotInvoiced { .. }));

    // The item is untouched and nothing was derived.
    assert!(!store.get_line_item("li-1").await.unwrap().collected);
    assert_eq!(store.get_record("ev-1").await.unwrap().state_id, "st-5");
}

#[tokio::test]
async fn paid_outcome_is_withheld_without_completed_invoicing() {
    let store = seeded_store();
    let engine = engine_over(&store);
    // Line items flagged collected, but the record was never invoiced.
    store.seed_record(record("ev-1", "st-5", InvoicingStatus::NotInvoiced));
    store.seed_line_item(item("li-1", "ev-1", true, true, None));

    let recon = engine.calculate("ev-1", "system").await.unwrap();
    assert_eq!(recon.outcome, Some(coda_types::AccountingStatus::Paid));
    assert!(!recon.applied);
    assert_eq!(store.get_record("ev-1").await.unwrap().state_id, "st-5");
}

// ── Batch recalculation ─────────────────────────────────────────────────────

/// Line-item store that fails for one poisoned record, to prove the batch
/// scan collects failures and continues.
struct FlakyLineItems {
    inner: Arc<MemoryStore>,
    poisoned_record: String,
}

#[async_trait]
impl LineItemStore for FlakyLineItems {
    async fn list_line_items(&self, record_id: &str) -> Result<Vec<LineItem>, StorageError> {
        if record_id == self.poisoned_record {
            return Err(StorageError::Backend("connection reset".to_string()));
        }
        self.inner.list_line_items(record_id).await
    }

    async fn get_line_item(&self, line_item_id: &str) -> Result<LineItem, StorageError> {
        self.inner.get_line_item(line_item_id).await
    }

    async fn apply_payment(
        &self,
        line_item_id: &str,
        payment: &PaymentDetails,
    ) -> Result<LineItem, StorageError> {
        self.inner.apply_payment(line_item_id, payment).await
    }
}

#[tokio::test]
async fn batch_recalculation_collects_failures_and_continues() {
    let store = seeded_store();
    // ev-a: finalized, fully collected -> shifts to Paid.
    store.seed_record(record("ev-a", "st-5", InvoicingStatus::Invoiced));
    store.seed_line_item(item("li-a1", "ev-a", true, true, None));
    // ev-b: poisoned line-item lookups -> reported as a failure.
    store.seed_record(record("ev-b", "st-5", InvoicingStatus::Invoiced));
    // ev-c: already in Payments Pending, an item has gone overdue -> shifts.
    store.seed_record(record("ev-c", "st-6", InvoicingStatus::Invoiced));
    store.seed_line_item(item("li-c1", "ev-c", true, false, Some("2026-07-15")));
    // ev-d: still mid-lifecycle; outside the scan entirely.
    store.seed_record(record("ev-d", "st-2", InvoicingStatus::NotInvoiced));

    let engine = WorkflowEngine::new(
        store.clone(),
        Arc::new(FlakyLineItems {
            inner: store.clone(),
            poisoned_record: "ev-b".to_string(),
        }),
        store.clone(),
        store.clone(),
        Arc::new(FixedClock::at("2026-08-06T09:30:00Z", TODAY)),
    );

    let report = engine.recalculate_all("system").await.unwrap();

    assert_eq!(report.shifts.len(), 2);
    let paid = report.shifts.iter().find(|s| s.record_id == "ev-a").unwrap();
    assert_eq!(paid.old_state_name, "Finalized");
    assert_eq!(paid.new_state_name, "Paid");
    let overdue = report.shifts.iter().find(|s| s.record_id == "ev-c").unwrap();
    assert_eq!(overdue.old_state_name, "Payments Pending");
    assert_eq!(overdue.new_state_name, "Payments Overdue");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].record_id, "ev-b");
    assert!(report.failures[0].error.contains("connection reset"));

    // The failure aborted only its own record.
    assert_eq!(store.get_record("ev-a").await.unwrap().state_id, "st-8");
    assert_eq!(store.get_record("ev-b").await.unwrap().state_id, "st-5");
    assert_eq!(store.get_record("ev-c").await.unwrap().state_id, "st-7");
    assert_eq!(store.get_record("ev-d").await.unwrap().state_id, "st-2");
}
