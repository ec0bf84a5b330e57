//! Conformance test suite for coda store backends.
//!
//! This module provides a backend-agnostic test suite that any
//! implementation of the four store traits can run to verify correctness.
//! The suite covers:
//!
//! - **Initialization**: seeded data round-trips, missing-id errors,
//!   state filtering on record listing
//! - **Version validation / OCC**: version increments, stale-version
//!   conflict detection, conflict leaves stored data untouched
//! - **Concurrency**: `tokio::spawn` races where exactly one same-version
//!   writer may win
//! - **Audit trail**: append-only semantics, newest-first listing,
//!   per-record isolation
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function
//! that creates a fresh, empty backend for each test:
//!
//! ```ignore
//! use coda_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn postgres_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_postgres_backend().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod audit;
mod concurrent;
mod init;
mod version;

use std::fmt;
use std::future::Future;

use async_trait::async_trait;

use coda_types::{AuditAction, AuditEntry, EventRecord, InvoicingStatus, LineItem, WorkflowState};

use crate::traits::{AuditStore, LineItemStore, RecordStore, StateConfigStore};

/// Seeding surface a backend exposes so the suite can install fixtures.
///
/// Production code never seeds; records, line items, and states are
/// created by external ERP modules. Test backends implement this trait to
/// stand in for those modules.
#[async_trait]
pub trait Fixture {
    async fn fixture_state(&self, state: WorkflowState);
    async fn fixture_record(&self, record: EventRecord);
    async fn fixture_line_item(&self, item: LineItem);
}

/// A backend implementing every store trait plus the test fixture surface.
pub trait Backend: RecordStore + LineItemStore + AuditStore + StateConfigStore + Fixture {}

impl<T> Backend for T where T: RecordStore + LineItemStore + AuditStore + StateConfigStore + Fixture
{}

// ── Results ─────────────────────────────────────────────────────────────────

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "init", "version", "concurrent", "audit").
    pub category: String,
    /// Test name (e.g. "stale_version_returns_conflict").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a store backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// backend, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);
    results.extend(audit::run_audit_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: fixture constructors with sensible defaults ────────────────────

fn make_state(id: &str, name: &str, position: i64) -> WorkflowState {
    WorkflowState {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        position,
        color: None,
        workflow_step: 1,
        role: coda_types::StateRole::General,
    }
}

fn make_record(id: &str, state_id: &str) -> EventRecord {
    EventRecord {
        id: id.to_string(),
        state_id: state_id.to_string(),
        invoicing_status: InvoicingStatus::NotInvoiced,
        version: 0,
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

fn make_line_item(id: &str, record_id: &str) -> LineItem {
    LineItem {
        id: id.to_string(),
        record_id: record_id.to_string(),
        description: "venue hire".to_string(),
        amount: "1500.00".parse().unwrap_or_default(),
        invoiced: false,
        collected: false,
        payment_due_date: None,
        paid_at: None,
        payment_method: None,
        payment_reference: None,
    }
}

fn make_audit_entry(record_id: &str, from: &str, to: &str, seq: usize) -> AuditEntry {
    AuditEntry {
        id: format!("audit-{record_id}-{seq}"),
        record_id: record_id.to_string(),
        actor_id: "user-1".to_string(),
        action: AuditAction::Manual,
        from_state_id: from.to_string(),
        to_state_id: to.to_string(),
        note: None,
        occurred_at: format!("2026-01-01T00:00:{seq:02}Z"),
    }
}
