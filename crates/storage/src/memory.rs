//! In-memory backend over shared mutable maps.
//!
//! Used by the engine's tests and as the reference implementation for the
//! conformance suite. Single-process only: the optimistic version check is
//! enforced under one mutex, which is exactly the semantics a database
//! backend provides with `UPDATE ... WHERE version = $expected`.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use coda_types::{
    AuditEntry, EventRecord, InvoicingStatus, LineItem, PaymentDetails, WorkflowState,
};

use crate::error::StorageError;
use crate::traits::{AuditStore, LineItemStore, RecordStore, StateConfigStore};

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, EventRecord>,
    line_items: BTreeMap<String, LineItem>,
    audit: Vec<AuditEntry>,
    states: Vec<WorkflowState>,
}

/// In-memory implementation of all four store traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }

    // ── Seeding (test fixture surface) ──────────────────────────────────

    /// Insert or replace a workflow state in the configuration.
    pub fn seed_state(&self, state: WorkflowState) {
        if let Ok(mut inner) = self.lock() {
            inner.states.retain(|s| s.id != state.id);
            inner.states.push(state);
        }
    }

    /// Insert or replace an event record.
    pub fn seed_record(&self, record: EventRecord) {
        if let Ok(mut inner) = self.lock() {
            inner.records.insert(record.id.clone(), record);
        }
    }

    /// Insert or replace a line item.
    pub fn seed_line_item(&self, item: LineItem) {
        if let Ok(mut inner) = self.lock() {
            inner.line_items.insert(item.id.clone(), item);
        }
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(&self, record_id: &str) -> Result<EventRecord, StorageError> {
        let inner = self.lock()?;
        inner
            .records
            .get(record_id)
            .cloned()
            .ok_or_else(|| StorageError::RecordNotFound {
                record_id: record_id.to_string(),
            })
    }

    async fn update_record_state(
        &self,
        record_id: &str,
        expected_version: i64,
        new_state_id: &str,
    ) -> Result<i64, StorageError> {
        let mut inner = self.lock()?;
        let record =
            inner
                .records
                .get_mut(record_id)
                .ok_or_else(|| StorageError::RecordNotFound {
                    record_id: record_id.to_string(),
                })?;
        if record.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                record_id: record_id.to_string(),
                expected_version,
            });
        }
        record.state_id = new_state_id.to_string();
        record.version += 1;
        record.updated_at = now_rfc3339();
        Ok(record.version)
    }

    async fn set_invoicing_status(
        &self,
        record_id: &str,
        status: InvoicingStatus,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let record =
            inner
                .records
                .get_mut(record_id)
                .ok_or_else(|| StorageError::RecordNotFound {
                    record_id: record_id.to_string(),
                })?;
        record.invoicing_status = status;
        Ok(())
    }

    async fn list_records_in_states(
        &self,
        state_ids: &[String],
    ) -> Result<Vec<EventRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .values()
            .filter(|r| state_ids.contains(&r.state_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LineItemStore for MemoryStore {
    async fn list_line_items(&self, record_id: &str) -> Result<Vec<LineItem>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .line_items
            .values()
            .filter(|li| li.record_id == record_id)
            .cloned()
            .collect())
    }

    async fn get_line_item(&self, line_item_id: &str) -> Result<LineItem, StorageError> {
        let inner = self.lock()?;
        inner
            .line_items
            .get(line_item_id)
            .cloned()
            .ok_or_else(|| StorageError::LineItemNotFound {
                line_item_id: line_item_id.to_string(),
            })
    }

    async fn apply_payment(
        &self,
        line_item_id: &str,
        payment: &PaymentDetails,
    ) -> Result<LineItem, StorageError> {
        let mut inner = self.lock()?;
        let item =
            inner
                .line_items
                .get_mut(line_item_id)
                .ok_or_else(|| StorageError::LineItemNotFound {
                    line_item_id: line_item_id.to_string(),
                })?;
        item.collected = true;
        item.paid_at = Some(payment.paid_at.clone());
        item.payment_method = payment.method.clone();
        item.payment_reference = payment.reference.clone();
        Ok(item.clone())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        inner.audit.push(entry);
        Ok(())
    }

    async fn list_by_record(&self, record_id: &str) -> Result<Vec<AuditEntry>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .audit
            .iter()
            .filter(|e| e.record_id == record_id)
            .rev()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StateConfigStore for MemoryStore {
    async fn list_states(&self) -> Result<Vec<WorkflowState>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.states.clone())
    }
}

#[async_trait]
impl crate::conformance::Fixture for MemoryStore {
    async fn fixture_state(&self, state: WorkflowState) {
        self.seed_state(state);
    }

    async fn fixture_record(&self, record: EventRecord) {
        self.seed_record(record);
    }

    async fn fixture_line_item(&self, item: LineItem) {
        self.seed_line_item(item);
    }
}
