use async_trait::async_trait;

use coda_types::{
    AuditEntry, EventRecord, InvoicingStatus, LineItem, PaymentDetails, WorkflowState,
};

use crate::error::StorageError;

/// Access to event records, the primary business entities whose lifecycle
/// the engine governs.
///
/// ## OCC Conflict Detection
///
/// `update_record_state` performs an optimistic concurrency check:
/// `UPDATE WHERE version = expected_version`. If zero rows are affected,
/// the method returns `Err(StorageError::ConcurrentConflict { ... })` and
/// the stored state is unchanged. Callers re-read and decide whether to
/// retry; the store never resolves a conflict by overwriting.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so they can be shared
/// across async task boundaries behind `Arc`.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Read a record's current state, invoicing status, and version.
    ///
    /// Returns `Err(StorageError::RecordNotFound)` if the record does not exist.
    async fn get_record(&self, record_id: &str) -> Result<EventRecord, StorageError>;

    /// Apply a version-validated update to a record's workflow state.
    ///
    /// Returns the new version number on success.
    async fn update_record_state(
        &self,
        record_id: &str,
        expected_version: i64,
        new_state_id: &str,
    ) -> Result<i64, StorageError>;

    /// Set the record's invoicing status. Not version-checked: the status
    /// is owned by the invoicing module and has no ordering relationship
    /// with state writes.
    async fn set_invoicing_status(
        &self,
        record_id: &str,
        status: InvoicingStatus,
    ) -> Result<(), StorageError>;

    /// List all records currently in any of the given states.
    async fn list_records_in_states(
        &self,
        state_ids: &[String],
    ) -> Result<Vec<EventRecord>, StorageError>;
}

/// Read access to financial line items, plus the single narrow write the
/// reconciliation engine is allowed: recording a collected payment.
#[async_trait]
pub trait LineItemStore: Send + Sync + 'static {
    /// List all line items attached to a record. A record with no line
    /// items yields an empty list, not an error.
    async fn list_line_items(&self, record_id: &str) -> Result<Vec<LineItem>, StorageError>;

    /// Returns `Err(StorageError::LineItemNotFound)` if the item does not exist.
    async fn get_line_item(&self, line_item_id: &str) -> Result<LineItem, StorageError>;

    /// Mark a line item collected and attach the payment metadata.
    /// Returns the updated item.
    async fn apply_payment(
        &self,
        line_item_id: &str,
        payment: &PaymentDetails,
    ) -> Result<LineItem, StorageError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditStore: Send + Sync + 'static {
    /// Append one entry. Entries are immutable once appended; the store
    /// exposes no update or delete.
    async fn append(&self, entry: AuditEntry) -> Result<(), StorageError>;

    /// List a record's audit entries, newest first.
    async fn list_by_record(&self, record_id: &str) -> Result<Vec<AuditEntry>, StorageError>;
}

/// Read access to the administratively managed workflow state configuration.
///
/// The engine never creates or deletes states. Ordering and filtering of
/// the returned list is the registry's job, not the store's.
#[async_trait]
pub trait StateConfigStore: Send + Sync + 'static {
    async fn list_states(&self) -> Result<Vec<WorkflowState>, StorageError>;
}
