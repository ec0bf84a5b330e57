/// All errors that can be returned by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency control conflict: another writer committed a
    /// state change after this caller read the record. The expected version
    /// was not found.
    #[error("concurrent conflict on record {record_id}: expected version {expected_version}")]
    ConcurrentConflict {
        record_id: String,
        expected_version: i64,
    },

    /// Event record not found.
    #[error("record not found: {record_id}")]
    RecordNotFound { record_id: String },

    /// Financial line item not found.
    #[error("line item not found: {line_item_id}")]
    LineItemNotFound { line_item_id: String },

    /// A backend-specific storage error (DB connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
