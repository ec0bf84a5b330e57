use coda_storage::StorageError;
use coda_types::StateRole;

/// Errors produced by the workflow engine.
///
/// Business-rule rejections carry every violation found, not just the
/// first, so callers can render the complete list. Store failures pass
/// through unchanged; retry policy belongs to the transport layer, not
/// the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A state id with no matching configured state. A configuration
    /// error, never silently defaulted.
    #[error("workflow state not found: {state_id}")]
    StateNotFound { state_id: String },

    /// No configured state carries the given role. Configuration error.
    #[error("no workflow state configured for role {role:?}")]
    RoleNotConfigured { role: StateRole },

    /// The state configuration violates the ordering invariant.
    #[error("invalid workflow state configuration: {message}")]
    InvalidStateConfig { message: String },

    /// A manual transition failed one or more business-rule checks.
    #[error("transition rejected: {}", violations.join("; "))]
    TransitionRejected { violations: Vec<String> },

    /// Payment recorded against a line item that was never invoiced.
    #[error("line item {line_item_id} has not been invoiced")]
    LineItemNotInvoiced { line_item_id: String },

    /// A store collaborator failed; aborts the operation in progress only.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
