//! Workflow state configuration types.

use serde::{Deserialize, Serialize};

/// Stable machine-readable tag on a workflow state.
///
/// Business gates and document routing key on the role, never on the
/// display name: renaming a state in the configuration must not change
/// engine behavior. States with no special semantics carry `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateRole {
    /// No gate or routing significance.
    General,
    /// Target of an uploaded agreement document.
    Agreement,
    /// Target of an uploaded purchase order document.
    PurchaseOrder,
    /// Entry requires at least one financial line item.
    Invoiced,
    /// Terminal operational state; target of a closure document and the
    /// scan filter for batch reconciliation.
    Finalized,
    /// Derived accounting state: every line item invoiced and collected.
    Paid,
    /// Derived accounting state: at least one invoiced item past due.
    PaymentsOverdue,
    /// Derived accounting state: invoiced in full, collection outstanding.
    PaymentsPending,
}

/// One step in the fixed linear workflow.
///
/// States are configuration data, created and edited administratively;
/// the engine only reads them. `position` is the strict total order:
/// unique among workflow states, monotonic, possibly sparse. A
/// `workflow_step` of `0` marks a pseudo-state (e.g. a cancellation
/// bucket) that is not part of the advancing sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    /// Display name. Presentation only, never used for dispatch.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub position: i64,
    /// Display color for the UI, e.g. `"#2d7ff9"`.
    #[serde(default)]
    pub color: Option<String>,
    /// `0` excludes the state from the advancing sequence.
    #[serde(default = "default_workflow_step")]
    pub workflow_step: i64,
    #[serde(default = "default_role")]
    pub role: StateRole,
}

fn default_workflow_step() -> i64 {
    1
}

fn default_role() -> StateRole {
    StateRole::General
}

impl WorkflowState {
    /// Whether this state participates in the advancing sequence.
    pub fn is_workflow_step(&self) -> bool {
        self.workflow_step != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&StateRole::PaymentsOverdue).unwrap();
        assert_eq!(json, "\"payments_overdue\"");
    }

    #[test]
    fn state_defaults_on_deserialize() {
        let state: WorkflowState = serde_json::from_str(
            r#"{"id": "st-1", "name": "Enquiry", "position": 1}"#,
        )
        .unwrap();
        assert_eq!(state.workflow_step, 1);
        assert_eq!(state.role, StateRole::General);
        assert!(state.is_workflow_step());
    }

    #[test]
    fn pseudo_state_is_not_a_workflow_step() {
        let state: WorkflowState = serde_json::from_str(
            r#"{"id": "st-x", "name": "Cancelled", "position": 99, "workflow_step": 0}"#,
        )
        .unwrap();
        assert!(!state.is_workflow_step());
    }
}
