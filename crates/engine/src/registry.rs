//! Ordered workflow state registry.
//!
//! Loads the administratively managed state configuration once and caches
//! it; all lookups are pure reads against the cached snapshot. The cache
//! is dropped explicitly via [`StateRegistry::invalidate`] whenever the
//! configuration changes; staleness beyond one invalidation cycle is the
//! only accepted inconsistency.

use std::sync::{Arc, RwLock};

use coda_storage::StateConfigStore;
use coda_types::{StateRole, WorkflowState};

use crate::error::EngineError;

struct Snapshot {
    all: Vec<WorkflowState>,
    /// Workflow steps only (`workflow_step != 0`), ascending by position.
    ordered: Vec<WorkflowState>,
}

/// Cached, ordered view of the workflow state configuration.
pub struct StateRegistry {
    config: Arc<dyn StateConfigStore>,
    cache: RwLock<Option<Arc<Snapshot>>>,
}

impl StateRegistry {
    pub fn new(config: Arc<dyn StateConfigStore>) -> Self {
        Self {
            config,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached configuration; the next lookup reloads it.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.write() {
            *cache = None;
        }
    }

    async fn snapshot(&self) -> Result<Arc<Snapshot>, EngineError> {
        if let Some(snapshot) = self
            .cache
            .read()
            .map_err(|_| poisoned())?
            .as_ref()
            .cloned()
        {
            return Ok(snapshot);
        }

        let all = self.config.list_states().await?;
        let mut ordered: Vec<WorkflowState> = all
            .iter()
            .filter(|s| s.is_workflow_step())
            .cloned()
            .collect();
        ordered.sort_by_key(|s| s.position);

        // Ordering invariant: exactly one workflow step per position.
        for pair in ordered.windows(2) {
            if pair[0].position == pair[1].position {
                return Err(EngineError::InvalidStateConfig {
                    message: format!(
                        "states '{}' and '{}' share position {}",
                        pair[0].name, pair[1].name, pair[0].position
                    ),
                });
            }
        }

        let snapshot = Arc::new(Snapshot { all, ordered });
        // Two concurrent loaders may both store; last wins, contents equal.
        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(snapshot.clone());
        }
        Ok(snapshot)
    }

    /// All states in the advancing sequence, ascending by position.
    pub async fn list_states(&self) -> Result<Vec<WorkflowState>, EngineError> {
        Ok(self.snapshot().await?.ordered.clone())
    }

    /// Look up any configured state by id, pseudo-states included.
    pub async fn get_state(&self, state_id: &str) -> Result<WorkflowState, EngineError> {
        let snapshot = self.snapshot().await?;
        snapshot
            .all
            .iter()
            .find(|s| s.id == state_id)
            .cloned()
            .ok_or_else(|| EngineError::StateNotFound {
                state_id: state_id.to_string(),
            })
    }

    /// The state one step after the given one in the advancing sequence.
    ///
    /// Positions may be sparse, so "one step" is positional in the sorted
    /// sequence, not `position + 1` arithmetic. Returns `None` for the
    /// last state and for pseudo-states, which have no place in the
    /// sequence.
    pub async fn next_state(&self, state_id: &str) -> Result<Option<WorkflowState>, EngineError> {
        let snapshot = self.snapshot().await?;
        let idx = match sequence_index(&snapshot, state_id)? {
            Some(idx) => idx,
            None => return Ok(None),
        };
        Ok(snapshot.ordered.get(idx + 1).cloned())
    }

    /// The state one step before the given one in the advancing sequence.
    pub async fn previous_state(
        &self,
        state_id: &str,
    ) -> Result<Option<WorkflowState>, EngineError> {
        let snapshot = self.snapshot().await?;
        let idx = match sequence_index(&snapshot, state_id)? {
            Some(idx) => idx,
            None => return Ok(None),
        };
        Ok(idx.checked_sub(1).and_then(|i| snapshot.ordered.get(i)).cloned())
    }

    /// Resolve the state carrying the given role.
    ///
    /// Used to route documents and reconciliation outcomes to their target
    /// states; a missing role is a configuration error.
    pub async fn state_for_role(&self, role: StateRole) -> Result<WorkflowState, EngineError> {
        let snapshot = self.snapshot().await?;
        snapshot
            .ordered
            .iter()
            .find(|s| s.role == role)
            .cloned()
            .ok_or(EngineError::RoleNotConfigured { role })
    }
}

/// Index of a state in the ordered sequence. `Ok(None)` for a configured
/// pseudo-state; `Err(StateNotFound)` for an unknown id.
fn sequence_index(snapshot: &Snapshot, state_id: &str) -> Result<Option<usize>, EngineError> {
    if let Some(idx) = snapshot.ordered.iter().position(|s| s.id == state_id) {
        return Ok(Some(idx));
    }
    if snapshot.all.iter().any(|s| s.id == state_id) {
        return Ok(None);
    }
    Err(EngineError::StateNotFound {
        state_id: state_id.to_string(),
    })
}

fn poisoned() -> EngineError {
    EngineError::InvalidStateConfig {
        message: "state cache lock poisoned".to_string(),
    }
}
