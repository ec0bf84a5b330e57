use std::future::Future;
use std::sync::Arc;

use super::{make_record, Backend, TestResult};
use crate::StorageError;

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_updates_exactly_one_wins",
        concurrent_updates_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_updates_distinct_records_all_succeed",
        concurrent_updates_distinct_records_all_succeed(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "final_state_belongs_to_the_winner",
        final_state_belongs_to_the_winner(factory).await,
    ));

    results
}

// ── Same record: exactly one wins ───────────────────────────────────────────

/// N tasks race to update the same record from version 0. Exactly one
/// succeeds; the rest must get ConcurrentConflict. This exercises real
/// concurrency: `tokio::spawn` tasks race against the version check.
async fn concurrent_updates_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    store.fixture_record(make_record("ev-1", "st-1")).await;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.update_record_state("ev-1", 0, &format!("st-target-{i}")).await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.map_err(|e| format!("join: {e}"))? {
            Ok(_) => wins += 1,
            Err(StorageError::ConcurrentConflict { .. }) => conflicts += 1,
            Err(e) => return Err(format!("unexpected error: {e}")),
        }
    }

    if wins != 1 {
        return Err(format!("expected exactly 1 winner, got {wins}"));
    }
    if conflicts != N - 1 {
        return Err(format!("expected {} conflicts, got {conflicts}", N - 1));
    }
    Ok(())
}

// ── Distinct records: no false conflicts ────────────────────────────────────

async fn concurrent_updates_distinct_records_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    for i in 0..N {
        store.fixture_record(make_record(&format!("ev-{i}"), "st-1")).await;
    }

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.update_record_state(&format!("ev-{i}"), 0, "st-2").await
        }));
    }

    for handle in handles {
        match handle.await.map_err(|e| format!("join: {e}"))? {
            Ok(1) => {}
            Ok(v) => return Err(format!("expected version 1, got {v}")),
            Err(e) => return Err(format!("update failed: {e}")),
        }
    }
    Ok(())
}

// ── Post-race consistency ───────────────────────────────────────────────────

/// After the race, the stored state must be the winner's target and the
/// version must reflect exactly one committed write.
async fn final_state_belongs_to_the_winner<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    store.fixture_record(make_record("ev-1", "st-1")).await;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        let target = format!("st-target-{i}");
        handles.push(tokio::spawn(async move {
            s.update_record_state("ev-1", 0, &target)
                .await
                .map(|_| target)
        }));
    }

    let mut winner_target = None;
    for handle in handles {
        if let Ok(target) = handle.await.map_err(|e| format!("join: {e}"))? {
            if winner_target.replace(target).is_some() {
                return Err("more than one writer won the race".to_string());
            }
        }
    }
    let winner_target = winner_target.ok_or_else(|| "no writer won the race".to_string())?;

    let rec = store
        .get_record("ev-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.state_id != winner_target {
        return Err(format!(
            "stored state {} is not the winner's target {winner_target}",
            rec.state_id
        ));
    }
    if rec.version != 1 {
        return Err(format!("expected version 1 after one win, got {}", rec.version));
    }
    Ok(())
}
