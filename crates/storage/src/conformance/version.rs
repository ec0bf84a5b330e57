use std::future::Future;

use super::{make_record, Backend, TestResult};
use crate::StorageError;

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "version",
        "update_with_matching_version_succeeds",
        update_with_matching_version_succeeds(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "version_increments_sequentially",
        version_increments_sequentially(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "stale_version_returns_conflict",
        stale_version_returns_conflict(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "conflict_leaves_record_unchanged",
        conflict_leaves_record_unchanged(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "stale_writer_loses_after_intervening_update",
        stale_writer_loses_after_intervening_update(factory).await,
    ));

    results
}

async fn update_with_matching_version_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store.fixture_record(make_record("ev-1", "st-1")).await;

    let v = store
        .update_record_state("ev-1", 0, "st-2")
        .await
        .map_err(|e| format!("update: {e}"))?;
    if v != 1 {
        return Err(format!("expected new version 1, got {v}"));
    }
    let rec = store
        .get_record("ev-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.state_id != "st-2" || rec.version != 1 {
        return Err(format!("unexpected record after update: {rec:?}"));
    }
    Ok(())
}

async fn version_increments_sequentially<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store.fixture_record(make_record("ev-1", "st-1")).await;

    for (expected, target) in [(0, "st-2"), (1, "st-3"), (2, "st-4")] {
        let v = store
            .update_record_state("ev-1", expected, target)
            .await
            .map_err(|e| format!("update from {expected}: {e}"))?;
        if v != expected + 1 {
            return Err(format!("expected version {}, got {v}", expected + 1));
        }
    }
    Ok(())
}

async fn stale_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store.fixture_record(make_record("ev-1", "st-1")).await;

    match store.update_record_state("ev-1", 5, "st-2").await {
        Err(StorageError::ConcurrentConflict {
            record_id,
            expected_version,
        }) => {
            if record_id != "ev-1" {
                return Err(format!("conflict names wrong record: {record_id}"));
            }
            if expected_version != 5 {
                return Err(format!("conflict names wrong version: {expected_version}"));
            }
            Ok(())
        }
        Err(e) => Err(format!("wrong error: {e}")),
        Ok(v) => Err(format!("expected conflict, got version {v}")),
    }
}

async fn conflict_leaves_record_unchanged<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store.fixture_record(make_record("ev-1", "st-1")).await;

    let _ = store.update_record_state("ev-1", 3, "st-2").await;

    let rec = store
        .get_record("ev-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.state_id != "st-1" || rec.version != 0 {
        return Err(format!("record mutated by failed update: {rec:?}"));
    }
    Ok(())
}

/// Writer A reads version 0; writer B commits first; A's conditioned write
/// must fail rather than overwrite B's state.
async fn stale_writer_loses_after_intervening_update<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store.fixture_record(make_record("ev-1", "st-1")).await;

    // Writer B commits from the same version A read.
    store
        .update_record_state("ev-1", 0, "st-3")
        .await
        .map_err(|e| format!("writer B: {e}"))?;

    // Writer A still holds expected_version = 0.
    match store.update_record_state("ev-1", 0, "st-2").await {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        Err(e) => return Err(format!("wrong error: {e}")),
        Ok(v) => return Err(format!("stale writer won with version {v}")),
    }

    let rec = store
        .get_record("ev-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.state_id != "st-3" {
        return Err(format!("winner's state lost: {rec:?}"));
    }
    Ok(())
}
