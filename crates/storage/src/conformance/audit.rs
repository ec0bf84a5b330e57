use std::future::Future;

use super::{make_audit_entry, Backend, TestResult};

pub(super) async fn run_audit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "audit",
        "appended_entry_round_trips",
        appended_entry_round_trips(factory).await,
    ));
    results.push(TestResult::from_result(
        "audit",
        "listing_is_newest_first",
        listing_is_newest_first(factory).await,
    ));
    results.push(TestResult::from_result(
        "audit",
        "unknown_record_lists_empty",
        unknown_record_lists_empty(factory).await,
    ));
    results.push(TestResult::from_result(
        "audit",
        "entries_are_isolated_by_record",
        entries_are_isolated_by_record(factory).await,
    ));

    results
}

async fn appended_entry_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let entry = make_audit_entry("ev-1", "st-1", "st-2", 0);
    store
        .append(entry.clone())
        .await
        .map_err(|e| format!("append: {e}"))?;

    let listed = store
        .list_by_record("ev-1")
        .await
        .map_err(|e| format!("list: {e}"))?;
    if listed.len() != 1 {
        return Err(format!("expected 1 entry, got {}", listed.len()));
    }
    if listed[0] != entry {
        return Err(format!("entry mutated in storage: {:?}", listed[0]));
    }
    Ok(())
}

async fn listing_is_newest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    for seq in 0..3 {
        store
            .append(make_audit_entry("ev-1", "st-1", "st-2", seq))
            .await
            .map_err(|e| format!("append {seq}: {e}"))?;
    }

    let listed = store
        .list_by_record("ev-1")
        .await
        .map_err(|e| format!("list: {e}"))?;
    let ids: Vec<&str> = listed.iter().map(|e| e.id.as_str()).collect();
    if ids != ["audit-ev-1-2", "audit-ev-1-1", "audit-ev-1-0"] {
        return Err(format!("unexpected ordering: {ids:?}"));
    }
    Ok(())
}

async fn unknown_record_lists_empty<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let listed = store
        .list_by_record("ev-404")
        .await
        .map_err(|e| format!("list: {e}"))?;
    if !listed.is_empty() {
        return Err(format!("expected empty trail, got {}", listed.len()));
    }
    Ok(())
}

async fn entries_are_isolated_by_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .append(make_audit_entry("ev-1", "st-1", "st-2", 0))
        .await
        .map_err(|e| format!("append ev-1: {e}"))?;
    store
        .append(make_audit_entry("ev-2", "st-1", "st-3", 1))
        .await
        .map_err(|e| format!("append ev-2: {e}"))?;

    let listed = store
        .list_by_record("ev-1")
        .await
        .map_err(|e| format!("list: {e}"))?;
    if listed.len() != 1 || listed[0].record_id != "ev-1" {
        return Err(format!("cross-record leakage: {listed:?}"));
    }
    Ok(())
}
