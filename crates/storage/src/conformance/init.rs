use std::future::Future;

use coda_types::InvoicingStatus;

use super::{make_line_item, make_record, make_state, Backend, TestResult};
use crate::StorageError;

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "init",
        "seeded_record_round_trips",
        seeded_record_round_trips(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "missing_record_is_not_found",
        missing_record_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "missing_line_item_is_not_found",
        missing_line_item_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "record_without_line_items_lists_empty",
        record_without_line_items_lists_empty(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "list_records_filters_by_state",
        list_records_filters_by_state(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "seeded_states_are_listed",
        seeded_states_are_listed(factory).await,
    ));

    results
}

async fn seeded_record_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store.fixture_record(make_record("ev-1", "st-1")).await;

    let rec = store
        .get_record("ev-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.id != "ev-1" || rec.state_id != "st-1" {
        return Err(format!("unexpected record {rec:?}"));
    }
    if rec.version != 0 || rec.invoicing_status != InvoicingStatus::NotInvoiced {
        return Err(format!("unexpected version/status {rec:?}"));
    }
    Ok(())
}

async fn missing_record_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store.get_record("ev-404").await {
        Err(StorageError::RecordNotFound { record_id }) if record_id == "ev-404" => Ok(()),
        Err(e) => Err(format!("wrong error: {e}")),
        Ok(r) => Err(format!("expected error, got {r:?}")),
    }
}

async fn missing_line_item_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store.get_line_item("li-404").await {
        Err(StorageError::LineItemNotFound { line_item_id }) if line_item_id == "li-404" => Ok(()),
        Err(e) => Err(format!("wrong error: {e}")),
        Ok(li) => Err(format!("expected error, got {li:?}")),
    }
}

async fn record_without_line_items_lists_empty<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store.fixture_record(make_record("ev-1", "st-1")).await;

    let items = store
        .list_line_items("ev-1")
        .await
        .map_err(|e| format!("list: {e}"))?;
    if !items.is_empty() {
        return Err(format!("expected no items, got {}", items.len()));
    }
    Ok(())
}

async fn list_records_filters_by_state<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store.fixture_record(make_record("ev-1", "st-1")).await;
    store.fixture_record(make_record("ev-2", "st-2")).await;
    store.fixture_record(make_record("ev-3", "st-2")).await;
    store.fixture_line_item(make_line_item("li-1", "ev-1")).await;

    let in_st2 = store
        .list_records_in_states(&["st-2".to_string()])
        .await
        .map_err(|e| format!("list st-2: {e}"))?;
    if in_st2.len() != 2 || in_st2.iter().any(|r| r.state_id != "st-2") {
        return Err(format!("st-2 filter returned {in_st2:?}"));
    }

    let in_both = store
        .list_records_in_states(&["st-1".to_string(), "st-2".to_string()])
        .await
        .map_err(|e| format!("list both: {e}"))?;
    if in_both.len() != 3 {
        return Err(format!("expected 3 records, got {}", in_both.len()));
    }

    let in_none = store
        .list_records_in_states(&["st-9".to_string()])
        .await
        .map_err(|e| format!("list st-9: {e}"))?;
    if !in_none.is_empty() {
        return Err(format!("st-9 filter returned {in_none:?}"));
    }
    Ok(())
}

async fn seeded_states_are_listed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Backend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store.fixture_state(make_state("st-1", "Enquiry", 1)).await;
    store.fixture_state(make_state("st-2", "Agreement", 2)).await;

    let states = store
        .list_states()
        .await
        .map_err(|e| format!("list_states: {e}"))?;
    if states.len() != 2 {
        return Err(format!("expected 2 states, got {}", states.len()));
    }
    if !states.iter().any(|s| s.id == "st-1" && s.name == "Enquiry") {
        return Err("st-1 missing from listing".to_string());
    }
    Ok(())
}
