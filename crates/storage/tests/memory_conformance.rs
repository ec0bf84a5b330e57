//! Runs the backend conformance suite against the in-memory store.

use coda_storage::conformance::run_conformance_suite;
use coda_storage::MemoryStore;

#[tokio::test]
async fn memory_store_passes_conformance() {
    let report = run_conformance_suite(|| async { MemoryStore::new() }).await;
    assert_eq!(report.failed, 0, "{report}");
}
