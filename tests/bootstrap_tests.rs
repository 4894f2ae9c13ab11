use mirrorcache::entities::{Counterparty, Employee};
use mirrorcache::sync::initialize;
use mirrorcache::{
    BootstrapOutcome, EndpointConfig, EntityCache, FetchOptions, FileRecordStore,
    MemoryRemoteSource, PagePolicy,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn remote_employees(count: usize) -> MemoryRemoteSource {
    let remote = MemoryRemoteSource::new(2);
    remote.set_items(
        "employees",
        (1..=count)
            .map(|i| json!({"id": i, "name": format!("Employee {}", i)}))
            .collect(),
    );
    remote
}

#[tokio::test]
async fn bootstrap_twice_is_byte_identical() {
    let dir = tempdir().unwrap();
    let store = Arc::new(FileRecordStore::open(dir.path()).unwrap());
    let remote = remote_employees(5);
    let endpoint = EndpointConfig::new("employees", "employees");

    let mut cache = EntityCache::<Employee>::open(store.clone()).unwrap();
    let first = initialize(&mut cache, &remote, &endpoint, &FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(first, BootstrapOutcome::Seeded { count: 5 });
    let bytes = std::fs::read(store.path_for("employees")).unwrap();

    // A fresh process sees the seeded file and must not fetch again.
    remote.set_items("employees", vec![json!({"id": 99, "name": "Late"})]);
    let mut reopened = EntityCache::<Employee>::open(store.clone()).unwrap();
    let second = initialize(&mut reopened, &remote, &endpoint, &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(second, BootstrapOutcome::AlreadySeeded { count: 5 });
    assert_eq!(std::fs::read(store.path_for("employees")).unwrap(), bytes);
    assert_eq!(remote.requested_pages("employees"), vec![1, 2, 3]);
}

#[tokio::test]
async fn seeded_cache_survives_reopen_in_remote_order() {
    let dir = tempdir().unwrap();
    let store = Arc::new(FileRecordStore::open(dir.path()).unwrap());
    let remote = MemoryRemoteSource::new(2);
    remote.set_items(
        "counterparties",
        vec![
            json!({"id": "c3", "name": "Third", "taxId": "300"}),
            json!({"id": "c1", "name": "First"}),
            json!({"id": "c2", "name": "Second"}),
        ],
    );
    let endpoint = EndpointConfig::new("counterparties", "counterparties").total_pages("pages");

    let mut cache = EntityCache::<Counterparty>::open(store.clone()).unwrap();
    initialize(&mut cache, &remote, &endpoint, &FetchOptions::default())
        .await
        .unwrap();

    let reopened = EntityCache::<Counterparty>::open(store).unwrap();
    assert_eq!(reopened.ids(), vec!["c3", "c1", "c2"]);
    assert_eq!(reopened.get("c3").unwrap().tax_id.as_deref(), Some("300"));
}

#[tokio::test]
async fn aborted_bootstrap_writes_no_partial_file() {
    let dir = tempdir().unwrap();
    let store = Arc::new(FileRecordStore::open(dir.path()).unwrap());
    let remote = remote_employees(6);
    remote.fail_page("employees", 3);
    let endpoint = EndpointConfig::new("employees", "employees");

    let mut cache = EntityCache::<Employee>::open(store.clone()).unwrap();
    let options = FetchOptions::default().with_policy(PagePolicy::Abort);
    assert!(initialize(&mut cache, &remote, &endpoint, &options).await.is_err());

    let reopened = EntityCache::<Employee>::open(store).unwrap();
    assert!(reopened.is_empty());

    // Once the remote recovers, a retry seeds everything.
    remote.clear_failures();
    let outcome = initialize(&mut cache, &remote, &endpoint, &options)
        .await
        .unwrap();
    assert_eq!(outcome, BootstrapOutcome::Seeded { count: 6 });
}
