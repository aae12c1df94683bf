#![forbid(unsafe_code)]

use std::sync::Arc;

use sift_core::{AppliedFilter, Comparator, FilterKeyConfig, FilterValue, ValueType};
use sift_persist::{KvStorage, MemoryStorage, RouteId, SavedFilterStore, SqliteStorage};

fn namespace_filter(value: &str) -> AppliedFilter {
    let cfg = FilterKeyConfig::new("namespace", "Namespace", &[Comparator::In], ValueType::MultiSelect);
    AppliedFilter::create(&cfg, "namespace", None, FilterValue::list([value])).unwrap()
}

#[test]
fn crud_persists_across_stores() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sift.db");
    let storage: Arc<dyn KvStorage> = Arc::new(SqliteStorage::open(path.to_str().unwrap()).unwrap());
    let route = RouteId::named("executions/list");

    let mut store = SavedFilterStore::new(storage.clone(), "executions", &route);
    assert!(store.saved_filters().is_empty());
    let prod = store.save_filter("prod", "production only", &[namespace_filter("prod")], Some("failed")).unwrap();
    let dev = store.save_filter("dev", "", &[namespace_filter("dev")], None).unwrap();
    store.update_saved_filter(&prod.id, "prod-eu", "eu production").unwrap();
    store.update_saved_filter("saved_0", "ghost", "").unwrap();
    store.delete_saved_filter(&dev).unwrap();

    let reopened = SavedFilterStore::new(
        Arc::new(SqliteStorage::open(path.to_str().unwrap()).unwrap()),
        "executions",
        &route,
    );
    let saved = reopened.saved_filters();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, prod.id);
    assert_eq!(saved[0].name, "prod-eu");
    assert_eq!(saved[0].description, "eu production");
    assert_eq!(saved[0].search_query.as_deref(), Some("failed"));
    assert_eq!(saved[0].filters, prod.filters);
    assert_eq!(saved[0].created_at, prod.created_at);
}

#[test]
fn routes_and_prefixes_are_isolated() {
    let storage: Arc<dyn KvStorage> = Arc::new(MemoryStorage::new());
    let mut logs = SavedFilterStore::new(storage.clone(), "logs", &RouteId::path("/logs/list"));
    logs.save_filter("errors", "", &[], None).unwrap();

    let flows = SavedFilterStore::new(storage.clone(), "flows", &RouteId::path("/logs/list"));
    assert!(flows.saved_filters().is_empty());
    assert_eq!(logs.storage_key(), "saved_filters_logs_logs_list");
}

#[test]
fn last_writer_wins_and_reload_sees_it() {
    let storage: Arc<dyn KvStorage> = Arc::new(MemoryStorage::new());
    let route = RouteId::named("flows/list");
    let mut a = SavedFilterStore::new(storage.clone(), "flows", &route);
    let mut b = SavedFilterStore::new(storage.clone(), "flows", &route);
    a.save_filter("from a", "", &[], None).unwrap();
    b.save_filter("from b", "", &[], None).unwrap();

    assert_eq!(a.saved_filters().len(), 1);
    a.load_saved_filters();
    let names: Vec<&str> = a.saved_filters().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["from a", "from b"]);
}

#[test]
fn stored_json_uses_camel_case() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = SavedFilterStore::new(storage.clone(), "p", &RouteId::named("r"));
    store.save_filter("n", "d", &[namespace_filter("a")], Some("s")).unwrap();
    let raw = storage.get(store.storage_key()).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json[0]["createdAt"].is_string());
    assert_eq!(json[0]["searchQuery"], "s");
    assert_eq!(json[0]["filters"][0]["keyLabel"], "Namespace");
    assert_eq!(json[0]["filters"][0]["comparator"], "IN");
}
