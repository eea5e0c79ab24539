mod common;

use serde_json::json;

use common::MockStore;
use mangolite::Store;
use mangolite::exec::bulk::{BulkError, DELETED_MARKER};
use mangolite::metadata::{EntityMeta, MetaRegistry};

fn store() -> (MockStore, MetaRegistry) {
    let registry = MetaRegistry::new();
    registry.register("item", EntityMeta::new("items"));
    (MockStore::new(), registry)
}

#[test]
fn bulk_put_sets_revisions_in_input_order() {
    let (mock, registry) = store();
    let store = Store::new(mock, registry);

    let outcome = store
        .bulk_put("item", vec![json!({ "_id": "a" }), json!({ "_id": "b" })])
        .unwrap();
    assert!(outcome.is_fully_successful());
    assert_eq!(outcome.succeeded.len(), 2);
    assert_eq!(outcome.succeeded[0]["_id"], "a");
    assert_eq!(outcome.succeeded[1]["_id"], "b");
    assert_eq!(outcome.succeeded[0]["_rev"], "1-mock");
    assert_eq!(outcome.succeeded[1]["_rev"], "1-mock");
}

#[test]
fn bulk_put_missing_response_row_fails_only_that_document() {
    let (mock, registry) = store();
    mock.omit_row("b");
    let store = Store::new(mock, registry);

    let outcome = store
        .bulk_put("item", vec![json!({ "_id": "a" }), json!({ "_id": "b" })])
        .unwrap();
    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.succeeded[0]["_id"], "a");
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].id, "b");
    assert_eq!(outcome.failed[0].error, BulkError::MissingResponse);
    assert_eq!(outcome.len(), 2);
}

#[test]
fn bulk_put_conflict_is_reported_not_raised() {
    let (mock, registry) = store();
    mock.reject("b");
    let store = Store::new(mock, registry);

    let outcome = store
        .bulk_put("item", vec![json!({ "_id": "a" }), json!({ "_id": "b" })])
        .unwrap();
    assert_eq!(outcome.succeeded.len(), 1);
    match &outcome.failed[0].error {
        BulkError::Rejected { error, reason } => {
            assert_eq!(error, "conflict");
            assert_eq!(reason.as_deref(), Some("Document update conflict."));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[test]
fn bulk_put_assigns_fresh_identifiers() {
    let (mock, registry) = store();
    let store = Store::new(mock, registry);

    let outcome = store
        .bulk_put("item", vec![json!({ "name": "no id yet" })])
        .unwrap();
    assert!(outcome.is_fully_successful());
    let id = outcome.succeeded[0]["_id"].as_str().unwrap();
    assert!(!id.is_empty());
}

#[test]
fn bulk_delete_attaches_tombstone_and_removes() {
    let (mock, registry) = store();
    let store = Store::new(&mock, registry);

    store
        .bulk_put("item", vec![json!({ "_id": "a" }), json!({ "_id": "b" })])
        .unwrap();
    assert_eq!(mock.doc_count(), 2);

    let outcome = store
        .bulk_delete("item", vec![json!({ "_id": "a", "_rev": "1-mock" })])
        .unwrap();
    assert!(outcome.is_fully_successful());
    assert_eq!(outcome.succeeded[0][DELETED_MARKER], true);
    assert_eq!(mock.doc_count(), 1);
}

#[test]
fn bulk_get_correlates_hits_and_misses() {
    let (mock, registry) = store();
    let store = Store::new(mock, registry);
    store
        .bulk_put("item", vec![json!({ "_id": "a", "n": 1 })])
        .unwrap();

    let outcome = store
        .bulk_get("item", &["a".to_string(), "ghost".to_string()])
        .unwrap();
    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.succeeded[0]["n"], 1);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].id, "ghost");
    assert!(matches!(outcome.failed[0].error, BulkError::Rejected { .. }));
}

#[test]
fn bulk_get_missing_row_is_missing_response() {
    let (mock, registry) = store();
    mock.omit_row("a");
    let store = Store::new(mock, registry);

    let outcome = store.bulk_get("item", &["a".to_string()]).unwrap();
    assert!(outcome.succeeded.is_empty());
    assert_eq!(outcome.failed[0].error, BulkError::MissingResponse);
}

#[test]
fn whole_batch_transport_failure_fails_every_item_identically() {
    let (mock, registry) = store();
    mock.fail_transport(true);
    let store = Store::new(mock, registry);

    let inputs = vec![json!({ "_id": "a" }), json!({ "_id": "b" }), json!({ "_id": "c" })];
    let outcome = store.bulk_put("item", inputs).unwrap();
    assert!(outcome.succeeded.is_empty());
    assert_eq!(outcome.failed.len(), 3);
    let first = &outcome.failed[0].error;
    assert!(matches!(first, BulkError::Transport(_)));
    assert!(outcome.failed.iter().all(|f| f.error == *first));
}
