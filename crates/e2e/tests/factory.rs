//! Factory count and make-only contracts

mod common;

use common::{attrs, start};
use serde_json::json;
use testwire_common::FactoryOutcome;

#[tokio::test]
async fn one_record_comes_back_as_a_single_object() {
    let Some(ctx) = start(false).await else { return };

    let outcome = ctx
        .bridge
        .create("post", 1, attrs(json!({"title": "Hello"})))
        .await
        .unwrap();

    let record = outcome.single().expect("single record for times=1");
    assert_eq!(record.get("title"), Some(&json!("Hello")));
    assert!(record.id().is_some());
}

#[tokio::test]
async fn many_records_come_back_as_an_array_honoring_overrides() {
    let Some(ctx) = start(false).await else { return };

    let outcome = ctx
        .bridge
        .create("post", 3, attrs(json!({"published": false})))
        .await
        .unwrap();

    assert!(matches!(outcome, FactoryOutcome::Many(_)));
    let records = outcome.into_records();
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(record.get("published"), Some(&json!(false)));
        assert!(record.id().is_some());
    }

    // Distinct rows, not one row three times.
    assert_ne!(records[0].id(), records[1].id());
    assert_ne!(records[1].id(), records[2].id());
}

#[tokio::test]
async fn made_records_are_not_persisted() {
    let Some(ctx) = start(false).await else { return };

    let outcome = ctx
        .bridge
        .make("user", 1, attrs(json!({"email": "made@example.com"})))
        .await
        .unwrap();

    // No identity key: the record never reached the store.
    let made = outcome.single().unwrap();
    assert!(made.id().is_none());
    assert_eq!(made.get("email"), Some(&json!("made@example.com")));

    // Logging in by the same email has to create a fresh user, which proves
    // the made record is absent from storage.
    let logged_in = ctx
        .bridge
        .login(attrs(json!({"email": "made@example.com"})))
        .await
        .unwrap();
    assert!(logged_in.id().is_some());
    assert_ne!(logged_in.get("name"), made.get("name"));
}

#[tokio::test]
async fn unknown_models_surface_as_failed_steps() {
    let Some(ctx) = start(false).await else { return };

    let err = ctx
        .bridge
        .create("widget", 1, attrs(json!({})))
        .await
        .unwrap_err();

    match err {
        testwire_client::ClientError::UnexpectedStatus { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("widget"));
        }
        other => panic!("expected status error, got {other}"),
    }
}
