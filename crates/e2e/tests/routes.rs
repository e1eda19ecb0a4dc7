//! Route listing, navigation by named route, and location assertions

mod common;

use common::{attrs, start};
use serde_json::json;
use testwire_client::{Bridge, Target};

#[tokio::test]
async fn route_table_has_one_entry_per_name_with_declared_methods() {
    let Some(ctx) = start(false).await else { return };

    let table = ctx.bridge.refresh_routes().await.unwrap();

    let home = table.get("home").unwrap();
    assert_eq!(home.uri, "/");
    assert_eq!(home.methods, vec!["GET", "HEAD"]);

    let store = table.get("posts.store").unwrap();
    assert_eq!(store.methods, vec!["POST"]);

    assert!(table.get("verification.verify").is_some());

    // Name-keyed: every lookup by name is unambiguous.
    let names: Vec<_> = table.iter().map(|(name, _)| name.clone()).collect();
    let mut deduped = names.clone();
    deduped.dedup();
    assert_eq!(names, deduped);
}

#[tokio::test]
async fn visit_resolves_named_routes_and_tracks_location() {
    let Some(ctx) = start(false).await else { return };

    ctx.bridge.refresh_routes().await.unwrap();

    let visited = ctx
        .bridge
        .visit(Target::route_with("team.show", attrs(json!({"team": 7}))))
        .await
        .unwrap();
    assert_eq!(visited.path, "/teams/7");
    assert_eq!(visited.status, 200);

    ctx.bridge
        .assert_location(Target::route_with("team.show", attrs(json!({"team": 7}))))
        .await
        .unwrap();
    ctx.bridge
        .assert_location(Target::path("/teams/7"))
        .await
        .unwrap();

    let err = ctx
        .bridge
        .assert_location(Target::path("/teams/8"))
        .await
        .unwrap_err();
    assert!(matches!(err, testwire_client::ClientError::Assertion(_)));
}

#[tokio::test]
async fn visit_accepts_literal_paths_without_a_route_cache() {
    let Some(ctx) = start(false).await else { return };

    let visited = ctx.bridge.visit(Target::path("dashboard")).await.unwrap();
    assert_eq!(visited.path, "/dashboard");
    assert_eq!(visited.status, 200);
}

#[tokio::test]
async fn visiting_a_route_without_a_cache_is_an_error() {
    let Some(ctx) = start(false).await else { return };

    let err = ctx
        .bridge
        .visit(Target::route("dashboard"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        testwire_client::ClientError::RoutesCacheMissing
    ));
}

#[tokio::test]
async fn route_cache_survives_across_bridge_instances() {
    let Some(ctx) = start(false).await else { return };

    ctx.bridge.refresh_routes().await.unwrap();

    // A fresh bridge picks the table up from disk without another fetch.
    let other = Bridge::new(ctx.server.base_url())
        .unwrap()
        .with_routes_cache(&ctx.cache_path);
    let path = other
        .resolve_route("team.show", &attrs(json!({"team": 3})))
        .await
        .unwrap();
    assert_eq!(path, "/teams/3");
}
