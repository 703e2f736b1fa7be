mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;
use voya_api_rust::types::Collection;

#[tokio::test]
async fn availability_reflects_existing_usernames() -> Result<()> {
    let app = TestApp::new()?;
    app.store.seed(Collection::Userdata, json!({"username": "alice"})).await;

    let (status, body) = app.get("/is-available?username=alice").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"available": false}));

    let (_, body) = app.get("/is-available?username=bob").await?;
    assert_eq!(body, json!({"available": true}));
    Ok(())
}

#[tokio::test]
async fn missing_query_parameter_is_a_client_error() -> Result<()> {
    let app = TestApp::new()?;
    let (status, _) = app.get("/is-available").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.opened(), 0);
    Ok(())
}

#[tokio::test]
async fn pushed_user_round_trips_through_fetch() -> Result<()> {
    let app = TestApp::new()?;
    let user = json!({"username": "alice", "uuid": "u-1", "displayName": "Alice", "books": ["b1"]});

    let (status, ack) = app.post("/push-userdata", json!({"id": "alice", "document": user})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["acknowledged"], true);
    assert_eq!(ack["upsertedCount"], 1);

    let (status, body) = app.get("/fetch-userdata?uuid=u-1").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([user]));
    Ok(())
}

#[tokio::test]
async fn push_replaces_the_whole_document() -> Result<()> {
    let app = TestApp::new()?;

    app.post("/push-userdata", json!({"alice": {"uuid": "u-1", "theme": "dark"}})).await?;
    let (status, ack) = app.post("/push-userdata", json!({"alice": {"uuid": "u-1"}})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["matchedCount"], 1);
    assert_eq!(ack["modifiedCount"], 1);

    // no merge: `theme` is gone, the key field is stamped in
    assert_eq!(
        app.store.documents(Collection::Userdata).await,
        vec![json!({"uuid": "u-1", "username": "alice"})]
    );
    Ok(())
}

#[tokio::test]
async fn ambiguous_payloads_are_rejected_before_connecting() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app.post("/push-userdata", json!({"alice": {}, "bob": {}})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = app.post("/push-userdata", json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/push-userdata", json!({"id": "alice", "document": "nope"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/push-userdata", json!({"id": "alice", "document": {"username": "mallory"}}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.store.opened(), 0);
    assert!(app.store.documents(Collection::Userdata).await.is_empty());
    Ok(())
}
