mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{get, post_json, TestApp, TOKEN};

const DATA_ROUTES: [(&str, &str); 8] = [
    ("GET", "/is-available?username=alice"),
    ("GET", "/fetch-userdata?uuid=u-1"),
    ("POST", "/push-userdata"),
    ("GET", "/fetch-bookdata"),
    ("GET", "/fetch-user-bookdata?user=carol"),
    ("POST", "/push-bookdata"),
    ("GET", "/get-uuid-from-username?username=alice"),
    ("POST", "/update-uuid-username"),
];

fn request(method: &str, uri: &str, token: Option<&str>) -> Result<axum::http::Request<axum::body::Body>> {
    match method {
        "POST" => post_json(uri, token, &json!({"id": "x", "document": {}})),
        _ => get(uri, token),
    }
}

#[tokio::test]
async fn missing_token_is_forbidden_without_touching_the_store() -> Result<()> {
    let app = TestApp::new()?;

    for (method, uri) in DATA_ROUTES {
        let (status, body) = app.send(request(method, uri, None)?).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
        assert_eq!(body["message"], "No auth token sent.");
    }

    assert_eq!(app.store.opened(), 0);
    Ok(())
}

#[tokio::test]
async fn empty_token_counts_as_missing() -> Result<()> {
    let app = TestApp::new()?;
    let (status, _) = app.send(get("/fetch-bookdata", Some(""))?).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn wrong_token_is_unauthorized_without_touching_the_store() -> Result<()> {
    let app = TestApp::new()?;

    for (method, uri) in DATA_ROUTES {
        let (status, body) = app.send(request(method, uri, Some("not-the-secret"))?).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["message"], "Incorrect auth token.");
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    assert_eq!(app.store.opened(), 0);
    Ok(())
}

#[tokio::test]
async fn correct_token_reaches_the_store_exactly_once() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app.send(get("/fetch-bookdata", Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert_eq!(app.store.opened(), 1);
    assert_eq!(app.store.closed(), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_not_found() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app.send(get("/no-such-route", None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn public_routes_skip_the_gate() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app.send(get("/", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Voya API (Rust)");

    let (status, body) = app.send(get("/health", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    Ok(())
}
