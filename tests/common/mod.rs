#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use voya_api_rust::config::AppConfig;
use voya_api_rust::database::MemoryStore;
use voya_api_rust::{app, AppState};

pub const TOKEN: &str = "test-secret";

/// Router wired to a fresh memory store; the store handle doubles as the
/// connection spy.
pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("memory://".to_string()),
            "VOYA_AUTH_TOKEN" => Some(TOKEN.to_string()),
            _ => None,
        })?;
        let store = MemoryStore::new();
        let state = AppState::new(config, Arc::new(store.clone()));
        Ok(Self { router: app(state), store })
    }

    /// Send a request and decode the body as JSON (`Null` when it is not JSON)
    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn get(&self, uri: &str) -> Result<(StatusCode, Value)> {
        self.send(get(uri, Some(TOKEN))?).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(post_json(uri, Some(TOKEN), &body)?).await
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    Ok(builder.body(Body::empty())?)
}

pub fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    Ok(builder.body(Body::from(serde_json::to_vec(body)?))?)
}

/// A real listener on a free port, for tests that go over the wire
pub struct TestServer {
    pub base_url: String,
    pub store: MemoryStore,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let TestApp { router, store } = TestApp::new()?;

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self { base_url, store };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}
