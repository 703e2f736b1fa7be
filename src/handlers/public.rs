use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::health_check;
use crate::error::ApiError;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Voya API (Rust)",
        "version": version,
        "endpoints": {
            "users": ["GET /is-available", "GET /fetch-userdata", "POST /push-userdata"],
            "books": ["GET /fetch-bookdata", "GET /fetch-user-bookdata", "POST /push-bookdata"],
            "bridge": ["GET /get-uuid-from-username", "POST /update-uuid-username"],
            "health": "GET /health (public)"
        },
        "auth": "authorization header carrying the shared token"
    }))
}

/// GET /health - opens and closes one store client
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match health_check(state.store.as_ref()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                })),
            )
        }
    }
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}
