use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::app::AppState;
use crate::error::ApiError;

pub const NO_TOKEN: &str = "No auth token sent.";
pub const WRONG_TOKEN: &str = "Incorrect auth token.";

/// Shared-secret gate in front of every data route.
///
/// Rejections stop the request before a store connection is opened.
pub async fn auth_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check_token(request.headers(), state.config.security.auth_token.as_deref())?;
    Ok(next.run(request).await)
}

/// Missing or empty header: 403. Present but not equal to the secret: 401.
/// Without a configured secret no token is accepted.
pub fn check_token(headers: &HeaderMap, secret: Option<&str>) -> Result<(), ApiError> {
    let token = match headers.get("authorization") {
        Some(value) if !value.is_empty() => value,
        _ => {
            tracing::warn!("Rejected request without auth token");
            return Err(ApiError::forbidden(NO_TOKEN));
        }
    };

    let accepted = match secret {
        Some(secret) => bool::from(token.as_bytes().ct_eq(secret.as_bytes())),
        None => false,
    };

    if !accepted {
        tracing::warn!("Rejected request with incorrect auth token");
        return Err(ApiError::unauthorized(WRONG_TOKEN));
    }

    tracing::debug!("Auth token accepted");
    Ok(())
}
