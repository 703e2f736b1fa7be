use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::database::{scoped, KeyedDocument, Repository};
use crate::error::ApiError;
use crate::types::{Availability, PushRequest, UpsertAck};

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct UuidQuery {
    pub uuid: String,
}

/// GET /is-available?username=
pub async fn is_available(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<Availability>, ApiError> {
    let username = query.username;
    let availability = scoped(state.store.as_ref(), move |client| {
        Box::pin(async move { Repository::new(client).check_availability(&username).await })
    })
    .await
    .map_err(|e| ApiError::store("checking availability", e))?;

    Ok(Json(availability))
}

/// GET /fetch-userdata?uuid=
pub async fn fetch_userdata(
    State(state): State<AppState>,
    Query(query): Query<UuidQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let uuid = query.uuid;
    let users = scoped(state.store.as_ref(), move |client| {
        Box::pin(async move { Repository::new(client).fetch_user(&uuid).await })
    })
    .await
    .map_err(|e| ApiError::store("fetching userdata", e))?;

    Ok(Json(users))
}

/// POST /push-userdata - full replacement keyed on username
///
/// A document without a `username` field is stored with one set to the pushed
/// id, so a later fetch returns that field in addition to the pushed payload.
pub async fn push_userdata(
    State(state): State<AppState>,
    Json(request): Json<PushRequest>,
) -> Result<Json<UpsertAck>, ApiError> {
    let (username, document) = request.into_parts()?;
    let user = KeyedDocument::new("username", username, document)?;

    let ack = scoped(state.store.as_ref(), move |client| {
        Box::pin(async move { Repository::new(client).push_user(user).await })
    })
    .await
    .map_err(|e| ApiError::store("pushing userdata", e))?;

    Ok(Json(ack))
}
