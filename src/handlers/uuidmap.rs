use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::{scoped, Repository};
use crate::error::ApiError;
use crate::types::{BridgeRequest, UuidLookup, UuidUpdate};

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

/// GET /get-uuid-from-username?username=
pub async fn get_uuid_from_username(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<UuidLookup>, ApiError> {
    let username = query.username;
    let lookup_name = username.clone();
    let lookup = scoped(state.store.as_ref(), move |client| {
        Box::pin(async move { Repository::new(client).uuid_for_username(&lookup_name).await })
    })
    .await
    .map_err(|e| ApiError::store("fetching uuid", e))?;

    lookup
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No uuid mapped for username '{}'", username)))
}

/// POST /update-uuid-username
pub async fn update_uuid_username(
    State(state): State<AppState>,
    Json(request): Json<BridgeRequest>,
) -> Result<Json<UuidUpdate>, ApiError> {
    let (username, uuid) = request.into_parts()?;
    let message = format!("Updated uuid for username {}.", username);

    let result = scoped(state.store.as_ref(), move |client| {
        Box::pin(async move { Repository::new(client).set_username_uuid(&username, &uuid).await })
    })
    .await
    .map_err(|e| ApiError::store("updating uuid", e))?;

    Ok(Json(UuidUpdate { message, result }))
}
