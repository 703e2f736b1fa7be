use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::database::{scoped, KeyedDocument, Repository};
use crate::error::ApiError;
use crate::types::{PushRequest, UpsertAck};

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user: String,
}

/// GET /fetch-bookdata - every book
pub async fn fetch_bookdata(State(state): State<AppState>) -> Result<Json<Vec<Value>>, ApiError> {
    let books = scoped(state.store.as_ref(), |client| {
        Box::pin(async move { Repository::new(client).fetch_books().await })
    })
    .await
    .map_err(|e| ApiError::store("fetching bookdata", e))?;

    Ok(Json(books))
}

/// GET /fetch-user-bookdata?user= - books listing the user as admin or viewer
pub async fn fetch_user_bookdata(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let user = query.user;
    let books = scoped(state.store.as_ref(), move |client| {
        Box::pin(async move { Repository::new(client).fetch_books_for_user(&user).await })
    })
    .await
    .map_err(|e| ApiError::store("fetching bookdata", e))?;

    Ok(Json(books))
}

/// POST /push-bookdata - full replacement keyed on uuid
///
/// A document without a `uuid` field is stored with one set to the pushed
/// id, so a later fetch returns that field in addition to the pushed payload.
pub async fn push_bookdata(
    State(state): State<AppState>,
    Json(request): Json<PushRequest>,
) -> Result<Json<UpsertAck>, ApiError> {
    let (uuid, document) = request.into_parts()?;
    let book = KeyedDocument::new("uuid", uuid, document)?;

    let ack = scoped(state.store.as_ref(), move |client| {
        Box::pin(async move { Repository::new(client).push_book(book).await })
    })
    .await
    .map_err(|e| ApiError::store("pushing bookdata", e))?;

    Ok(Json(ack))
}
