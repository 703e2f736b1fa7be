use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::filter::{Filter, FilterError};
use crate::types::{Collection, UpsertAck};

use super::memory::MemoryStore;
use super::postgres::PgConnector;

/// Errors from the store layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Unsupported store scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Opens one store client per request
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StoreClient>, DatabaseError>;
}

/// A single open connection to the document store.
///
/// `replace_one` and `set_one` always upsert.
#[async_trait]
pub trait StoreClient: Send {
    async fn find(&mut self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, DatabaseError>;

    async fn find_one(&mut self, collection: Collection, filter: &Filter) -> Result<Option<Value>, DatabaseError>;

    /// Replace the first matching document wholesale, or insert `replacement`
    async fn replace_one(&mut self, collection: Collection, filter: &Filter, replacement: Value) -> Result<UpsertAck, DatabaseError>;

    /// Set one field on the first matching document, or insert the filter's
    /// equality fields plus that field
    async fn set_one(&mut self, collection: Collection, filter: &Filter, field: &str, value: Value) -> Result<UpsertAck, DatabaseError>;

    async fn close(self: Box<Self>) -> Result<(), DatabaseError>;
}

/// Build the connector for a store URL (`postgres://`, `postgresql://`, `memory://`)
pub fn connector_from_url(store_url: &str) -> Result<Arc<dyn StoreConnector>, DatabaseError> {
    let url = url::Url::parse(store_url).map_err(|e| DatabaseError::InvalidDatabaseUrl(e.to_string()))?;
    match url.scheme() {
        "postgres" | "postgresql" => Ok(Arc::new(PgConnector::new(store_url))),
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => Err(DatabaseError::UnsupportedScheme(other.to_string())),
    }
}

/// Run exactly one operation against a freshly opened client.
///
/// The client is closed on every exit path: success, error, or panic (the
/// panic is resumed after the close).
pub async fn scoped<T, F>(connector: &dyn StoreConnector, op: F) -> Result<T, DatabaseError>
where
    F: for<'c> FnOnce(&'c mut dyn StoreClient) -> BoxFuture<'c, Result<T, DatabaseError>>,
{
    let mut client = connector.connect().await?;
    debug!("Store client opened");

    let outcome = AssertUnwindSafe(op(client.as_mut())).catch_unwind().await;

    if let Err(e) = client.close().await {
        warn!("Failed to close store client: {}", e);
    }
    debug!("Store client closed");

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Open and close a client to prove the store is reachable
pub async fn health_check(connector: &dyn StoreConnector) -> Result<(), DatabaseError> {
    connector.connect().await?.close().await
}
