use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{Connection, PgConnection};
use tracing::debug;
use uuid::Uuid;

use crate::filter::{Filter, FilterWhere};
use crate::types::{Collection, UpsertAck};

use super::manager::{DatabaseError, StoreClient, StoreConnector};

/// Postgres-backed document store. Each collection is a table of JSONB
/// documents; every request gets its own connection, no pool is kept.
pub struct PgConnector {
    url: String,
}

impl PgConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl StoreConnector for PgConnector {
    async fn connect(&self) -> Result<Box<dyn StoreClient>, DatabaseError> {
        let conn = PgConnection::connect(&self.url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;
        Ok(Box::new(PgClient { conn, ensured: HashSet::new() }))
    }
}

struct PgClient {
    conn: PgConnection,
    ensured: HashSet<Collection>,
}

const DOC_COLUMN: &str = "doc";

impl PgClient {
    /// Create the collection table on first use within this connection
    async fn ensure_collection(&mut self, collection: Collection) -> Result<(), DatabaseError> {
        if self.ensured.contains(&collection) {
            return Ok(());
        }
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (id UUID PRIMARY KEY, seq BIGSERIAL, {} JSONB NOT NULL)",
            collection, DOC_COLUMN
        );
        sqlx::query(&ddl).execute(&mut self.conn).await?;
        self.ensured.insert(collection);
        Ok(())
    }

    /// First document matching the filter, in insertion order
    async fn first_match(&mut self, collection: Collection, filter: &Filter) -> Result<Option<(Uuid, Value)>, DatabaseError> {
        self.ensure_collection(collection).await?;
        let (where_clause, params) = FilterWhere::generate(filter, DOC_COLUMN, 0)?;
        let sql = format!(
            "SELECT id, {} FROM \"{}\" WHERE {} ORDER BY seq LIMIT 1",
            DOC_COLUMN, collection, where_clause
        );
        let mut q = sqlx::query_as::<_, (Uuid, Json<Value>)>(&sql);
        for p in params {
            q = q.bind(Json(p));
        }
        let row = q.fetch_optional(&mut self.conn).await?;
        Ok(row.map(|(id, Json(doc))| (id, doc)))
    }

    async fn write(&mut self, collection: Collection, id: Uuid, doc: Value) -> Result<(), DatabaseError> {
        let sql = format!("UPDATE \"{}\" SET {} = $1 WHERE id = $2", collection, DOC_COLUMN);
        sqlx::query(&sql).bind(Json(doc)).bind(id).execute(&mut self.conn).await?;
        Ok(())
    }

    async fn insert(&mut self, collection: Collection, doc: Value) -> Result<Uuid, DatabaseError> {
        let id = Uuid::new_v4();
        let sql = format!("INSERT INTO \"{}\" (id, {}) VALUES ($1, $2)", collection, DOC_COLUMN);
        sqlx::query(&sql).bind(id).bind(Json(doc)).execute(&mut self.conn).await?;
        Ok(id)
    }
}

#[async_trait]
impl StoreClient for PgClient {
    async fn find(&mut self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        self.ensure_collection(collection).await?;
        let (where_clause, params) = FilterWhere::generate(filter, DOC_COLUMN, 0)?;
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE {} ORDER BY seq",
            DOC_COLUMN, collection, where_clause
        );
        debug!("find {} {}: {}", collection, filter, sql);

        let mut q = sqlx::query_as::<_, (Json<Value>,)>(&sql);
        for p in params {
            q = q.bind(Json(p));
        }
        let rows = q.fetch_all(&mut self.conn).await?;
        Ok(rows.into_iter().map(|(Json(doc),)| doc).collect())
    }

    async fn find_one(&mut self, collection: Collection, filter: &Filter) -> Result<Option<Value>, DatabaseError> {
        Ok(self.first_match(collection, filter).await?.map(|(_, doc)| doc))
    }

    async fn replace_one(&mut self, collection: Collection, filter: &Filter, replacement: Value) -> Result<UpsertAck, DatabaseError> {
        match self.first_match(collection, filter).await? {
            Some((id, existing)) => {
                let modified = existing != replacement;
                if modified {
                    self.write(collection, id, replacement).await?;
                }
                Ok(UpsertAck::matched(modified))
            }
            None => {
                let id = self.insert(collection, replacement).await?;
                Ok(UpsertAck::upserted(id.to_string()))
            }
        }
    }

    async fn set_one(&mut self, collection: Collection, filter: &Filter, field: &str, value: Value) -> Result<UpsertAck, DatabaseError> {
        match self.first_match(collection, filter).await? {
            Some((id, mut existing)) => {
                let modified = existing.get(field) != Some(&value);
                let obj = existing.as_object_mut().ok_or_else(|| {
                    DatabaseError::QueryError(format!("cannot set '{}' on a non-object document in {}", field, collection))
                })?;
                obj.insert(field.to_string(), value);
                if modified {
                    self.write(collection, id, existing).await?;
                }
                Ok(UpsertAck::matched(modified))
            }
            None => {
                let mut doc: Map<String, Value> = filter.equality_fields();
                doc.insert(field.to_string(), value);
                let id = self.insert(collection, Value::Object(doc)).await?;
                Ok(UpsertAck::upserted(id.to_string()))
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<(), DatabaseError> {
        let client = *self;
        client.conn.close().await?;
        Ok(())
    }
}
