use serde_json::Value;
use tracing::info;

use crate::database::manager::{DatabaseError, StoreClient};
use crate::filter::Filter;
use crate::types::{Availability, Collection, PayloadError, UpsertAck, UuidLookup, BRIDGE_KEY_FIELD};

/// A replacement document bound to the identifier it is upserted under.
///
/// The key field is stamped into the document when absent so that a second
/// push with the same identifier matches the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedDocument {
    field: &'static str,
    id: String,
    document: Value,
}

impl KeyedDocument {
    pub fn new(field: &'static str, id: impl Into<String>, document: Value) -> Result<Self, PayloadError> {
        let id = id.into();
        let Value::Object(mut obj) = document else {
            return Err(PayloadError::NotAnObject(id));
        };

        match obj.get(field) {
            None => {
                obj.insert(field.to_string(), Value::String(id.clone()));
            }
            Some(Value::String(found)) if *found == id => {}
            Some(found) => {
                return Err(PayloadError::KeyMismatch {
                    field,
                    expected: id,
                    found: found.clone(),
                })
            }
        }

        Ok(Self { field, id, document: Value::Object(obj) })
    }

    fn filter(&self) -> Filter {
        Filter::eq(self.field, self.id.as_str())
    }
}

/// The gateway's entity operations, one store call each
pub struct Repository<'c> {
    client: &'c mut dyn StoreClient,
}

impl<'c> Repository<'c> {
    pub fn new(client: &'c mut dyn StoreClient) -> Self {
        Self { client }
    }

    pub async fn check_availability(&mut self, username: &str) -> Result<Availability, DatabaseError> {
        let users = self
            .client
            .find(Collection::Userdata, &Filter::eq("username", username))
            .await?;
        let available = users.is_empty();
        info!("Username {} is {}", username, if available { "available" } else { "taken" });
        Ok(Availability { available })
    }

    pub async fn fetch_user(&mut self, uuid: &str) -> Result<Vec<Value>, DatabaseError> {
        let users = self.client.find(Collection::Userdata, &Filter::eq("uuid", uuid)).await?;
        info!("Fetched {} userdata record(s) for {}", users.len(), uuid);
        Ok(users)
    }

    /// Full replacement keyed on `username`
    pub async fn push_user(&mut self, user: KeyedDocument) -> Result<UpsertAck, DatabaseError> {
        let filter = user.filter();
        let ack = self
            .client
            .replace_one(Collection::Userdata, &filter, user.document)
            .await?;
        info!("Pushed userdata for {} (matched {}, upserted {})", user.id, ack.matched_count, ack.upserted_count);
        Ok(ack)
    }

    pub async fn fetch_books(&mut self) -> Result<Vec<Value>, DatabaseError> {
        let books = self.client.find(Collection::Bookdata, &Filter::All).await?;
        info!("Fetched {} bookdata record(s)", books.len());
        Ok(books)
    }

    /// Books where `user` is listed as an admin or a viewer
    pub async fn fetch_books_for_user(&mut self, user: &str) -> Result<Vec<Value>, DatabaseError> {
        let filter = Filter::any_of(vec![Filter::eq("admins", user), Filter::eq("viewer", user)]);
        let books = self.client.find(Collection::Bookdata, &filter).await?;
        info!("Fetched {} bookdata record(s) for {}", books.len(), user);
        Ok(books)
    }

    /// Full replacement keyed on `uuid`
    pub async fn push_book(&mut self, book: KeyedDocument) -> Result<UpsertAck, DatabaseError> {
        let filter = book.filter();
        let ack = self
            .client
            .replace_one(Collection::Bookdata, &filter, book.document)
            .await?;
        info!("Pushed bookdata for {} (matched {}, upserted {})", book.id, ack.matched_count, ack.upserted_count);
        Ok(ack)
    }

    /// `None` when no mapping exists for the username, or the mapping lacks
    /// its username field
    pub async fn uuid_for_username(&mut self, username: &str) -> Result<Option<UuidLookup>, DatabaseError> {
        let entry = self
            .client
            .find_one(Collection::Uuidmap, &Filter::eq(BRIDGE_KEY_FIELD, username))
            .await?;
        Ok(entry
            .and_then(|doc| doc.get(username).cloned())
            .map(|uuid| UuidLookup { uuid }))
    }

    pub async fn set_username_uuid(&mut self, username: &str, uuid: &str) -> Result<UpsertAck, DatabaseError> {
        let ack = self
            .client
            .set_one(Collection::Uuidmap, &Filter::eq(BRIDGE_KEY_FIELD, username), username, Value::String(uuid.to_string()))
            .await?;
        info!("Mapped username {} to uuid {}", username, uuid);
        Ok(ack)
    }
}
