//! Shared types used across the codebase

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Document collections exposed through the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Userdata,
    Bookdata,
    Uuidmap,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Userdata => "userdata",
            Collection::Bookdata => "bookdata",
            Collection::Uuidmap => "uuidmap",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement returned by the store for a single upsert.
/// Field names follow the document-store driver's update result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<String>,
}

impl UpsertAck {
    pub fn matched(modified: bool) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: u64::from(modified),
            upserted_count: 0,
            upserted_id: None,
        }
    }

    pub fn upserted(id: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 1,
            upserted_id: Some(id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UuidLookup {
    pub uuid: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UuidUpdate {
    pub message: String,
    pub result: UpsertAck,
}

/// Rejections for write payloads, raised before any store connection is opened
#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("Payload must name exactly one entity, found none")]
    Empty,

    #[error("Payload must name exactly one entity, found {0} keys")]
    Ambiguous(usize),

    #[error("Document for '{0}' must be a JSON object")]
    NotAnObject(String),

    #[error("Value for '{0}' must be a string")]
    NotAString(String),

    #[error("Username '{0}' is reserved")]
    ReservedUsername(String),

    #[error("Document field '{field}' is '{found}' but the payload targets '{expected}'")]
    KeyMismatch {
        field: &'static str,
        expected: String,
        found: Value,
    },
}

/// Body of `POST /push-userdata` and `POST /push-bookdata`.
///
/// The explicit form is `{"id": "...", "document": {...}}`. The legacy form
/// names the entity by the single top-level key: `{"<id>": {...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PushRequest {
    Explicit { id: String, document: Value },
    Legacy(Map<String, Value>),
}

impl PushRequest {
    pub fn into_parts(self) -> Result<(String, Value), PayloadError> {
        match self {
            PushRequest::Explicit { id, document } => Ok((id, document)),
            PushRequest::Legacy(map) => single_entry(map),
        }
    }
}

/// Field every uuid-bridge entry is looked up by; a username with this name
/// would overwrite it.
pub const BRIDGE_KEY_FIELD: &str = "key";

/// Body of `POST /update-uuid-username`: `{"username", "uuid"}` or the
/// legacy `{"<username>": "<uuid>"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BridgeRequest {
    Explicit { username: String, uuid: String },
    Legacy(Map<String, Value>),
}

impl BridgeRequest {
    pub fn into_parts(self) -> Result<(String, String), PayloadError> {
        let (username, uuid) = match self {
            BridgeRequest::Explicit { username, uuid } => (username, uuid),
            BridgeRequest::Legacy(map) => match single_entry(map)? {
                (username, Value::String(uuid)) => (username, uuid),
                (username, _) => return Err(PayloadError::NotAString(username)),
            },
        };
        if username == BRIDGE_KEY_FIELD {
            return Err(PayloadError::ReservedUsername(username));
        }
        Ok((username, uuid))
    }
}

fn single_entry(map: Map<String, Value>) -> Result<(String, Value), PayloadError> {
    if map.len() > 1 {
        return Err(PayloadError::Ambiguous(map.len()));
    }
    map.into_iter().next().ok_or(PayloadError::Empty)
}
