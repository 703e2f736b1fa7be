pub mod manager;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use manager::{connector_from_url, health_check, scoped, DatabaseError, StoreClient, StoreConnector};
pub use memory::MemoryStore;
pub use postgres::PgConnector;
pub use repository::{KeyedDocument, Repository};
