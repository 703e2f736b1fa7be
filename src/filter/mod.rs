pub mod types;
pub mod filter_match;
pub mod filter_where;
pub mod error;

pub use types::Filter;
pub use error::FilterError;
pub use filter_where::FilterWhere;
