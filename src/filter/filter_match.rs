use serde_json::Value;

use super::types::Filter;

impl Filter {
    /// Evaluate the filter against a document held in memory
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => match document.get(field) {
                Some(Value::Array(items)) if !value.is_array() => items.contains(value),
                Some(found) => found == value,
                None => false,
            },
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
        }
    }
}
