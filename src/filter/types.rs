use serde_json::{json, Map, Value};

/// Document-store filter used by the entity repository.
///
/// Field equality follows document-store semantics: a field matches a value
/// when it holds that value, or when it holds an array containing it.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `{}`: every document
    All,
    /// `{field: value}`
    Eq { field: String, value: Value },
    /// `{$or: [...]}`
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq { field: field.into(), value: value.into() }
    }

    pub fn any_of(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// Fields pinned by plain equality. An upsert that inserts seeds the new
    /// document with these; `$or` branches pin nothing.
    pub fn equality_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Filter::Eq { field, value } = self {
            fields.insert(field.clone(), value.clone());
        }
        fields
    }

    /// Render in the document-store query syntax, used for logging
    pub fn to_value(&self) -> Value {
        match self {
            Filter::All => json!({}),
            Filter::Eq { field, value } => {
                let mut obj = Map::new();
                obj.insert(field.clone(), value.clone());
                Value::Object(obj)
            }
            Filter::Or(filters) => json!({ "$or": filters.iter().map(Filter::to_value).collect::<Vec<_>>() }),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
