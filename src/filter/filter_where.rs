use serde_json::{json, Map, Value};

use super::error::FilterError;
use super::types::Filter;

/// Translates a [`Filter`] into a parameterized predicate over a JSONB column.
///
/// Equality becomes containment (`doc @> $n`); for non-array values a second
/// containment against a one-element array covers array membership.
pub struct FilterWhere {
    column: String,
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(column: impl Into<String>, starting_param_index: usize) -> Self {
        Self {
            column: column.into(),
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Returns the SQL predicate and its parameters. Placeholders are numbered
    /// from `starting_param_index + 1`.
    pub fn generate(filter: &Filter, column: &str, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(column, starting_param_index);
        let sql = filter_where.build(filter)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate_field(field: &str) -> Result<(), FilterError> {
        if field.is_empty() || field.starts_with('$') {
            return Err(FilterError::InvalidField(field.to_string()));
        }
        Ok(())
    }

    fn build(&mut self, filter: &Filter) -> Result<String, FilterError> {
        match filter {
            Filter::All => Ok("TRUE".to_string()),
            Filter::Eq { field, value } => {
                Self::validate_field(field)?;
                let exact = self.push_containment(field, value.clone());
                if value.is_array() {
                    Ok(exact)
                } else {
                    let member = self.push_containment(field, json!([value]));
                    Ok(format!("({} OR {})", exact, member))
                }
            }
            Filter::Or(filters) => {
                if filters.is_empty() {
                    return Ok("FALSE".to_string());
                }
                let parts = filters
                    .iter()
                    .map(|f| self.build(f).map(|sql| format!("({})", sql)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(" OR "))
            }
        }
    }

    fn push_containment(&mut self, field: &str, value: Value) -> String {
        let mut obj = Map::new();
        obj.insert(field.to_string(), value);
        self.param_values.push(Value::Object(obj));
        self.param_index += 1;
        format!("\"{}\" @> ${}", self.column, self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_unconditional() {
        let (sql, params) = FilterWhere::generate(&Filter::All, "doc", 0).unwrap();
        assert_eq!(sql, "TRUE");
        assert!(params.is_empty());
    }

    #[test]
    fn scalar_equality_covers_array_membership() {
        let (sql, params) = FilterWhere::generate(&Filter::eq("username", "alice"), "doc", 0).unwrap();
        assert_eq!(sql, "(\"doc\" @> $1 OR \"doc\" @> $2)");
        assert_eq!(params, vec![json!({"username": "alice"}), json!({"username": ["alice"]})]);
    }

    #[test]
    fn or_numbers_placeholders_after_offset() {
        let filter = Filter::any_of(vec![Filter::eq("admins", "carol"), Filter::eq("viewer", "carol")]);
        let (sql, params) = FilterWhere::generate(&filter, "doc", 1).unwrap();
        assert_eq!(
            sql,
            "((\"doc\" @> $2 OR \"doc\" @> $3)) OR ((\"doc\" @> $4 OR \"doc\" @> $5))"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn empty_or_matches_nothing() {
        let (sql, _) = FilterWhere::generate(&Filter::any_of(vec![]), "doc", 0).unwrap();
        assert_eq!(sql, "FALSE");
    }

    #[test]
    fn rejects_operator_like_fields() {
        assert!(FilterWhere::generate(&Filter::eq("$where", "x"), "doc", 0).is_err());
        assert!(FilterWhere::generate(&Filter::eq("", "x"), "doc", 0).is_err());
    }
}
