use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use super::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Equality filters plus an ordering. Field names may use dots to reach
/// into nested objects (`customer.id`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, JsonValue)>,
    order_by: Vec<(String, SortDirection)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`. Enums and ids are compared by their
    /// serialized form.
    pub fn filter(mut self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    /// Add a sort key; earlier keys take precedence.
    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by.push((field.to_string(), direction));
        self
    }

    pub fn matches(&self, data: &JsonValue) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| lookup(data, field) == Some(value))
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, direction) in &self.order_by {
            let ord = compare_values(lookup(&a.data, field), lookup(&b.data, field));
            let ord = match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.id.cmp(&b.id)
    }
}

fn lookup<'a>(data: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.').try_fold(data, |value, key| value.get(key))
}

/// Total order over JSON scalars: missing < null < bool < number < string.
/// Arrays and objects compare equal to each other.
fn compare_values(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    fn rank(v: Option<&JsonValue>) -> u8 {
        match v {
            None => 0,
            Some(JsonValue::Null) => 1,
            Some(JsonValue::Bool(_)) => 2,
            Some(JsonValue::Number(_)) => 3,
            Some(JsonValue::String(_)) => 4,
            Some(JsonValue::Array(_) | JsonValue::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
            }
        }
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
