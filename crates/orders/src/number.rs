use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Human-facing order number, unique across all orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of candidate order numbers. Uniqueness is enforced by the store;
/// a source only has to make collisions unlikely.
pub trait OrderNumberSource: Send + Sync {
    fn next(&self, prefix: &str, order_date: NaiveDate) -> OrderNumber;
}

/// `{prefix}-{YYYYMMDD}-{6 hex}` with a random suffix.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOrderNumbers;

impl OrderNumberSource for RandomOrderNumbers {
    fn next(&self, prefix: &str, order_date: NaiveDate) -> OrderNumber {
        // The tail of a v7 UUID is random.
        let simple = Uuid::now_v7().simple().to_string();
        let suffix = simple[simple.len() - 6..].to_ascii_uppercase();
        OrderNumber(format!("{prefix}-{}-{suffix}", order_date.format("%Y%m%d")))
    }
}
