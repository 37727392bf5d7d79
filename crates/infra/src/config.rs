//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Switches and defaults for the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Emit an approval notification for new orders. Orders start in
    /// `pending_approval` either way.
    pub order_approval_required: bool,
    /// Route supplier submissions through admin approval instead of
    /// activating them directly.
    pub price_list_approval_required: bool,
    pub currency: String,
    pub order_number_prefix: String,
    /// Bounded retries on optimistic-concurrency conflicts and order number
    /// collisions.
    pub max_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order_approval_required: true,
            price_list_approval_required: true,
            currency: "EUR".to_string(),
            order_number_prefix: "ORD".to_string(),
            max_conflict_retries: 3,
        }
    }
}

impl EngineConfig {
    /// Read overrides from `TRADEGATE_*` environment variables. Unparseable
    /// values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = parse(&lookup, "TRADEGATE_ORDER_APPROVAL") {
            config.order_approval_required = v;
        }
        if let Some(v) = parse(&lookup, "TRADEGATE_PRICE_LIST_APPROVAL") {
            config.price_list_approval_required = v;
        }
        if let Some(v) = non_empty(&lookup, "TRADEGATE_CURRENCY") {
            config.currency = v.to_ascii_uppercase();
        }
        if let Some(v) = non_empty(&lookup, "TRADEGATE_ORDER_PREFIX") {
            config.order_number_prefix = v;
        }
        if let Some(v) = parse(&lookup, "TRADEGATE_MAX_RETRIES") {
            config.max_conflict_retries = v;
        }

        config
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse<T: core::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = non_empty(lookup, key)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_require_approval() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
        assert!(config.order_approval_required);
        assert_eq!(config.currency, "EUR");
    }

    #[test]
    fn overrides_are_applied() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("TRADEGATE_PRICE_LIST_APPROVAL", "false"),
            ("TRADEGATE_CURRENCY", "chf"),
            ("TRADEGATE_ORDER_PREFIX", "PO"),
            ("TRADEGATE_MAX_RETRIES", "5"),
        ]));
        assert!(!config.price_list_approval_required);
        assert_eq!(config.currency, "CHF");
        assert_eq!(config.order_number_prefix, "PO");
        assert_eq!(config.max_conflict_retries, 5);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("TRADEGATE_ORDER_APPROVAL", "sometimes"),
            ("TRADEGATE_MAX_RETRIES", "-1"),
        ]));
        assert!(config.order_approval_required);
        assert_eq!(config.max_conflict_retries, 3);
    }

    #[test]
    fn partial_json_uses_defaults_for_missing_fields() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"order_approval_required": false}"#).unwrap();
        assert!(!config.order_approval_required);
        assert_eq!(config.order_number_prefix, "ORD");
    }
}
