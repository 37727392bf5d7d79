//! Typed access to stored aggregates.

use core::fmt::Display;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{EngineError, EngineResult};
use crate::store::{Document, DocumentStore, Query};

/// Collection names.
pub mod collections {
    pub const CATEGORIES: &str = "product_categories";
    pub const PRODUCTS: &str = "products";
    pub const PRICE_LISTS: &str = "price_lists";
    pub const ASSOCIATIONS: &str = "customer_supplier_associations";
    pub const ORDERS: &str = "orders";
    pub const NOTIFICATIONS: &str = "notifications";

    /// `{customer}:{supplier}` → association id.
    pub const ASSOCIATION_KEYS: &str = "association_keys";
    /// Order number → order id.
    pub const ORDER_NUMBERS: &str = "order_numbers";
    /// Supplier → currently active price list id.
    pub const ACTIVE_PRICE_LISTS: &str = "active_price_lists";
}

/// Where an aggregate type is stored and how its events are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateKind {
    pub collection: &'static str,
    pub aggregate_type: &'static str,
}

pub const CATEGORY: AggregateKind = AggregateKind {
    collection: collections::CATEGORIES,
    aggregate_type: "catalog.category",
};
pub const PRODUCT: AggregateKind = AggregateKind {
    collection: collections::PRODUCTS,
    aggregate_type: "catalog.product",
};
pub const PRICE_LIST: AggregateKind = AggregateKind {
    collection: collections::PRICE_LISTS,
    aggregate_type: "pricing.price_list",
};
pub const ASSOCIATION: AggregateKind = AggregateKind {
    collection: collections::ASSOCIATIONS,
    aggregate_type: "associations.association",
};
pub const ORDER: AggregateKind = AggregateKind {
    collection: collections::ORDERS,
    aggregate_type: "orders.order",
};
pub const NOTIFICATION: AggregateKind = AggregateKind {
    collection: collections::NOTIFICATIONS,
    aggregate_type: "notifications.notification",
};

/// An aggregate together with the stored version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

pub fn encode<T: Serialize>(value: &T) -> EngineResult<JsonValue> {
    serde_json::to_value(value)
        .map_err(|e| EngineError::Store(format!("serialization failed: {e}")))
}

pub fn decode<T: DeserializeOwned>(doc: Document) -> EngineResult<Versioned<T>> {
    let value = serde_json::from_value(doc.data).map_err(|e| {
        EngineError::Store(format!(
            "stored {}/{} is unreadable: {e}",
            doc.collection, doc.id
        ))
    })?;
    Ok(Versioned {
        value,
        version: doc.version,
    })
}

pub fn find<T, S>(store: &S, collection: &str, id: impl Display) -> EngineResult<Option<Versioned<T>>>
where
    T: DeserializeOwned,
    S: DocumentStore + ?Sized,
{
    store
        .get(collection, &id.to_string())?
        .map(decode)
        .transpose()
}

pub fn load<T, S>(store: &S, collection: &str, id: impl Display) -> EngineResult<Versioned<T>>
where
    T: DeserializeOwned,
    S: DocumentStore + ?Sized,
{
    let id = id.to_string();
    find(store, collection, &id)?
        .ok_or_else(|| EngineError::not_found(format!("{collection}/{id}")))
}

pub fn list<T, S>(store: &S, collection: &str, query: &Query) -> EngineResult<Vec<Versioned<T>>>
where
    T: DeserializeOwned,
    S: DocumentStore + ?Sized,
{
    store
        .list(collection, query)?
        .into_iter()
        .map(decode)
        .collect()
}

pub fn list_values<T, S>(store: &S, collection: &str, query: &Query) -> EngineResult<Vec<T>>
where
    T: DeserializeOwned,
    S: DocumentStore + ?Sized,
{
    Ok(list(store, collection, query)?
        .into_iter()
        .map(|v| v.value)
        .collect())
}
