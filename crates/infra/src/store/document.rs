use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use tradegate_core::ExpectedVersion;

use super::query::Query;

/// A stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub collection: String,
    pub id: String,
    /// Starts at 1 on create, +1 per update.
    pub version: u64,
    pub data: JsonValue,
}

/// One write inside an atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Insert a new document; fails if the id is taken.
    Create {
        collection: String,
        id: String,
        data: JsonValue,
    },
    /// Shallow-merge `patch` into an existing document.
    Update {
        collection: String,
        id: String,
        patch: JsonValue,
        expected: ExpectedVersion,
    },
    Delete {
        collection: String,
        id: String,
        expected: ExpectedVersion,
    },
}

impl Write {
    pub fn create(collection: &str, id: impl Into<String>, data: JsonValue) -> Self {
        Write::Create {
            collection: collection.to_string(),
            id: id.into(),
            data,
        }
    }

    pub fn update(
        collection: &str,
        id: impl Into<String>,
        patch: JsonValue,
        expected: ExpectedVersion,
    ) -> Self {
        Write::Update {
            collection: collection.to_string(),
            id: id.into(),
            patch,
            expected,
        }
    }

    pub fn delete(collection: &str, id: impl Into<String>, expected: ExpectedVersion) -> Self {
        Write::Delete {
            collection: collection.to_string(),
            id: id.into(),
            expected,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            Write::Create { collection, .. }
            | Write::Update { collection, .. }
            | Write::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Write::Create { id, .. } | Write::Update { id, .. } | Write::Delete { id, .. } => id,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate key {collection}/{id}")]
    DuplicateKey { collection: String, id: String },

    #[error("version mismatch on {collection}/{id} (expected {expected}, actual {actual})")]
    Concurrency {
        collection: String,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("{collection}/{id} does not exist")]
    NotFound { collection: String, id: String },

    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Collection-oriented document store.
///
/// Implementations must:
/// - apply every write of a `commit` or none of them
/// - check all version expectations against the state the batch started from
///   plus earlier writes in the same batch
/// - assign versions monotonically per document
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Documents of `collection` matching `query`, in the query's order
    /// (ties broken by id).
    fn list(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Apply `writes` atomically. Returns the resulting document of every
    /// create/update, in write order.
    fn commit(&self, writes: Vec<Write>) -> Result<Vec<Document>, StoreError>;

    fn create(&self, collection: &str, id: &str, data: JsonValue) -> Result<Document, StoreError> {
        single(self.commit(vec![Write::create(collection, id, data)])?)
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: JsonValue,
        expected: ExpectedVersion,
    ) -> Result<Document, StoreError> {
        single(self.commit(vec![Write::update(collection, id, patch, expected)])?)
    }

    fn delete(
        &self,
        collection: &str,
        id: &str,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        self.commit(vec![Write::delete(collection, id, expected)])?;
        Ok(())
    }
}

fn single(docs: Vec<Document>) -> Result<Document, StoreError> {
    docs.into_iter()
        .next()
        .ok_or_else(|| StoreError::Unavailable("commit returned no document".to_string()))
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, id)
    }

    fn list(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        (**self).list(collection, query)
    }

    fn commit(&self, writes: Vec<Write>) -> Result<Vec<Document>, StoreError> {
        (**self).commit(writes)
    }
}
