use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use tradegate_core::ExpectedVersion;

use super::document::{Document, DocumentStore, StoreError, Write};
use super::query::Query;

type Collection = BTreeMap<String, Document>;

/// In-memory document store.
///
/// Intended for tests/dev. Iteration order is by id, so listings are
/// deterministic.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections.get(collection).map(BTreeMap::len).unwrap_or(0))
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

fn check_version(
    collection: &str,
    id: &str,
    expected: ExpectedVersion,
    actual: u64,
) -> Result<(), StoreError> {
    match expected {
        ExpectedVersion::Exact(v) if v != actual => Err(StoreError::Concurrency {
            collection: collection.to_string(),
            id: id.to_string(),
            expected: v,
            actual,
        }),
        _ => Ok(()),
    }
}

fn merge(target: &mut JsonValue, patch: JsonValue) -> Result<(), StoreError> {
    let JsonValue::Object(patch) = patch else {
        return Err(StoreError::InvalidPatch("patch must be a JSON object".to_string()));
    };
    let JsonValue::Object(target) = target else {
        return Err(StoreError::InvalidPatch(
            "stored document is not a JSON object".to_string(),
        ));
    };
    for (key, value) in patch {
        target.insert(key, value);
    }
    Ok(())
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn list(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|d| query.matches(&d.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        docs.sort_by(|a, b| query.compare(a, b));
        Ok(docs)
    }

    fn commit(&self, writes: Vec<Write>) -> Result<Vec<Document>, StoreError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;

        // Stage every write against (store + earlier staged writes); touch the
        // real maps only once the whole batch has validated.
        let mut staged: BTreeMap<(String, String), Option<Document>> = BTreeMap::new();
        let mut results = Vec::with_capacity(writes.len());

        for write in writes {
            let key = (write.collection().to_string(), write.id().to_string());
            let current = match staged.get(&key) {
                Some(doc) => doc.clone(),
                None => collections
                    .get(&key.0)
                    .and_then(|docs| docs.get(&key.1))
                    .cloned(),
            };

            match write {
                Write::Create {
                    collection,
                    id,
                    data,
                } => {
                    if current.is_some() {
                        return Err(StoreError::DuplicateKey { collection, id });
                    }
                    let doc = Document {
                        collection,
                        id,
                        version: 1,
                        data,
                    };
                    results.push(doc.clone());
                    staged.insert(key, Some(doc));
                }
                Write::Update {
                    collection,
                    id,
                    patch,
                    expected,
                } => {
                    let Some(mut doc) = current else {
                        return Err(StoreError::NotFound { collection, id });
                    };
                    check_version(&collection, &id, expected, doc.version)?;
                    merge(&mut doc.data, patch)?;
                    doc.version += 1;
                    results.push(doc.clone());
                    staged.insert(key, Some(doc));
                }
                Write::Delete {
                    collection,
                    id,
                    expected,
                } => match current {
                    Some(doc) => {
                        check_version(&collection, &id, expected, doc.version)?;
                        staged.insert(key, None);
                    }
                    // Deleting an absent document without a version
                    // expectation is a no-op.
                    None if expected == ExpectedVersion::Any => {}
                    None => return Err(StoreError::NotFound { collection, id }),
                },
            }
        }

        for ((collection, id), doc) in staged {
            let docs = collections.entry(collection).or_default();
            match doc {
                Some(doc) => {
                    docs.insert(id, doc);
                }
                None => {
                    docs.remove(&id);
                }
            }
        }

        Ok(results)
    }
}
