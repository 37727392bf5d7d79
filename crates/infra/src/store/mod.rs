//! Document store boundary.
//!
//! Records are JSON documents in named collections, addressed by string id
//! and carrying a store-assigned version for optimistic concurrency. Writes
//! are submitted as atomic batches so an entity and the reservation
//! documents guarding its uniqueness land together or not at all.

pub mod document;
pub mod in_memory;
pub mod query;

pub use document::{Document, DocumentStore, StoreError, Write};
pub use in_memory::InMemoryDocumentStore;
pub use query::{Query, SortDirection};
