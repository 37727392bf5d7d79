//! Infrastructure layer: document store, repositories, services, workflows.
//!
//! Domain crates decide; this crate loads, stores, publishes and enforces the
//! rules that span more than one document (one active price list per
//! supplier, unique association pairs, unique order numbers).

pub mod config;
pub mod dispatch;
pub mod error;
pub mod marketplace;
pub mod repository;
pub mod services;
pub mod store;

pub use config::EngineConfig;
pub use dispatch::{EngineContext, UnitOfWork};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use marketplace::{Marketplace, OrderRequest};
pub use store::{DocumentStore, InMemoryDocumentStore, Query, SortDirection, StoreError, Write};
