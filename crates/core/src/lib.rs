//! `tradegate-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;
pub mod party;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion, persisted};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, UserId};
pub use money::{format_minor, line_total, sum_amounts};
pub use party::PartyRef;
pub use value_object::ValueObject;
