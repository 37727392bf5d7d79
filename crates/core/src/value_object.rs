//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one. Order line snapshots and party references are value
/// objects; price lists and orders are entities.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
