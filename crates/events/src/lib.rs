//! Lifecycle events and their distribution.
//!
//! Aggregates emit typed events; the infrastructure layer wraps committed
//! events in an [`EventEnvelope`] and publishes them on an [`EventBus`] for
//! downstream consumers (exporters, audit, read-model builders).

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
