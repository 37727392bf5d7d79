//! Command execution against stored aggregates.
//!
//! ```text
//! load document -> handle command -> apply events -> commit writes -> publish
//! ```
//!
//! Writes for one logical operation are gathered in a [`UnitOfWork`] and
//! committed as a single atomic batch. Events are published only after the
//! commit succeeds; a failed publish is logged and never undoes the commit.

use core::fmt::Display;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use tradegate_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, UserId};
use tradegate_events::{Event, EventBus, EventEnvelope};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::repository::{AggregateKind, Versioned, encode, load};
use crate::store::{DocumentStore, Write};

/// Run `command` against `aggregate` without touching it.
///
/// Returns the post-command state and the decided events. An empty event
/// list means the command was a no-op.
pub fn decide<A>(aggregate: &A, command: A::Command) -> EngineResult<(A, Vec<A::Event>)>
where
    A: Aggregate<Error = DomainError> + Clone,
{
    let events = aggregate.handle(&command)?;
    let mut next = aggregate.clone();
    for event in &events {
        next.apply(event);
    }
    Ok((next, events))
}

/// Writes and events of one logical operation.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    actor_id: Option<UserId>,
    writes: Vec<Write>,
    events: Vec<EventEnvelope<JsonValue>>,
}

impl UnitOfWork {
    pub fn new(actor_id: Option<UserId>) -> Self {
        Self {
            actor_id,
            writes: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    /// Insert a new aggregate document.
    pub fn create<T: Serialize>(
        &mut self,
        collection: &str,
        id: impl Display,
        value: &T,
    ) -> EngineResult<()> {
        self.writes
            .push(Write::create(collection, id.to_string(), encode(value)?));
        Ok(())
    }

    /// Replace an aggregate document read at `version`.
    pub fn update<T: Serialize>(
        &mut self,
        collection: &str,
        id: impl Display,
        value: &T,
        version: u64,
    ) -> EngineResult<()> {
        self.writes.push(Write::update(
            collection,
            id.to_string(),
            encode(value)?,
            ExpectedVersion::Exact(version),
        ));
        Ok(())
    }

    pub fn delete(&mut self, collection: &str, id: impl Display, expected: ExpectedVersion) {
        self.writes
            .push(Write::delete(collection, id.to_string(), expected));
    }

    /// Claim a unique key. The commit fails with a duplicate-key conflict if
    /// the key is already held.
    pub fn reserve(&mut self, collection: &str, key: impl Display, data: JsonValue) {
        self.writes.push(Write::create(collection, key.to_string(), data));
    }

    /// Decide `command` against a freshly created aggregate and stage its
    /// insert plus events.
    pub fn stage_create<A>(
        &mut self,
        kind: AggregateKind,
        id: AggregateId,
        empty: A,
        command: A::Command,
    ) -> EngineResult<A>
    where
        A: Aggregate<Error = DomainError> + Clone + Serialize,
        A::Event: Event + Serialize,
    {
        let (next, events) = decide(&empty, command)?;
        self.create(kind.collection, id, &next)?;
        self.record(kind.aggregate_type, id, 1, &events)?;
        Ok(next)
    }

    /// Decide `command` against a stored aggregate and stage the update plus
    /// events. No-op commands stage nothing.
    pub fn stage_update<A>(
        &mut self,
        kind: AggregateKind,
        id: AggregateId,
        current: &Versioned<A>,
        command: A::Command,
    ) -> EngineResult<A>
    where
        A: Aggregate<Error = DomainError> + Clone + Serialize,
        A::Event: Event + Serialize,
    {
        let (next, events) = decide(&current.value, command)?;
        if !events.is_empty() {
            self.update(kind.collection, id, &next, current.version)?;
            self.record(kind.aggregate_type, id, current.version + 1, &events)?;
        }
        Ok(next)
    }

    /// Queue `events` for publication once the commit succeeds.
    ///
    /// `document_version` is the version the aggregate document will have
    /// after the commit.
    pub fn record<E>(
        &mut self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        document_version: u64,
        events: &[E],
    ) -> EngineResult<()>
    where
        E: Event + Serialize,
    {
        for event in events {
            let payload = serde_json::to_value(event).map_err(|e| {
                EngineError::Store(format!("event serialization failed: {e}"))
            })?;
            self.events.push(EventEnvelope::new(
                Uuid::now_v7(),
                aggregate_id,
                aggregate_type,
                event.event_type(),
                document_version,
                self.actor_id,
                event.occurred_at(),
                payload,
            ));
        }
        Ok(())
    }
}

/// Store, bus and configuration shared by the services.
#[derive(Debug)]
pub struct EngineContext<S, B> {
    store: S,
    bus: B,
    config: EngineConfig,
}

impl<S, B> EngineContext<S, B> {
    pub fn new(store: S, bus: B, config: EngineConfig) -> Self {
        Self { store, bus, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_parts(self) -> (S, B, EngineConfig) {
        (self.store, self.bus, self.config)
    }
}

impl<S, B> EngineContext<S, B>
where
    S: DocumentStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Commit `uow` atomically, then publish its events.
    pub fn commit(&self, uow: UnitOfWork) -> EngineResult<()> {
        if uow.writes.is_empty() {
            return Ok(());
        }

        self.store.commit(uow.writes)?;

        for envelope in uow.events {
            let event_type = envelope.event_type().to_string();
            if let Err(err) = self.bus.publish(envelope) {
                tracing::warn!(event_type = %event_type, error = ?err, "event publication failed after commit");
            }
        }
        Ok(())
    }

    /// Create a single aggregate.
    pub fn insert<A>(
        &self,
        kind: AggregateKind,
        id: AggregateId,
        actor_id: Option<UserId>,
        empty: A,
        command: A::Command,
    ) -> EngineResult<A>
    where
        A: Aggregate<Error = DomainError> + Clone + Serialize,
        A::Event: Event + Serialize,
    {
        let mut uow = UnitOfWork::new(actor_id);
        let created = uow.stage_create(kind, id, empty, command)?;
        self.commit(uow)?;
        Ok(created)
    }

    /// Load, check `guard`, decide and commit a single-aggregate command,
    /// retrying on concurrent modification.
    pub fn execute<A>(
        &self,
        kind: AggregateKind,
        id: AggregateId,
        actor_id: Option<UserId>,
        guard: impl Fn(&A) -> EngineResult<()>,
        command: A::Command,
    ) -> EngineResult<A>
    where
        A: Aggregate<Error = DomainError> + Clone + Serialize + DeserializeOwned,
        A::Event: Event + Serialize,
    {
        self.with_retry(kind.aggregate_type, || {
            let current = load::<A, _>(&self.store, kind.collection, id)?;
            guard(&current.value)?;
            let mut uow = UnitOfWork::new(actor_id);
            let next = uow.stage_update(kind, id, &current, command.clone())?;
            self.commit(uow)?;
            Ok(next)
        })
    }

    /// Run `op`, retrying optimistic-concurrency failures up to
    /// `max_conflict_retries` times.
    pub fn with_retry<T>(
        &self,
        operation: &str,
        mut op: impl FnMut() -> EngineResult<T>,
    ) -> EngineResult<T> {
        let max = self.config.max_conflict_retries;
        let mut attempt = 0;
        loop {
            match op() {
                Err(err) if err.is_retryable() && attempt < max => {
                    attempt += 1;
                    tracing::warn!(operation, attempt, error = %err, "retrying after concurrent modification");
                }
                Err(err) if err.is_retryable() => {
                    return Err(EngineError::Conflict(format!(
                        "{operation} lost to concurrent updates after {} attempts: {err}",
                        attempt + 1
                    )));
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use chrono::Utc;
    use serde_json::json;
    use std::cell::Cell;
    use tradegate_events::InMemoryEventBus;
    use tradegate_notifications::{
        EmitNotification, Notification, NotificationCommand, NotificationId, NotificationType,
        RecipientScope,
    };
    use tradegate_core::PartyRef;

    type Ctx = EngineContext<InMemoryDocumentStore, InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn ctx() -> Ctx {
        EngineContext::new(
            InMemoryDocumentStore::new(),
            InMemoryEventBus::new(),
            EngineConfig::default(),
        )
    }

    fn emit(id: NotificationId) -> NotificationCommand {
        NotificationCommand::EmitNotification(EmitNotification {
            notification_id: id,
            notification_type: NotificationType::OrderPendingApproval,
            related_item_id: AggregateId::new(),
            message: "New order awaits approval".to_string(),
            created_by: PartyRef::new(UserId::new(), "Harbour Bistro"),
            recipient: RecipientScope::Admins,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn decide_leaves_the_input_untouched() {
        let id = NotificationId::generate();
        let empty = Notification::empty(id);
        let (next, events) = decide(&empty, emit(id)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(!next.is_read());
        assert_eq!(empty, Notification::empty(id));
    }

    #[test]
    fn commit_publishes_after_store_write() {
        let ctx = ctx();
        let sub = ctx.bus().subscribe();
        let id = NotificationId::generate();
        let (next, events) = decide(&Notification::empty(id), emit(id)).unwrap();

        let actor = UserId::new();
        let mut uow = UnitOfWork::new(Some(actor));
        uow.create("notifications", id, &next).unwrap();
        uow.record("notifications.notification", id.aggregate_id(), 1, &events)
            .unwrap();
        ctx.commit(uow).unwrap();

        assert!(ctx.store().get("notifications", &id.to_string()).unwrap().is_some());
        let published = sub.drain();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type(), "notifications.notification.emitted");
        assert_eq!(published[0].document_version(), 1);
        assert_eq!(published[0].actor_id(), Some(actor));
    }

    #[test]
    fn failed_commit_publishes_nothing() {
        let ctx = ctx();
        let sub = ctx.bus().subscribe();
        ctx.store().create("keys", "k", json!({})).unwrap();

        let id = NotificationId::generate();
        let (next, events) = decide(&Notification::empty(id), emit(id)).unwrap();
        let mut uow = UnitOfWork::new(None);
        uow.create("notifications", id, &next).unwrap();
        uow.reserve("keys", "k", json!({}));
        uow.record("notifications.notification", id.aggregate_id(), 1, &events)
            .unwrap();

        assert!(ctx.commit(uow).is_err());
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn retry_gives_up_with_a_conflict() {
        let ctx = ctx();
        let calls = Cell::new(0);
        let result: EngineResult<()> = ctx.with_retry("test", || {
            calls.set(calls.get() + 1);
            Err(EngineError::Concurrency("stale".to_string()))
        });
        assert!(matches!(result, Err(EngineError::Conflict(_))));
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn retry_does_not_repeat_other_failures() {
        let ctx = ctx();
        let calls = Cell::new(0);
        let result: EngineResult<()> = ctx.with_retry("test", || {
            calls.set(calls.get() + 1);
            Err(EngineError::Validation("bad".to_string()))
        });
        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(calls.get(), 1);
    }
}
