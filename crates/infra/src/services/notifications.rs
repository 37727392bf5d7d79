//! Approval inbox.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use tradegate_auth::{AuthzError, Permission, Principal, authorize};
use tradegate_core::{AggregateId, PartyRef};
use tradegate_events::{EventBus, EventEnvelope};
use tradegate_notifications::{
    EmitNotification, MarkRead, Notification, NotificationCommand, NotificationId,
    NotificationType, RecipientScope,
};

use crate::dispatch::{EngineContext, UnitOfWork};
use crate::error::{EngineError, EngineResult};
use crate::repository::{NOTIFICATION, Versioned, encode, find, list, list_values};
use crate::store::{DocumentStore, Query, SortDirection};

fn ensure_can_read(actor: &Principal, scope: RecipientScope) -> EngineResult<()> {
    authorize(actor, &Permission::NOTIFICATIONS_READ)?;
    match scope {
        RecipientScope::Admins if !actor.is_admin() => {
            Err(AuthzError::Forbidden("admin inbox".to_string()).into())
        }
        RecipientScope::User(user_id) if user_id != actor.user_id && !actor.is_admin() => {
            Err(AuthzError::NotOwner("notifications".to_string()).into())
        }
        _ => Ok(()),
    }
}

/// A notification to be emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub notification_type: NotificationType,
    pub related_item_id: AggregateId,
    pub message: String,
    pub created_by: PartyRef,
    pub recipient: RecipientScope,
}

pub struct NotificationRouter<S, B> {
    ctx: Arc<EngineContext<S, B>>,
}

impl<S, B> NotificationRouter<S, B>
where
    S: DocumentStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ctx: Arc<EngineContext<S, B>>) -> Self {
        Self { ctx }
    }

    pub fn emit(&self, new: NewNotification) -> EngineResult<Notification> {
        let id = NotificationId::generate();
        let notification = self.ctx.insert(
            NOTIFICATION,
            id.aggregate_id(),
            Some(new.created_by.id),
            Notification::empty(id),
            NotificationCommand::EmitNotification(EmitNotification {
                notification_id: id,
                notification_type: new.notification_type,
                related_item_id: new.related_item_id,
                message: new.message,
                created_by: new.created_by,
                recipient: new.recipient,
                occurred_at: Utc::now(),
            }),
        )?;

        info!(
            notification_id = %id,
            notification_type = notification.notification_type().as_str(),
            related_item_id = %notification.related_item_id(),
            "notification emitted"
        );
        Ok(notification)
    }

    /// Unread notifications for `scope`, newest first.
    pub fn list_unread(
        &self,
        actor: &Principal,
        scope: RecipientScope,
    ) -> EngineResult<Vec<Notification>> {
        ensure_can_read(actor, scope)?;
        list_values(
            self.ctx.store(),
            NOTIFICATION.collection,
            &Query::new()
                .filter("recipient", encode(&scope)?)
                .filter("is_read", false)
                .order_by("created_at", SortDirection::Descending),
        )
    }

    /// Mark one notification read. Already-read notifications are left as is.
    pub fn mark_read(
        &self,
        actor: &Principal,
        notification_id: NotificationId,
    ) -> EngineResult<Notification> {
        self.ctx.execute(
            NOTIFICATION,
            notification_id.aggregate_id(),
            Some(actor.user_id),
            |n: &Notification| ensure_can_read(actor, n.recipient()),
            NotificationCommand::MarkRead(MarkRead {
                notification_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Resolve every unread notification of `notification_type` about
    /// `related_item_id`. Returns how many were marked read.
    pub fn mark_read_for_item(
        &self,
        actor: &Principal,
        notification_type: NotificationType,
        related_item_id: AggregateId,
    ) -> EngineResult<usize> {
        self.ctx.with_retry("mark_notifications_read", || {
            let unread: Vec<Versioned<Notification>> = list(
                self.ctx.store(),
                NOTIFICATION.collection,
                &Query::new()
                    .filter("type", notification_type.as_str())
                    .filter("related_item_id", related_item_id.to_string())
                    .filter("is_read", false),
            )?;
            if unread.is_empty() {
                debug!(related_item_id = %related_item_id, "no unread notifications to resolve");
                return Ok(0);
            }

            let now = Utc::now();
            let mut uow = UnitOfWork::new(Some(actor.user_id));
            for current in &unread {
                ensure_can_read(actor, current.value.recipient())?;
                let id = current.value.id_typed();
                uow.stage_update(
                    NOTIFICATION,
                    id.aggregate_id(),
                    current,
                    NotificationCommand::MarkRead(MarkRead {
                        notification_id: id,
                        occurred_at: now,
                    }),
                )?;
            }
            self.ctx.commit(uow)?;

            info!(related_item_id = %related_item_id, count = unread.len(), "notifications resolved");
            Ok(unread.len())
        })
    }

    pub fn get(&self, notification_id: NotificationId) -> EngineResult<Notification> {
        find::<Notification, _>(self.ctx.store(), NOTIFICATION.collection, notification_id)?
            .map(|v| v.value)
            .ok_or_else(|| EngineError::not_found(format!("notification {notification_id}")))
    }
}
