use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradegate_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, PartyRef, UserId,
    aggregate_id, persisted,
};
use tradegate_events::Event;

aggregate_id!(
    /// Notification identifier.
    NotificationId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PriceListPendingApproval,
    OrderPendingApproval,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::PriceListPendingApproval => "price_list_pending_approval",
            NotificationType::OrderPendingApproval => "order_pending_approval",
        }
    }
}

impl core::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientScope {
    /// Shared admin approval inbox.
    Admins,
    User(UserId),
}

/// Aggregate root: Notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    #[serde(rename = "type")]
    notification_type: NotificationType,
    related_item_id: AggregateId,
    message: String,
    created_by: PartyRef,
    recipient: RecipientScope,
    is_read: bool,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing, default = "persisted")]
    created: bool,
}

impl Notification {
    pub fn empty(id: NotificationId) -> Self {
        Self {
            id,
            notification_type: NotificationType::OrderPendingApproval,
            related_item_id: AggregateId::nil(),
            message: String::new(),
            created_by: PartyRef::new(UserId::nil(), ""),
            recipient: RecipientScope::Admins,
            is_read: false,
            created_at: DateTime::<Utc>::MIN_UTC,
            read_at: None,
            created: false,
        }
    }

    pub fn id_typed(&self) -> NotificationId {
        self.id
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    pub fn related_item_id(&self) -> AggregateId {
        self.related_item_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn created_by(&self) -> &PartyRef {
        &self.created_by
    }

    pub fn recipient(&self) -> RecipientScope {
        self.recipient
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_at
    }
}

impl AggregateRoot for Notification {
    type Id = NotificationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitNotification {
    pub notification_id: NotificationId,
    pub notification_type: NotificationType,
    pub related_item_id: AggregateId,
    pub message: String,
    pub created_by: PartyRef,
    pub recipient: RecipientScope,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRead {
    pub notification_id: NotificationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationCommand {
    EmitNotification(EmitNotification),
    MarkRead(MarkRead),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEmitted {
    pub notification_id: NotificationId,
    pub notification_type: NotificationType,
    pub related_item_id: AggregateId,
    pub message: String,
    pub created_by: PartyRef,
    pub recipient: RecipientScope,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRead {
    pub notification_id: NotificationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationEvent {
    NotificationEmitted(NotificationEmitted),
    NotificationRead(NotificationRead),
}

impl Event for NotificationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::NotificationEmitted(_) => "notifications.notification.emitted",
            NotificationEvent::NotificationRead(_) => "notifications.notification.read",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            NotificationEvent::NotificationEmitted(e) => e.occurred_at,
            NotificationEvent::NotificationRead(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Notification {
    type Command = NotificationCommand;
    type Event = NotificationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            NotificationEvent::NotificationEmitted(e) => {
                self.id = e.notification_id;
                self.notification_type = e.notification_type;
                self.related_item_id = e.related_item_id;
                self.message = e.message.clone();
                self.created_by = e.created_by.clone();
                self.recipient = e.recipient;
                self.is_read = false;
                self.created_at = e.occurred_at;
                self.created = true;
            }
            NotificationEvent::NotificationRead(e) => {
                self.is_read = true;
                self.read_at = Some(e.occurred_at);
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            NotificationCommand::EmitNotification(cmd) => self.handle_emit(cmd),
            NotificationCommand::MarkRead(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found("notification"));
                }
                if self.id != cmd.notification_id {
                    return Err(DomainError::invariant("notification_id mismatch"));
                }
                // Retried resolutions are harmless.
                if self.is_read {
                    return Ok(vec![]);
                }
                Ok(vec![NotificationEvent::NotificationRead(NotificationRead {
                    notification_id: cmd.notification_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Notification {
    fn handle_emit(&self, cmd: &EmitNotification) -> DomainResult<Vec<NotificationEvent>> {
        if self.created {
            return Err(DomainError::conflict("notification already exists"));
        }
        if cmd.message.trim().is_empty() {
            return Err(DomainError::validation("notification message cannot be empty"));
        }

        Ok(vec![NotificationEvent::NotificationEmitted(
            NotificationEmitted {
                notification_id: cmd.notification_id,
                notification_type: cmd.notification_type,
                related_item_id: cmd.related_item_id,
                message: cmd.message.trim().to_string(),
                created_by: cmd.created_by.clone(),
                recipient: cmd.recipient,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
