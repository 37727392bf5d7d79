//! Approval inbox notifications.

pub mod notification;

pub use notification::{
    EmitNotification, MarkRead, Notification, NotificationCommand, NotificationEmitted,
    NotificationEvent, NotificationId, NotificationRead, NotificationType, RecipientScope,
};
