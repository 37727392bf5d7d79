use chrono::{DateTime, Utc};

/// A lifecycle fact emitted by an aggregate once a command has been accepted.
///
/// `event_type` names follow `<context>.<record>.<verb>`, for example
/// `pricing.price_list.activated` or `orders.order.status_changed`. Bump
/// `version` whenever the payload shape changes.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;

    fn version(&self) -> u32;

    /// Business time of the change, taken from the command.
    fn occurred_at(&self) -> DateTime<Utc>;
}
