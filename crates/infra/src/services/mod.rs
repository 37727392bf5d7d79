//! Engine services, one per lifecycle.
//!
//! Services share an [`EngineContext`](crate::dispatch::EngineContext) and
//! take the acting [`Principal`](tradegate_auth::Principal) on every mutation.

pub mod associations;
pub mod catalog;
pub mod notifications;
pub mod orders;
pub mod price_lists;

pub use associations::AssociationRegistry;
pub use catalog::{CatalogService, NewCategory, NewProduct};
pub use notifications::{NewNotification, NotificationRouter};
pub use orders::{NewOrder, OrderLifecycle};
pub use price_lists::{DetailsPatch, NewPriceList, PriceListLifecycle};
