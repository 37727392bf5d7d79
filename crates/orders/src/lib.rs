//! Order domain module.
//!
//! Orders are placed against a supplier's active price list. Line prices are
//! frozen into [`OrderItem`]s at placement, and the status machine gates what
//! suppliers may see.

pub mod item;
pub mod number;
pub mod order;
pub mod snapshot;
pub mod status;

pub use item::OrderItem;
pub use number::{OrderNumber, OrderNumberSource, RandomOrderNumbers};
pub use order::{
    ChangeStatus, DeliveryWindow, Order, OrderCommand, OrderEvent, OrderId, OrderPlaced,
    OrderStatusChanged, PlaceOrder,
};
pub use snapshot::{CartLine, LineRequest, price_lines, snapshot};
pub use status::{OrderStatus, SupplierView};
