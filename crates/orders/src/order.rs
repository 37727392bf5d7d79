use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tradegate_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, PartyRef, aggregate_id, line_total,
    persisted, sum_amounts,
};
use tradegate_events::Event;
use tradegate_pricing::PriceListId;

use crate::{OrderItem, OrderNumber, OrderStatus};

aggregate_id!(
    /// Order identifier.
    OrderId
);

/// Delivery window copied from the source price list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    customer: PartyRef,
    supplier: PartyRef,
    price_list_id: PriceListId,
    price_list_name: String,
    status: OrderStatus,
    order_date: DateTime<Utc>,
    delivery_window: DeliveryWindow,
    items: Vec<OrderItem>,
    total_amount: u64,
    currency: String,
    customer_notes: Option<String>,
    supplier_notes: Option<String>,
    admin_notes: Option<String>,
    #[serde(skip_serializing, default = "persisted")]
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            order_number: OrderNumber::new(""),
            customer: PartyRef::new(tradegate_core::UserId::nil(), ""),
            supplier: PartyRef::new(tradegate_core::UserId::nil(), ""),
            price_list_id: PriceListId::new(tradegate_core::AggregateId::nil()),
            price_list_name: String::new(),
            status: OrderStatus::PendingApproval,
            order_date: DateTime::<Utc>::MIN_UTC,
            delivery_window: DeliveryWindow {
                start: NaiveDate::MIN,
                end: NaiveDate::MIN,
            },
            items: Vec::new(),
            total_amount: 0,
            currency: String::new(),
            customer_notes: None,
            supplier_notes: None,
            admin_notes: None,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn customer(&self) -> &PartyRef {
        &self.customer
    }

    pub fn supplier(&self) -> &PartyRef {
        &self.supplier
    }

    pub fn price_list_id(&self) -> PriceListId {
        self.price_list_id
    }

    pub fn price_list_name(&self) -> &str {
        &self.price_list_name
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn delivery_window(&self) -> DeliveryWindow {
        self.delivery_window
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn customer_notes(&self) -> Option<&str> {
        self.customer_notes.as_deref()
    }

    pub fn supplier_notes(&self) -> Option<&str> {
        self.supplier_notes.as_deref()
    }

    pub fn admin_notes(&self) -> Option<&str> {
        self.admin_notes.as_deref()
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: PlaceOrder.
///
/// There is no status or total input: new orders always await approval and
/// the total is derived from the items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub customer: PartyRef,
    pub supplier: PartyRef,
    pub price_list_id: PriceListId,
    pub price_list_name: String,
    pub delivery_window: DeliveryWindow,
    pub items: Vec<OrderItem>,
    pub currency: String,
    pub customer_notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub order_id: OrderId,
    pub to: OrderStatus,
    pub supplier_note: Option<String>,
    pub admin_note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    ChangeStatus(ChangeStatus),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub customer: PartyRef,
    pub supplier: PartyRef,
    pub price_list_id: PriceListId,
    pub price_list_name: String,
    pub delivery_window: DeliveryWindow,
    pub items: Vec<OrderItem>,
    pub total_amount: u64,
    pub currency: String,
    pub customer_notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub supplier_note: Option<String>,
    pub admin_note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderStatusChanged(OrderStatusChanged),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::OrderStatusChanged(_) => "orders.order.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::OrderStatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.order_number = e.order_number.clone();
                self.customer = e.customer.clone();
                self.supplier = e.supplier.clone();
                self.price_list_id = e.price_list_id;
                self.price_list_name = e.price_list_name.clone();
                self.status = OrderStatus::PendingApproval;
                self.order_date = e.occurred_at;
                self.delivery_window = e.delivery_window;
                self.items = e.items.clone();
                self.total_amount = e.total_amount;
                self.currency = e.currency.clone();
                self.customer_notes = e.customer_notes.clone();
                self.created = true;
            }
            OrderEvent::OrderStatusChanged(e) => {
                self.status = e.to;
                if e.supplier_note.is_some() {
                    self.supplier_notes = e.supplier_note.clone();
                }
                if e.admin_note.is_some() {
                    self.admin_notes = e.admin_note.clone();
                }
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
        }
    }
}

impl Order {
    fn ensure_exists(&self, order_id: OrderId) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found("order"));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> DomainResult<Vec<OrderEvent>> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        if cmd.order_number.as_str().trim().is_empty() {
            return Err(DomainError::validation("order number cannot be empty"));
        }
        if cmd.customer.id == cmd.supplier.id {
            return Err(DomainError::validation(
                "customer and supplier must be different accounts",
            ));
        }
        if cmd.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        if cmd.currency.trim().is_empty() {
            return Err(DomainError::validation("currency cannot be empty"));
        }
        if cmd.delivery_window.end < cmd.delivery_window.start {
            return Err(DomainError::validation(
                "delivery window ends before it starts",
            ));
        }

        let mut items = cmd.items.clone();
        for item in &mut items {
            if item.quantity_regular == 0 && item.quantity_vac == 0 {
                return Err(DomainError::validation(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
            item.total = line_total(item.quantity_regular, item.unit_price)?;
        }
        let total_amount = sum_amounts(items.iter().map(|i| i.total))?;

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            customer: cmd.customer.clone(),
            supplier: cmd.supplier.clone(),
            price_list_id: cmd.price_list_id,
            price_list_name: cmd.price_list_name.clone(),
            delivery_window: cmd.delivery_window,
            items,
            total_amount,
            currency: cmd.currency.clone(),
            customer_notes: cmd.customer_notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> DomainResult<Vec<OrderEvent>> {
        self.ensure_exists(cmd.order_id)?;

        if !self.status.can_transition_to(cmd.to) {
            return Err(DomainError::invalid_transition(self.status, cmd.to));
        }

        Ok(vec![OrderEvent::OrderStatusChanged(OrderStatusChanged {
            order_id: cmd.order_id,
            from: self.status,
            to: cmd.to,
            supplier_note: cmd.supplier_note.clone(),
            admin_note: cmd.admin_note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradegate_catalog::{CategoryId, ProductId};
    use tradegate_core::UserId;

    fn item(regular: u32, vac: u32, unit_price: u64, claimed_total: u64) -> OrderItem {
        OrderItem {
            product_id: ProductId::generate(),
            product_name: "Cod fillet".to_string(),
            category_id: CategoryId::generate(),
            category_name: "Fish".to_string(),
            quantity_regular: regular,
            quantity_vac: vac,
            unit_price,
            vac_surcharge_at_order: Some(150),
            total: claimed_total,
        }
    }

    fn place_command(id: OrderId, items: Vec<OrderItem>) -> PlaceOrder {
        PlaceOrder {
            order_id: id,
            order_number: OrderNumber::new("ORD-20240101-ABC123"),
            customer: PartyRef::new(UserId::new(), "Harbour Bistro"),
            supplier: PartyRef::new(UserId::new(), "North Sea Fishery"),
            price_list_id: PriceListId::generate(),
            price_list_name: "01.01.2024 - 07.01.2024".to_string(),
            delivery_window: DeliveryWindow {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            },
            items,
            currency: "EUR".to_string(),
            customer_notes: Some("back door".to_string()),
            occurred_at: Utc::now(),
        }
    }

    fn placed(items: Vec<OrderItem>) -> Order {
        let id = OrderId::generate();
        let mut order = Order::empty(id);
        for e in order
            .handle(&OrderCommand::PlaceOrder(place_command(id, items)))
            .unwrap()
        {
            order.apply(&e);
        }
        order
    }

    fn change(order: &mut Order, to: OrderStatus) -> DomainResult<()> {
        let events = order.handle(&OrderCommand::ChangeStatus(ChangeStatus {
            order_id: order.id_typed(),
            to,
            supplier_note: None,
            admin_note: None,
            occurred_at: Utc::now(),
        }))?;
        for e in &events {
            order.apply(e);
        }
        Ok(())
    }

    #[test]
    fn placed_order_awaits_approval_with_recomputed_total() {
        // Client-claimed totals are ignored.
        let order = placed(vec![item(3, 2, 1_000, 99_999), item(1, 0, 250, 0)]);
        assert_eq!(order.status(), OrderStatus::PendingApproval);
        assert_eq!(order.items()[0].total, 3_000);
        assert_eq!(order.total_amount(), 3_250);
        assert_eq!(order.customer_notes(), Some("back door"));
    }

    #[test]
    fn empty_order_is_rejected() {
        let id = OrderId::generate();
        let err = Order::empty(id)
            .handle(&OrderCommand::PlaceOrder(place_command(id, vec![])))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_quantity_line_is_rejected() {
        let id = OrderId::generate();
        let err = Order::empty(id)
            .handle(&OrderCommand::PlaceOrder(place_command(
                id,
                vec![item(0, 0, 1_000, 0)],
            )))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn full_fulfilment_path() {
        let mut order = placed(vec![item(1, 0, 1_000, 0)]);
        for to in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            change(&mut order, to).unwrap();
            assert_eq!(order.status(), to);
        }
    }

    #[test]
    fn delivered_order_cannot_go_back_to_pending() {
        let mut order = placed(vec![item(1, 0, 1_000, 0)]);
        for to in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            change(&mut order, to).unwrap();
        }
        let before = order.clone();

        let err = change(&mut order, OrderStatus::Pending).unwrap_err();
        assert_eq!(
            err,
            DomainError::invalid_transition("delivered", "pending")
        );
        assert_eq!(order, before);
    }

    #[test]
    fn rejection_cancels_pending_approval() {
        let mut order = placed(vec![item(1, 0, 1_000, 0)]);
        change(&mut order, OrderStatus::Cancelled).unwrap();
        assert!(order.status().is_terminal());
    }

    #[test]
    fn notes_attach_on_status_change() {
        let mut order = placed(vec![item(1, 0, 1_000, 0)]);
        let events = order
            .handle(&OrderCommand::ChangeStatus(ChangeStatus {
                order_id: order.id_typed(),
                to: OrderStatus::Pending,
                supplier_note: None,
                admin_note: Some("approved, regular customer".to_string()),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        order.apply(&events[0]);
        assert_eq!(order.admin_notes(), Some("approved, regular customer"));
        assert_eq!(order.supplier_notes(), None);
    }

    #[test]
    fn stored_order_round_trips() {
        let order = placed(vec![item(3, 2, 1_000, 0)]);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "pending_approval");
        assert_eq!(json["order_number"], "ORD-20240101-ABC123");
        let restored: Order = serde_json::from_value(json).unwrap();
        assert_eq!(restored, order);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: order totals sum regular quantities only.
            #[test]
            fn order_total_excludes_vac(
                lines in proptest::collection::vec((1u32..500, 0u32..500, 1u64..100_000), 1..6)
            ) {
                let items: Vec<OrderItem> = lines
                    .iter()
                    .map(|(regular, vac, price)| item(*regular, *vac, *price, 0))
                    .collect();
                let expected: u64 = lines
                    .iter()
                    .map(|(regular, _, price)| u64::from(*regular) * price)
                    .sum();

                let order = placed(items);
                prop_assert_eq!(order.total_amount(), expected);
            }
        }
    }
}
