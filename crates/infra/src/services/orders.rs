//! Order lifecycle and role-scoped order accessors.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info, warn};

use tradegate_auth::{Permission, Principal, authorize, ensure_owner};
use tradegate_core::{PartyRef, UserId};
use tradegate_events::{EventBus, EventEnvelope};
use tradegate_orders::{
    ChangeStatus, DeliveryWindow, Order, OrderCommand, OrderId, OrderItem, OrderNumberSource,
    OrderStatus, PlaceOrder, SupplierView,
};
use tradegate_pricing::PriceListId;

use crate::dispatch::{EngineContext, UnitOfWork};
use crate::error::{EngineError, EngineResult};
use crate::repository::{ORDER, collections, list_values, load};
use crate::store::{DocumentStore, Query, SortDirection};

/// A snapshotted order ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer: PartyRef,
    pub supplier: PartyRef,
    pub price_list_id: PriceListId,
    pub price_list_name: String,
    pub delivery_window: DeliveryWindow,
    pub items: Vec<OrderItem>,
    pub customer_notes: Option<String>,
}

fn newest_first() -> Query {
    Query::new().order_by("order_date", SortDirection::Descending)
}

/// Whether `actor` may look at `order`. Suppliers never see orders still
/// awaiting approval.
fn can_view(actor: &Principal, order: &Order) -> bool {
    if actor.is_admin() {
        return true;
    }
    if order.customer().id == actor.user_id {
        return true;
    }
    order.supplier().id == actor.user_id && order.status().visible_to_supplier()
}

pub struct OrderLifecycle<S, B> {
    ctx: Arc<EngineContext<S, B>>,
    numbers: Arc<dyn OrderNumberSource>,
}

impl<S, B> OrderLifecycle<S, B>
where
    S: DocumentStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ctx: Arc<EngineContext<S, B>>, numbers: Arc<dyn OrderNumberSource>) -> Self {
        Self { ctx, numbers }
    }

    /// Store a new order in `pending_approval`. The order number is reserved
    /// in the same commit; a taken number is regenerated up to
    /// `max_conflict_retries` times.
    pub fn create(&self, actor: &Principal, new: NewOrder) -> EngineResult<Order> {
        authorize(actor, &Permission::ORDERS_PLACE)?;
        ensure_owner(actor, new.customer.id, "order")?;

        let config = self.ctx.config();
        let max_attempts = config.max_conflict_retries + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = Utc::now();
            let order_number = self
                .numbers
                .next(&config.order_number_prefix, now.date_naive());
            let id = OrderId::generate();

            let mut uow = UnitOfWork::new(Some(actor.user_id));
            let order = uow.stage_create(
                ORDER,
                id.aggregate_id(),
                Order::empty(id),
                OrderCommand::PlaceOrder(PlaceOrder {
                    order_id: id,
                    order_number: order_number.clone(),
                    customer: new.customer.clone(),
                    supplier: new.supplier.clone(),
                    price_list_id: new.price_list_id,
                    price_list_name: new.price_list_name.clone(),
                    delivery_window: new.delivery_window,
                    items: new.items.clone(),
                    currency: config.currency.clone(),
                    customer_notes: new.customer_notes.clone(),
                    occurred_at: now,
                }),
            )?;
            uow.reserve(
                collections::ORDER_NUMBERS,
                &order_number,
                json!({ "order_id": id.to_string() }),
            );

            match self.ctx.commit(uow) {
                Ok(()) => {
                    info!(
                        order_id = %id,
                        order_number = %order_number,
                        customer_id = %new.customer.id,
                        supplier_id = %new.supplier.id,
                        total_amount = order.total_amount(),
                        "order placed"
                    );
                    return Ok(order);
                }
                Err(EngineError::Conflict(msg)) if attempt < max_attempts => {
                    warn!(order_number = %order_number, attempt, error = %msg, "order number taken; regenerating");
                }
                Err(EngineError::Conflict(msg)) => {
                    return Err(EngineError::Conflict(format!(
                        "no free order number after {attempt} attempts: {msg}"
                    )));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Move an order along its lifecycle, validated against the stored state.
    ///
    /// Admins may take any legal edge and their note lands in `admin_notes`.
    /// Suppliers may only move their own visible orders and their note lands
    /// in `supplier_notes`.
    pub fn update_status(
        &self,
        actor: &Principal,
        order_id: OrderId,
        to: OrderStatus,
        note: Option<String>,
    ) -> EngineResult<Order> {
        let (supplier_note, admin_note) = if actor.is_admin() {
            (None, note)
        } else {
            authorize(actor, &Permission::ORDERS_FULFIL)?;
            (note, None)
        };

        let order = self.ctx.execute(
            ORDER,
            order_id.aggregate_id(),
            Some(actor.user_id),
            |order: &Order| {
                if actor.is_admin() {
                    return Ok(());
                }
                if !order.status().visible_to_supplier() {
                    return Err(EngineError::not_found(format!("order {order_id}")));
                }
                ensure_owner(actor, order.supplier().id, "order")?;
                Ok(())
            },
            OrderCommand::ChangeStatus(ChangeStatus {
                order_id,
                to,
                supplier_note,
                admin_note,
                occurred_at: Utc::now(),
            }),
        )?;

        info!(order_id = %order_id, status = %to, actor_id = %actor.user_id, "order status changed");
        Ok(order)
    }

    pub fn get_by_id(&self, actor: &Principal, order_id: OrderId) -> EngineResult<Order> {
        authorize(actor, &Permission::ORDERS_READ)?;
        let order = load::<Order, _>(self.ctx.store(), ORDER.collection, order_id)?.value;
        if !can_view(actor, &order) {
            debug!(order_id = %order_id, actor_id = %actor.user_id, "order hidden from actor");
            return Err(EngineError::not_found(format!("order {order_id}")));
        }
        Ok(order)
    }

    /// A customer's orders, newest first.
    pub fn get_by_customer(&self, actor: &Principal, customer_id: UserId) -> EngineResult<Vec<Order>> {
        authorize(actor, &Permission::ORDERS_READ)?;
        ensure_owner(actor, customer_id, "orders")?;
        list_values(
            self.ctx.store(),
            ORDER.collection,
            &newest_first().filter("customer.id", customer_id.to_string()),
        )
    }

    /// A supplier's orders in `view`, newest first. Orders awaiting approval
    /// are never returned, whoever asks.
    pub fn get_by_supplier(
        &self,
        actor: &Principal,
        supplier_id: UserId,
        view: SupplierView,
    ) -> EngineResult<Vec<Order>> {
        authorize(actor, &Permission::ORDERS_READ)?;
        ensure_owner(actor, supplier_id, "orders")?;
        let orders: Vec<Order> = list_values(
            self.ctx.store(),
            ORDER.collection,
            &newest_first().filter("supplier.id", supplier_id.to_string()),
        )?;
        Ok(orders
            .into_iter()
            .filter(|o| view.includes(o.status()))
            .collect())
    }

    /// Every order, newest first (admin).
    pub fn get_all(&self, actor: &Principal) -> EngineResult<Vec<Order>> {
        authorize(actor, &Permission::ORDERS_APPROVE)?;
        list_values(self.ctx.store(), ORDER.collection, &newest_first())
    }

    /// Orders waiting for an admin decision, oldest first.
    pub fn get_pending_approval(&self, actor: &Principal) -> EngineResult<Vec<Order>> {
        authorize(actor, &Permission::ORDERS_APPROVE)?;
        list_values(
            self.ctx.store(),
            ORDER.collection,
            &Query::new()
                .filter("status", OrderStatus::PendingApproval.as_str())
                .order_by("order_date", SortDirection::Ascending),
        )
    }
}
