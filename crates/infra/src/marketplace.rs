//! Cross-lifecycle workflows.
//!
//! [`Marketplace`] wires the services together and runs the operations that
//! span more than one of them: placing an order against an active price
//! list, submitting and deciding price lists, and deciding orders. Approval
//! notifications are a side channel; failing to emit or resolve one is
//! logged and never undoes the main transition.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use tradegate_auth::{Permission, Principal, Role, authorize, ensure_role};
use tradegate_core::{AggregateId, PartyRef, UserId};
use tradegate_events::{EventBus, EventEnvelope};
use tradegate_notifications::{NotificationType, RecipientScope};
use tradegate_orders::{
    DeliveryWindow, LineRequest, Order, OrderId, OrderNumberSource, OrderStatus,
    RandomOrderNumbers, price_lines, snapshot,
};
use tradegate_pricing::{PriceList, PriceListId, PriceListStatus};

use crate::config::EngineConfig;
use crate::dispatch::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::services::{
    AssociationRegistry, CatalogService, NewNotification, NewOrder, NotificationRouter,
    OrderLifecycle, PriceListLifecycle,
};
use crate::store::DocumentStore;

/// A customer's order request against a supplier's price list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub supplier_id: UserId,
    /// The list the customer was shown; it must still be the active one.
    pub price_list_id: PriceListId,
    /// A narrower window inside the list's own dates. `None` takes the whole
    /// list window.
    pub delivery: Option<DeliveryWindow>,
    pub lines: Vec<LineRequest>,
    pub customer_notes: Option<String>,
}

pub struct Marketplace<S, B> {
    ctx: Arc<EngineContext<S, B>>,
    catalog: CatalogService<S, B>,
    price_lists: PriceListLifecycle<S, B>,
    associations: AssociationRegistry<S, B>,
    orders: OrderLifecycle<S, B>,
    notifications: NotificationRouter<S, B>,
}

impl<S, B> Marketplace<S, B>
where
    S: DocumentStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(store: S, bus: B, config: EngineConfig) -> Self {
        Self::with_order_numbers(store, bus, config, Arc::new(RandomOrderNumbers))
    }

    pub fn with_order_numbers(
        store: S,
        bus: B,
        config: EngineConfig,
        numbers: Arc<dyn OrderNumberSource>,
    ) -> Self {
        let ctx = Arc::new(EngineContext::new(store, bus, config));
        Self {
            catalog: CatalogService::new(ctx.clone()),
            price_lists: PriceListLifecycle::new(ctx.clone()),
            associations: AssociationRegistry::new(ctx.clone()),
            orders: OrderLifecycle::new(ctx.clone(), numbers),
            notifications: NotificationRouter::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &EngineContext<S, B> {
        &self.ctx
    }

    pub fn catalog(&self) -> &CatalogService<S, B> {
        &self.catalog
    }

    pub fn price_lists(&self) -> &PriceListLifecycle<S, B> {
        &self.price_lists
    }

    pub fn associations(&self) -> &AssociationRegistry<S, B> {
        &self.associations
    }

    pub fn orders(&self) -> &OrderLifecycle<S, B> {
        &self.orders
    }

    pub fn notifications(&self) -> &NotificationRouter<S, B> {
        &self.notifications
    }

    /// Place an order for the acting customer.
    ///
    /// Unit prices come from the supplier's active price list and are frozen
    /// into the order together with the category surcharges in effect now.
    pub fn place_order(&self, actor: &Principal, request: OrderRequest) -> EngineResult<Order> {
        ensure_role(actor, Role::Customer)?;
        authorize(actor, &Permission::ORDERS_PLACE)?;

        if !self
            .associations
            .is_eligible(actor.user_id, request.supplier_id)?
        {
            return Err(EngineError::Authorization(format!(
                "not associated with supplier {}",
                request.supplier_id
            )));
        }

        let price_list = self
            .price_lists
            .get_active_by_supplier(request.supplier_id)?
            .ok_or_else(|| {
                EngineError::Validation(format!(
                    "supplier {} has no active price list",
                    request.supplier_id
                ))
            })?;
        if price_list.id_typed() != request.price_list_id {
            return Err(EngineError::Conflict(format!(
                "price list {} is no longer active",
                request.price_list_id
            )));
        }

        let delivery_window = delivery_window_within(&price_list, request.delivery)?;
        let cart = price_lines(&request.lines, &price_list)?;
        let lookup = self.catalog.category_lookup(request.supplier_id)?;
        for line in &cart {
            if !lookup.get(line.product_id).is_some_and(|e| e.orderable) {
                return Err(EngineError::Validation(format!(
                    "product {} is not orderable",
                    line.product_id
                )));
            }
        }
        let items = snapshot(&cart, &price_list, &lookup)?;

        let order = self.orders.create(
            actor,
            NewOrder {
                customer: actor.as_party(),
                supplier: PartyRef::new(price_list.supplier_id(), price_list.supplier_name()),
                price_list_id: price_list.id_typed(),
                price_list_name: price_list.name().to_string(),
                delivery_window,
                items,
                customer_notes: request.customer_notes,
            },
        )?;

        if self.ctx.config().order_approval_required {
            self.notify_admins(
                NotificationType::OrderPendingApproval,
                order.id_typed().aggregate_id(),
                format!(
                    "Order {} from {} awaits approval",
                    order.order_number(),
                    order.customer().name
                ),
                actor.as_party(),
            );
        }
        Ok(order)
    }

    /// Submit a list. With price list approval on it goes to the admin inbox;
    /// otherwise it is activated straight away.
    pub fn submit_price_list(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
    ) -> EngineResult<PriceList> {
        if !self.ctx.config().price_list_approval_required {
            return self.price_lists.activate(actor, price_list_id);
        }

        let before = self.price_lists.get_with_items(price_list_id)?.status();
        let list = self.price_lists.submit_for_approval(actor, price_list_id)?;
        if before != PriceListStatus::PendingApproval {
            self.notify_admins(
                NotificationType::PriceListPendingApproval,
                price_list_id.aggregate_id(),
                format!(
                    "Price list {} from {} awaits approval",
                    list.name(),
                    list.supplier_name()
                ),
                actor.as_party(),
            );
        }
        Ok(list)
    }

    /// Admin approval: activate the list and resolve its notifications.
    pub fn approve_price_list(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
    ) -> EngineResult<PriceList> {
        authorize(actor, &Permission::PRICE_LISTS_APPROVE)?;
        let list = self.price_lists.activate(actor, price_list_id)?;
        self.resolve(
            actor,
            NotificationType::PriceListPendingApproval,
            price_list_id.aggregate_id(),
        );
        Ok(list)
    }

    /// Admin rejection: return the list to draft and resolve its
    /// notifications.
    pub fn reject_price_list(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
        reason: Option<String>,
    ) -> EngineResult<PriceList> {
        let list = self.price_lists.reject(actor, price_list_id, reason)?;
        self.resolve(
            actor,
            NotificationType::PriceListPendingApproval,
            price_list_id.aggregate_id(),
        );
        Ok(list)
    }

    /// Change an order's status. When an admin moves an order to `pending`
    /// or `cancelled` its approval notifications are resolved.
    pub fn update_order_status(
        &self,
        actor: &Principal,
        order_id: OrderId,
        to: OrderStatus,
        note: Option<String>,
    ) -> EngineResult<Order> {
        let order = self.orders.update_status(actor, order_id, to, note)?;
        if actor.is_admin() && matches!(to, OrderStatus::Pending | OrderStatus::Cancelled) {
            self.resolve(
                actor,
                NotificationType::OrderPendingApproval,
                order_id.aggregate_id(),
            );
        }
        Ok(order)
    }

    /// pending_approval → pending.
    pub fn approve_order(
        &self,
        actor: &Principal,
        order_id: OrderId,
        note: Option<String>,
    ) -> EngineResult<Order> {
        self.decide_order(actor, order_id, OrderStatus::Pending, note)
    }

    /// pending_approval → cancelled.
    pub fn reject_order(
        &self,
        actor: &Principal,
        order_id: OrderId,
        note: Option<String>,
    ) -> EngineResult<Order> {
        self.decide_order(actor, order_id, OrderStatus::Cancelled, note)
    }

    /// Apply an admin decision. An order already in the decided state only
    /// gets its notifications resolved, so a retried decision is harmless.
    fn decide_order(
        &self,
        actor: &Principal,
        order_id: OrderId,
        decision: OrderStatus,
        note: Option<String>,
    ) -> EngineResult<Order> {
        authorize(actor, &Permission::ORDERS_APPROVE)?;

        let current = self.orders.get_by_id(actor, order_id)?;
        match current.status() {
            OrderStatus::PendingApproval => {
                let order = self.update_order_status(actor, order_id, decision, note)?;
                info!(order_id = %order_id, decision = %decision, "order decided");
                Ok(order)
            }
            status if status == decision => {
                debug!(order_id = %order_id, status = %status, "order already decided; resolving notifications only");
                self.resolve(
                    actor,
                    NotificationType::OrderPendingApproval,
                    order_id.aggregate_id(),
                );
                Ok(current)
            }
            status => Err(EngineError::Conflict(format!(
                "order {} is {status}, not awaiting approval",
                current.order_number()
            ))),
        }
    }

    fn notify_admins(
        &self,
        notification_type: NotificationType,
        related_item_id: AggregateId,
        message: String,
        created_by: PartyRef,
    ) {
        let emitted = self.notifications.emit(NewNotification {
            notification_type,
            related_item_id,
            message,
            created_by,
            recipient: RecipientScope::Admins,
        });
        if let Err(err) = emitted {
            warn!(
                notification_type = notification_type.as_str(),
                related_item_id = %related_item_id,
                error = %err,
                "approval notification could not be emitted"
            );
        }
    }

    fn resolve(
        &self,
        actor: &Principal,
        notification_type: NotificationType,
        related_item_id: AggregateId,
    ) {
        if let Err(err) =
            self.notifications
                .mark_read_for_item(actor, notification_type, related_item_id)
        {
            warn!(
                notification_type = notification_type.as_str(),
                related_item_id = %related_item_id,
                error = %err,
                "approval notification left unread; retrying the decision resolves it"
            );
        }
    }
}

/// The order's delivery window: the list's dates, or a requested sub-window
/// that must lie inside them.
fn delivery_window_within(
    price_list: &PriceList,
    requested: Option<DeliveryWindow>,
) -> EngineResult<DeliveryWindow> {
    let list_window = DeliveryWindow {
        start: price_list.effective_date(),
        end: price_list.expiry_date(),
    };
    let Some(window) = requested else {
        return Ok(list_window);
    };
    if window.start > window.end
        || window.start < list_window.start
        || window.end > list_window.end
    {
        return Err(EngineError::Validation(format!(
            "delivery window {} to {} is outside price list {}",
            window.start,
            window.end,
            price_list.name()
        )));
    }
    Ok(window)
}
