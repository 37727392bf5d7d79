//! Price list lifecycle.
//!
//! Activation archives the supplier's current list, activates the target and
//! advances the supplier's `active_price_lists` pointer in one commit. The
//! pointer is versioned, so two racing activations cannot both succeed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info, warn};

use tradegate_auth::{AuthzError, Permission, Principal, authorize, ensure_owner};
use tradegate_catalog::{CategoryId, Product, ProductId};
use tradegate_core::{ExpectedVersion, PartyRef, UserId};
use tradegate_events::{EventBus, EventEnvelope};
use tradegate_pricing::{
    Activate, Archive, CreatePriceList, PriceList, PriceListCommand, PriceListId, PriceListItem,
    PriceListStatus, PriceListSummary, RemoveItem, ReturnToDraft, SetVacSurcharge,
    SubmitForApproval, UpdateDetails, UpsertItem,
};

use crate::dispatch::{EngineContext, UnitOfWork};
use crate::error::{EngineError, EngineResult};
use crate::repository::{PRICE_LIST, PRODUCT, Versioned, collections, find, list, load};
use crate::store::{DocumentStore, Query, SortDirection, Write};

/// Input for a new draft price list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPriceList {
    pub effective_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub is_default: bool,
    pub notes: Option<String>,
    pub vac_surcharges: BTreeMap<CategoryId, u64>,
    pub items: Vec<PriceListItem>,
}

/// Changes to a list's header. `None` keeps the current value; `notes:
/// Some(None)` clears the notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailsPatch {
    pub effective_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<Option<String>>,
    pub is_default: Option<bool>,
}

fn ensure_write_access(actor: &Principal, list: &PriceList) -> EngineResult<()> {
    authorize(actor, &Permission::PRICE_LISTS_WRITE)?;
    ensure_owner(actor, list.supplier_id(), "price list")?;
    Ok(())
}

pub struct PriceListLifecycle<S, B> {
    ctx: Arc<EngineContext<S, B>>,
}

impl<S, B> PriceListLifecycle<S, B>
where
    S: DocumentStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ctx: Arc<EngineContext<S, B>>) -> Self {
        Self { ctx }
    }

    /// Create a draft list for `supplier`.
    pub fn create(
        &self,
        actor: &Principal,
        supplier: &PartyRef,
        new: NewPriceList,
    ) -> EngineResult<PriceList> {
        authorize(actor, &Permission::PRICE_LISTS_WRITE)?;
        ensure_owner(actor, supplier.id, "price list")?;
        self.ensure_products_of(supplier.id, new.items.iter().map(|i| i.product_id))?;

        let id = PriceListId::generate();
        let list = self.ctx.insert(
            PRICE_LIST,
            id.aggregate_id(),
            Some(actor.user_id),
            PriceList::empty(id),
            PriceListCommand::CreatePriceList(CreatePriceList {
                price_list_id: id,
                supplier: supplier.clone(),
                effective_date: new.effective_date,
                expiry_date: new.expiry_date,
                is_default: new.is_default,
                notes: new.notes,
                vac_surcharges: new.vac_surcharges,
                items: new.items,
                created_by: actor.user_id,
                occurred_at: Utc::now(),
            }),
        )?;

        info!(price_list_id = %id, supplier_id = %supplier.id, name = list.name(), "price list created");
        Ok(list)
    }

    pub fn update_details(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
        patch: DetailsPatch,
    ) -> EngineResult<PriceList> {
        self.edit(
            actor,
            price_list_id,
            PriceListCommand::UpdateDetails(UpdateDetails {
                price_list_id,
                effective_date: patch.effective_date,
                expiry_date: patch.expiry_date,
                notes: patch.notes,
                is_default: patch.is_default,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn upsert_item(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
        item: PriceListItem,
    ) -> EngineResult<PriceList> {
        let list = self.get_with_items(price_list_id)?;
        self.ensure_products_of(list.supplier_id(), [item.product_id])?;
        self.edit(
            actor,
            price_list_id,
            PriceListCommand::UpsertItem(UpsertItem {
                price_list_id,
                item,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn remove_item(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
        product_id: ProductId,
    ) -> EngineResult<PriceList> {
        self.edit(
            actor,
            price_list_id,
            PriceListCommand::RemoveItem(RemoveItem {
                price_list_id,
                product_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Set (or clear with `None`) a category's VAC surcharge per kg.
    pub fn set_vac_surcharge(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
        category_id: CategoryId,
        amount_per_kg: Option<u64>,
    ) -> EngineResult<PriceList> {
        self.edit(
            actor,
            price_list_id,
            PriceListCommand::SetVacSurcharge(SetVacSurcharge {
                price_list_id,
                category_id,
                amount_per_kg,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// draft → pending_approval.
    pub fn submit_for_approval(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
    ) -> EngineResult<PriceList> {
        let list = self.edit(
            actor,
            price_list_id,
            PriceListCommand::SubmitForApproval(SubmitForApproval {
                price_list_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(price_list_id = %price_list_id, "price list submitted for approval");
        Ok(list)
    }

    /// Make `price_list_id` the supplier's only active list.
    ///
    /// Already-active targets are returned unchanged. Suppliers may only
    /// self-activate while price list approval is switched off.
    pub fn activate(&self, actor: &Principal, price_list_id: PriceListId) -> EngineResult<PriceList> {
        self.ctx.with_retry("activate_price_list", || {
            let store = self.ctx.store();
            let target = load::<PriceList, _>(store, PRICE_LIST.collection, price_list_id)?;
            self.ensure_activation_access(actor, &target.value)?;

            if target.value.status() == PriceListStatus::Active {
                debug!(price_list_id = %price_list_id, "price list already active");
                return Ok(target.value);
            }

            let supplier_id = target.value.supplier_id();
            let pointer_key = supplier_id.to_string();
            // Read the pointer before the active set: any activation that
            // commits after this read bumps the pointer and fails ours.
            let pointer_doc = store.get(collections::ACTIVE_PRICE_LISTS, &pointer_key)?;

            let now = Utc::now();
            let mut uow = UnitOfWork::new(Some(actor.user_id));

            for previous in self.active_lists(supplier_id)? {
                let previous_id = previous.value.id_typed();
                if previous_id == price_list_id {
                    continue;
                }
                uow.stage_update(
                    PRICE_LIST,
                    previous_id.aggregate_id(),
                    &previous,
                    PriceListCommand::Archive(Archive {
                        price_list_id: previous_id,
                        superseded_by: price_list_id,
                        occurred_at: now,
                    }),
                )?;
                info!(price_list_id = %previous_id, superseded_by = %price_list_id, "archiving previous active price list");
            }

            let activated = uow.stage_update(
                PRICE_LIST,
                price_list_id.aggregate_id(),
                &target,
                PriceListCommand::Activate(Activate {
                    price_list_id,
                    occurred_at: now,
                }),
            )?;

            let pointer = json!({
                "supplier_id": supplier_id.to_string(),
                "price_list_id": price_list_id.to_string(),
            });
            match pointer_doc {
                Some(doc) => uow.push(Write::update(
                    collections::ACTIVE_PRICE_LISTS,
                    pointer_key,
                    pointer,
                    ExpectedVersion::Exact(doc.version),
                )),
                None => uow.reserve(collections::ACTIVE_PRICE_LISTS, pointer_key, pointer),
            }

            // A taken pointer means another activation created it first.
            self.ctx.commit(uow).map_err(|e| match e {
                EngineError::Conflict(msg) => EngineError::Concurrency(msg),
                other => other,
            })?;

            info!(price_list_id = %price_list_id, supplier_id = %supplier_id, "price list activated");
            Ok(activated)
        })
    }

    /// pending_approval → draft. Rejecting a draft is a no-op.
    pub fn reject(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
        reason: Option<String>,
    ) -> EngineResult<PriceList> {
        authorize(actor, &Permission::PRICE_LISTS_APPROVE)?;
        let list = self.ctx.execute(
            PRICE_LIST,
            price_list_id.aggregate_id(),
            Some(actor.user_id),
            |_: &PriceList| Ok(()),
            PriceListCommand::ReturnToDraft(ReturnToDraft {
                price_list_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(price_list_id = %price_list_id, "price list returned to draft");
        Ok(list)
    }

    /// Copy a list into a new draft for another delivery window. Without
    /// `new_expiry_date` the source window's length is kept.
    pub fn duplicate(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
        new_effective_date: NaiveDate,
        new_expiry_date: Option<NaiveDate>,
    ) -> EngineResult<PriceList> {
        let source = self.get_with_items(price_list_id)?;
        ensure_write_access(actor, &source)?;

        let id = PriceListId::generate();
        let command = source.duplicate(
            id,
            new_effective_date,
            new_expiry_date,
            actor.user_id,
            Utc::now(),
        )?;
        let copy = self.ctx.insert(
            PRICE_LIST,
            id.aggregate_id(),
            Some(actor.user_id),
            PriceList::empty(id),
            PriceListCommand::CreatePriceList(command),
        )?;

        info!(price_list_id = %id, source_id = %price_list_id, name = copy.name(), "price list duplicated");
        Ok(copy)
    }

    pub fn get_with_items(&self, price_list_id: PriceListId) -> EngineResult<PriceList> {
        Ok(load::<PriceList, _>(self.ctx.store(), PRICE_LIST.collection, price_list_id)?.value)
    }

    pub fn get_active_by_supplier(&self, supplier_id: UserId) -> EngineResult<Option<PriceList>> {
        Ok(self
            .active_lists(supplier_id)?
            .into_iter()
            .next()
            .map(|v| v.value))
    }

    /// Summaries of a supplier's lists, latest delivery window first.
    pub fn get_by_supplier(&self, supplier_id: UserId) -> EngineResult<Vec<PriceListSummary>> {
        debug!(supplier_id = %supplier_id, "listing price lists");
        let lists: Vec<Versioned<PriceList>> = list(
            self.ctx.store(),
            PRICE_LIST.collection,
            &Query::new()
                .filter("supplier_id", supplier_id.to_string())
                .order_by("effective_date", SortDirection::Descending),
        )?;
        Ok(lists.iter().map(|v| v.value.summary()).collect())
    }

    /// Lists awaiting admin approval, oldest first.
    pub fn list_pending_approval(&self) -> EngineResult<Vec<PriceListSummary>> {
        let lists: Vec<Versioned<PriceList>> = list(
            self.ctx.store(),
            PRICE_LIST.collection,
            &Query::new()
                .filter("status", PriceListStatus::PendingApproval.as_str())
                .order_by("created_at", SortDirection::Ascending),
        )?;
        Ok(lists.iter().map(|v| v.value.summary()).collect())
    }

    fn edit(
        &self,
        actor: &Principal,
        price_list_id: PriceListId,
        command: PriceListCommand,
    ) -> EngineResult<PriceList> {
        self.ctx.execute(
            PRICE_LIST,
            price_list_id.aggregate_id(),
            Some(actor.user_id),
            |list: &PriceList| ensure_write_access(actor, list),
            command,
        )
    }

    fn ensure_activation_access(&self, actor: &Principal, list: &PriceList) -> EngineResult<()> {
        if actor.is_admin() {
            return Ok(());
        }
        ensure_write_access(actor, list)?;
        if self.ctx.config().price_list_approval_required {
            return Err(AuthzError::Forbidden(Permission::PRICE_LISTS_APPROVE.as_str().to_string()).into());
        }
        Ok(())
    }

    /// The supplier's active lists: the one named by the pointer plus any
    /// stored with status `active`. Normally at most one.
    fn active_lists(&self, supplier_id: UserId) -> EngineResult<Vec<Versioned<PriceList>>> {
        let store = self.ctx.store();
        let mut active: Vec<Versioned<PriceList>> = list(
            store,
            PRICE_LIST.collection,
            &Query::new()
                .filter("supplier_id", supplier_id.to_string())
                .filter("status", PriceListStatus::Active.as_str()),
        )?;

        if let Some(pointer) = store.get(collections::ACTIVE_PRICE_LISTS, &supplier_id.to_string())? {
            let pointed = pointer
                .data
                .get("price_list_id")
                .and_then(JsonValue::as_str)
                .map(str::to_string);
            if let Some(pointed) = pointed {
                let known = active.iter().any(|v| v.value.id_typed().to_string() == pointed);
                if !known {
                    warn!(supplier_id = %supplier_id, price_list_id = %pointed, "active pointer names a list that is not active");
                }
            }
        }

        if active.len() > 1 {
            warn!(supplier_id = %supplier_id, count = active.len(), "supplier has more than one active price list");
        }
        active.sort_by_key(|v| std::cmp::Reverse(v.value.effective_date()));
        Ok(active)
    }

    fn ensure_products_of(
        &self,
        supplier_id: UserId,
        product_ids: impl IntoIterator<Item = ProductId>,
    ) -> EngineResult<()> {
        let ids: BTreeSet<ProductId> = product_ids.into_iter().collect();
        for product_id in ids {
            let product = find::<Product, _>(self.ctx.store(), PRODUCT.collection, product_id)?
                .ok_or_else(|| EngineError::Validation(format!("unknown product {product_id}")))?;
            if product.value.supplier_id() != supplier_id {
                return Err(EngineError::Validation(format!(
                    "product {product_id} belongs to another supplier"
                )));
            }
        }
        Ok(())
    }
}
