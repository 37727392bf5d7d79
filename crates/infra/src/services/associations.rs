//! Customer ↔ supplier eligibility.
//!
//! Each (customer, supplier) pair holds one `association_keys` document
//! written in the same commit as its row, so a pair can never be stored
//! twice. Keys are never removed: deleting a row clears its key in place, and
//! claiming a cleared key is an update pinned to the version that was read.
//! Losing a creation race turns into a reread on retry.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info, warn};

use tradegate_associations::{
    ActivateAssociation, Association, AssociationCommand, AssociationId, AssociationReport,
    BatchPlan, CreateAssociation, DeactivateAssociation, DeleteAssociation, EnsureOutcome,
    pair_key, plan_supplier_set,
};
use tradegate_auth::{Permission, Principal, UserDirectory, authorize};
use tradegate_core::{ExpectedVersion, PartyRef, UserId};
use tradegate_events::{EventBus, EventEnvelope};

use crate::dispatch::{EngineContext, UnitOfWork, decide};
use crate::error::{EngineError, EngineResult};
use crate::repository::{ASSOCIATION, Versioned, collections, find, list_values, load};
use crate::store::{DocumentStore, Query, SortDirection, Write};

/// Who holds a (customer, supplier) pair.
enum PairSlot {
    /// No key was ever written.
    Free,
    /// The key exists but names no live row; claiming it must match this
    /// key version.
    Released(u64),
    Taken(Versioned<Association>),
}

fn by_names() -> Query {
    Query::new()
        .order_by("customer.name", SortDirection::Ascending)
        .order_by("supplier.name", SortDirection::Ascending)
}

pub struct AssociationRegistry<S, B> {
    ctx: Arc<EngineContext<S, B>>,
}

impl<S, B> AssociationRegistry<S, B>
where
    S: DocumentStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ctx: Arc<EngineContext<S, B>>) -> Self {
        Self { ctx }
    }

    /// Create a new association. Fails with Conflict when the pair already
    /// has a row, active or not.
    pub fn create(
        &self,
        actor: &Principal,
        customer: &PartyRef,
        supplier: &PartyRef,
        notes: Option<String>,
    ) -> EngineResult<Association> {
        authorize(actor, &Permission::ASSOCIATIONS_MANAGE)?;

        let created = self.ctx.with_retry("create_association", || {
            let claim = match self.find_slot(customer.id, supplier.id)? {
                PairSlot::Taken(existing) => {
                    return Err(EngineError::Conflict(if existing.value.is_active() {
                        format!("{} is already associated with {}", customer.name, supplier.name)
                    } else {
                        format!(
                            "an inactive association between {} and {} exists; activate it instead",
                            customer.name, supplier.name
                        )
                    }));
                }
                PairSlot::Released(version) => Some(version),
                PairSlot::Free => None,
            };
            self.insert(actor, customer, supplier, notes.clone(), claim)
        })?;
        info!(association_id = %created.id_typed(), customer_id = %customer.id, supplier_id = %supplier.id, "association created");
        Ok(created)
    }

    /// Make sure the pair is associated and active, creating or reactivating
    /// the row as needed.
    pub fn ensure(
        &self,
        actor: &Principal,
        customer: &PartyRef,
        supplier: &PartyRef,
        notes: Option<String>,
    ) -> EngineResult<(Association, EnsureOutcome)> {
        authorize(actor, &Permission::ASSOCIATIONS_MANAGE)?;

        self.ctx.with_retry("ensure_association", || {
            let existing = match self.find_slot(customer.id, supplier.id)? {
                PairSlot::Taken(existing) => existing,
                PairSlot::Released(version) => {
                    let created = self.insert(actor, customer, supplier, notes.clone(), Some(version))?;
                    return Ok((created, EnsureOutcome::Created));
                }
                PairSlot::Free => {
                    let created = self.insert(actor, customer, supplier, notes.clone(), None)?;
                    return Ok((created, EnsureOutcome::Created));
                }
            };

            if existing.value.is_active() {
                return Ok((existing.value, EnsureOutcome::AlreadyActive));
            }

            let id = existing.value.id_typed();
            let mut uow = UnitOfWork::new(Some(actor.user_id));
            let reactivated = uow.stage_update(
                ASSOCIATION,
                id.aggregate_id(),
                &existing,
                AssociationCommand::ActivateAssociation(ActivateAssociation {
                    association_id: id,
                    occurred_at: Utc::now(),
                }),
            )?;
            self.ctx.commit(uow)?;
            Ok((reactivated, EnsureOutcome::Reactivated))
        })
    }

    /// Ensure one association per supplier for `customer` and report what
    /// happened to each.
    pub fn request_associations(
        &self,
        actor: &Principal,
        customer: &PartyRef,
        suppliers: &[PartyRef],
    ) -> EngineResult<AssociationReport> {
        let mut report = AssociationReport::default();
        for supplier in suppliers {
            let (_, outcome) = self.ensure(actor, customer, supplier, None)?;
            report.record(supplier.id, outcome);
        }

        info!(
            customer_id = %customer.id,
            created = report.created.len(),
            reactivated = report.reactivated.len(),
            already_existed = report.already_existed.len(),
            "associations requested"
        );
        Ok(report)
    }

    /// Bring a customer's active suppliers in line with `suppliers`. Rows are
    /// created, deactivated or reactivated; never deleted.
    pub fn set_supplier_set(
        &self,
        actor: &Principal,
        customer: &PartyRef,
        suppliers: &[PartyRef],
    ) -> EngineResult<BatchPlan> {
        authorize(actor, &Permission::ASSOCIATIONS_MANAGE)?;

        let current = self.get_by_customer(customer.id)?;
        let target: BTreeSet<UserId> = suppliers.iter().map(|s| s.id).collect();
        let plan = plan_supplier_set(&current, &target);
        if plan.is_empty() {
            debug!(customer_id = %customer.id, "supplier set unchanged");
            return Ok(plan);
        }

        for supplier in suppliers.iter().filter(|s| plan.to_add.contains(&s.id)) {
            self.ensure(actor, customer, supplier, None)?;
        }
        for &id in &plan.to_deactivate {
            self.deactivate(actor, id)?;
        }
        for &id in &plan.to_reactivate {
            self.activate(actor, id)?;
        }

        info!(
            customer_id = %customer.id,
            added = plan.to_add.len(),
            deactivated = plan.to_deactivate.len(),
            reactivated = plan.to_reactivate.len(),
            "supplier set updated"
        );
        Ok(plan)
    }

    pub fn activate(&self, actor: &Principal, association_id: AssociationId) -> EngineResult<Association> {
        authorize(actor, &Permission::ASSOCIATIONS_MANAGE)?;
        self.ctx.execute(
            ASSOCIATION,
            association_id.aggregate_id(),
            Some(actor.user_id),
            |_: &Association| Ok(()),
            AssociationCommand::ActivateAssociation(ActivateAssociation {
                association_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Deactivate without touching orders placed under the association.
    pub fn deactivate(
        &self,
        actor: &Principal,
        association_id: AssociationId,
    ) -> EngineResult<Association> {
        authorize(actor, &Permission::ASSOCIATIONS_MANAGE)?;
        self.ctx.execute(
            ASSOCIATION,
            association_id.aggregate_id(),
            Some(actor.user_id),
            |_: &Association| Ok(()),
            AssociationCommand::DeactivateAssociation(DeactivateAssociation {
                association_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Hard-delete a row and clear its pair key.
    pub fn delete(
        &self,
        actor: &Principal,
        association_id: AssociationId,
        reason: &str,
    ) -> EngineResult<()> {
        authorize(actor, &Permission::ASSOCIATIONS_MANAGE)?;
        self.ctx.with_retry("delete_association", || {
            let current =
                load::<Association, _>(self.ctx.store(), ASSOCIATION.collection, association_id)?;
            let (_, events) = decide(
                &current.value,
                AssociationCommand::DeleteAssociation(DeleteAssociation {
                    association_id,
                    reason: reason.to_string(),
                    occurred_at: Utc::now(),
                }),
            )?;

            let mut uow = UnitOfWork::new(Some(actor.user_id));
            uow.delete(
                ASSOCIATION.collection,
                association_id,
                ExpectedVersion::Exact(current.version),
            );
            let pair_key = current.value.pair_key();
            let holder = association_id.to_string();
            let key = self.ctx.store().get(collections::ASSOCIATION_KEYS, &pair_key)?;
            if let Some(key) = key.filter(|k| key_holder(&k.data) == Some(holder.as_str())) {
                uow.push(Write::update(
                    collections::ASSOCIATION_KEYS,
                    pair_key,
                    json!({ "association_id": JsonValue::Null }),
                    ExpectedVersion::Exact(key.version),
                ));
            }
            uow.record(
                ASSOCIATION.aggregate_type,
                association_id.aggregate_id(),
                current.version + 1,
                &events,
            )?;
            self.ctx.commit(uow)?;

            info!(association_id = %association_id, reason, "association deleted");
            Ok(())
        })
    }

    /// Delete every row whose customer no longer resolves in `directory`.
    /// Returns the number of rows removed.
    pub fn purge_unresolved<D>(&self, actor: &Principal, directory: &D) -> EngineResult<usize>
    where
        D: UserDirectory + ?Sized,
    {
        authorize(actor, &Permission::ASSOCIATIONS_MANAGE)?;

        let orphans: Vec<Association> = self
            .get_all()?
            .into_iter()
            .filter(|a| !directory.exists(a.customer_id()))
            .collect();

        for orphan in &orphans {
            warn!(association_id = %orphan.id_typed(), customer_id = %orphan.customer_id(), "removing association of unknown customer");
            self.delete(actor, orphan.id_typed(), "customer no longer exists")?;
        }
        Ok(orphans.len())
    }

    /// True when the customer holds an active association with the supplier.
    pub fn is_eligible(&self, customer_id: UserId, supplier_id: UserId) -> EngineResult<bool> {
        Ok(matches!(
            self.find_slot(customer_id, supplier_id)?,
            PairSlot::Taken(existing) if existing.value.is_active()
        ))
    }

    pub fn get(&self, association_id: AssociationId) -> EngineResult<Association> {
        Ok(load::<Association, _>(self.ctx.store(), ASSOCIATION.collection, association_id)?.value)
    }

    pub fn get_by_customer(&self, customer_id: UserId) -> EngineResult<Vec<Association>> {
        list_values(
            self.ctx.store(),
            ASSOCIATION.collection,
            &by_names().filter("customer.id", customer_id.to_string()),
        )
    }

    pub fn get_by_supplier(&self, supplier_id: UserId) -> EngineResult<Vec<Association>> {
        list_values(
            self.ctx.store(),
            ASSOCIATION.collection,
            &by_names().filter("supplier.id", supplier_id.to_string()),
        )
    }

    pub fn get_all(&self) -> EngineResult<Vec<Association>> {
        list_values(self.ctx.store(), ASSOCIATION.collection, &by_names())
    }

    /// Store a new row for the pair and claim its key in the same commit.
    /// `claim` is the version of a released key, `None` when no key exists.
    /// Losing the key to a concurrent creator surfaces as a concurrency
    /// failure so the caller rereads the pair.
    fn insert(
        &self,
        actor: &Principal,
        customer: &PartyRef,
        supplier: &PartyRef,
        notes: Option<String>,
        claim: Option<u64>,
    ) -> EngineResult<Association> {
        let id = AssociationId::generate();
        let mut uow = UnitOfWork::new(Some(actor.user_id));
        let created = uow.stage_create(
            ASSOCIATION,
            id.aggregate_id(),
            Association::empty(id),
            AssociationCommand::CreateAssociation(CreateAssociation {
                association_id: id,
                customer: customer.clone(),
                supplier: supplier.clone(),
                notes,
                created_by: actor.user_id,
                occurred_at: Utc::now(),
            }),
        )?;
        let holder = json!({ "association_id": id.to_string() });
        match claim {
            Some(version) => uow.push(Write::update(
                collections::ASSOCIATION_KEYS,
                created.pair_key(),
                holder,
                ExpectedVersion::Exact(version),
            )),
            None => uow.reserve(collections::ASSOCIATION_KEYS, created.pair_key(), holder),
        }
        // The row id is fresh, so a duplicate can only be the pair key.
        self.ctx.commit(uow).map_err(|e| match e {
            EngineError::Conflict(msg) => EngineError::Concurrency(msg),
            other => other,
        })?;
        Ok(created)
    }

    fn find_slot(&self, customer_id: UserId, supplier_id: UserId) -> EngineResult<PairSlot> {
        let store = self.ctx.store();
        let Some(key) = store.get(collections::ASSOCIATION_KEYS, &pair_key(customer_id, supplier_id))? else {
            return Ok(PairSlot::Free);
        };
        if key.data.get("association_id").is_some_and(JsonValue::is_null) {
            return Ok(PairSlot::Released(key.version));
        }
        let Some(association_id) = key_holder(&key.data) else {
            return Err(EngineError::Store(format!(
                "association key {} has no association id",
                key.id
            )));
        };
        match find::<Association, _>(store, ASSOCIATION.collection, association_id)? {
            Some(found) => Ok(PairSlot::Taken(found)),
            None => {
                warn!(key = %key.id, association_id, "association key points at a missing row");
                Ok(PairSlot::Released(key.version))
            }
        }
    }
}

fn key_holder(data: &JsonValue) -> Option<&str> {
    data.get("association_id").and_then(JsonValue::as_str)
}
