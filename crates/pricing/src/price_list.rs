use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tradegate_catalog::{CategoryId, ProductId};
use tradegate_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, PartyRef, UserId, aggregate_id, persisted,
};
use tradegate_events::Event;

aggregate_id!(
    /// Price list identifier.
    PriceListId
);

/// Price list status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceListStatus {
    Draft,
    PendingApproval,
    Active,
    Archived,
}

impl PriceListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceListStatus::Draft => "draft",
            PriceListStatus::PendingApproval => "pending_approval",
            PriceListStatus::Active => "active",
            PriceListStatus::Archived => "archived",
        }
    }

    /// Items, surcharges and details may only change in these states.
    pub fn is_editable(&self) -> bool {
        matches!(self, PriceListStatus::Draft | PriceListStatus::Active)
    }
}

impl core::fmt::Display for PriceListStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product's price within a price list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListItem {
    pub product_id: ProductId,
    /// Price per base unit, in minor currency units.
    pub price: u64,
    /// Optional alternative price for vacuum-packed units.
    pub vac_price: Option<u64>,
    pub is_available: bool,
}

/// Display name for a delivery window, e.g. `08.01.2024 - 14.01.2024`.
pub fn derive_name(effective_date: NaiveDate, expiry_date: NaiveDate) -> String {
    format!(
        "{} - {}",
        effective_date.format("%d.%m.%Y"),
        expiry_date.format("%d.%m.%Y")
    )
}

/// Aggregate root: PriceList.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceList {
    id: PriceListId,
    supplier_id: UserId,
    supplier_name: String,
    name: String,
    effective_date: NaiveDate,
    expiry_date: NaiveDate,
    status: PriceListStatus,
    is_default: bool,
    notes: Option<String>,
    /// Category → VAC surcharge per kg (minor units).
    vac_surcharges: BTreeMap<CategoryId, u64>,
    items: Vec<PriceListItem>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing, default = "persisted")]
    created: bool,
}

/// Read projection of a price list without its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListSummary {
    pub id: PriceListId,
    pub supplier_id: UserId,
    pub supplier_name: String,
    pub name: String,
    pub effective_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: PriceListStatus,
    pub is_default: bool,
    pub item_count: usize,
}

impl PriceList {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: PriceListId) -> Self {
        Self {
            id,
            supplier_id: UserId::nil(),
            supplier_name: String::new(),
            name: String::new(),
            effective_date: NaiveDate::MIN,
            expiry_date: NaiveDate::MIN,
            status: PriceListStatus::Draft,
            is_default: false,
            notes: None,
            vac_surcharges: BTreeMap::new(),
            items: Vec::new(),
            created_by: UserId::nil(),
            created_at: DateTime::<Utc>::MIN_UTC,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PriceListId {
        self.id
    }

    pub fn supplier_id(&self) -> UserId {
        self.supplier_id
    }

    pub fn supplier_name(&self) -> &str {
        &self.supplier_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }

    pub fn expiry_date(&self) -> NaiveDate {
        self.expiry_date
    }

    pub fn status(&self) -> PriceListStatus {
        self.status
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn vac_surcharges(&self) -> &BTreeMap<CategoryId, u64> {
        &self.vac_surcharges
    }

    /// Surcharge configured for a category; `None` means no surcharge.
    pub fn vac_surcharge(&self, category_id: CategoryId) -> Option<u64> {
        self.vac_surcharges.get(&category_id).copied()
    }

    pub fn items(&self) -> &[PriceListItem] {
        &self.items
    }

    pub fn item(&self, product_id: ProductId) -> Option<&PriceListItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn summary(&self) -> PriceListSummary {
        PriceListSummary {
            id: self.id,
            supplier_id: self.supplier_id,
            supplier_name: self.supplier_name.clone(),
            name: self.name.clone(),
            effective_date: self.effective_date,
            expiry_date: self.expiry_date,
            status: self.status,
            is_default: self.is_default,
            item_count: self.items.len(),
        }
    }

    /// Build the create command for a copy of this list with a new delivery
    /// window.
    ///
    /// Items, surcharges and notes are copied; status and the default flag
    /// are not. Without `new_expiry_date` the copy keeps the source window's
    /// length.
    pub fn duplicate(
        &self,
        new_id: PriceListId,
        new_effective_date: NaiveDate,
        new_expiry_date: Option<NaiveDate>,
        created_by: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<CreatePriceList> {
        if !self.created {
            return Err(DomainError::not_found("price list"));
        }

        let expiry_date = match new_expiry_date {
            Some(d) => d,
            None => {
                let gap = self.expiry_date - self.effective_date;
                new_effective_date
                    .checked_add_signed(gap)
                    .ok_or_else(|| DomainError::validation("expiry date out of range"))?
            }
        };

        Ok(CreatePriceList {
            price_list_id: new_id,
            supplier: PartyRef::new(self.supplier_id, self.supplier_name.clone()),
            effective_date: new_effective_date,
            expiry_date,
            is_default: false,
            notes: self.notes.clone(),
            vac_surcharges: self.vac_surcharges.clone(),
            items: self.items.clone(),
            created_by,
            occurred_at,
        })
    }
}

impl AggregateRoot for PriceList {
    type Id = PriceListId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreatePriceList (always lands in draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePriceList {
    pub price_list_id: PriceListId,
    pub supplier: PartyRef,
    pub effective_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub is_default: bool,
    pub notes: Option<String>,
    pub vac_surcharges: BTreeMap<CategoryId, u64>,
    pub items: Vec<PriceListItem>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails. `None` keeps the current value; `notes:
/// Some(None)` clears the notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub price_list_id: PriceListId,
    pub effective_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<Option<String>>,
    pub is_default: Option<bool>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpsertItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertItem {
    pub price_list_id: PriceListId,
    pub item: PriceListItem,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub price_list_id: PriceListId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetVacSurcharge. `None` clears the surcharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetVacSurcharge {
    pub price_list_id: PriceListId,
    pub category_id: CategoryId,
    pub amount_per_kg: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitForApproval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitForApproval {
    pub price_list_id: PriceListId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Activate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activate {
    pub price_list_id: PriceListId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Archive (issued when another list of the supplier is activated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub price_list_id: PriceListId,
    pub superseded_by: PriceListId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnToDraft (approval rejected).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnToDraft {
    pub price_list_id: PriceListId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceListCommand {
    CreatePriceList(CreatePriceList),
    UpdateDetails(UpdateDetails),
    UpsertItem(UpsertItem),
    RemoveItem(RemoveItem),
    SetVacSurcharge(SetVacSurcharge),
    SubmitForApproval(SubmitForApproval),
    Activate(Activate),
    Archive(Archive),
    ReturnToDraft(ReturnToDraft),
}

/// Event: PriceListCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListCreated {
    pub price_list_id: PriceListId,
    pub supplier: PartyRef,
    pub name: String,
    pub effective_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub is_default: bool,
    pub notes: Option<String>,
    pub vac_surcharges: BTreeMap<CategoryId, u64>,
    pub items: Vec<PriceListItem>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PriceListDetailsUpdated (full post-update values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListDetailsUpdated {
    pub price_list_id: PriceListId,
    pub name: String,
    pub effective_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
    pub is_default: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemUpserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpserted {
    pub price_list_id: PriceListId,
    pub item: PriceListItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub price_list_id: PriceListId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VacSurchargeSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacSurchargeSet {
    pub price_list_id: PriceListId,
    pub category_id: CategoryId,
    pub amount_per_kg: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PriceListSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListSubmitted {
    pub price_list_id: PriceListId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PriceListActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListActivated {
    pub price_list_id: PriceListId,
    pub previous_status: PriceListStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PriceListArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListArchived {
    pub price_list_id: PriceListId,
    pub superseded_by: PriceListId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnedToDraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedToDraft {
    pub price_list_id: PriceListId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceListEvent {
    PriceListCreated(PriceListCreated),
    PriceListDetailsUpdated(PriceListDetailsUpdated),
    ItemUpserted(ItemUpserted),
    ItemRemoved(ItemRemoved),
    VacSurchargeSet(VacSurchargeSet),
    PriceListSubmitted(PriceListSubmitted),
    PriceListActivated(PriceListActivated),
    PriceListArchived(PriceListArchived),
    ReturnedToDraft(ReturnedToDraft),
}

impl Event for PriceListEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PriceListEvent::PriceListCreated(_) => "pricing.price_list.created",
            PriceListEvent::PriceListDetailsUpdated(_) => "pricing.price_list.details_updated",
            PriceListEvent::ItemUpserted(_) => "pricing.price_list.item_upserted",
            PriceListEvent::ItemRemoved(_) => "pricing.price_list.item_removed",
            PriceListEvent::VacSurchargeSet(_) => "pricing.price_list.vac_surcharge_set",
            PriceListEvent::PriceListSubmitted(_) => "pricing.price_list.submitted",
            PriceListEvent::PriceListActivated(_) => "pricing.price_list.activated",
            PriceListEvent::PriceListArchived(_) => "pricing.price_list.archived",
            PriceListEvent::ReturnedToDraft(_) => "pricing.price_list.returned_to_draft",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PriceListEvent::PriceListCreated(e) => e.occurred_at,
            PriceListEvent::PriceListDetailsUpdated(e) => e.occurred_at,
            PriceListEvent::ItemUpserted(e) => e.occurred_at,
            PriceListEvent::ItemRemoved(e) => e.occurred_at,
            PriceListEvent::VacSurchargeSet(e) => e.occurred_at,
            PriceListEvent::PriceListSubmitted(e) => e.occurred_at,
            PriceListEvent::PriceListActivated(e) => e.occurred_at,
            PriceListEvent::PriceListArchived(e) => e.occurred_at,
            PriceListEvent::ReturnedToDraft(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PriceList {
    type Command = PriceListCommand;
    type Event = PriceListEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PriceListEvent::PriceListCreated(e) => {
                self.id = e.price_list_id;
                self.supplier_id = e.supplier.id;
                self.supplier_name = e.supplier.name.clone();
                self.name = e.name.clone();
                self.effective_date = e.effective_date;
                self.expiry_date = e.expiry_date;
                self.status = PriceListStatus::Draft;
                self.is_default = e.is_default;
                self.notes = e.notes.clone();
                self.vac_surcharges = e.vac_surcharges.clone();
                self.items = e.items.clone();
                self.created_by = e.created_by;
                self.created_at = e.occurred_at;
                self.created = true;
            }
            PriceListEvent::PriceListDetailsUpdated(e) => {
                self.name = e.name.clone();
                self.effective_date = e.effective_date;
                self.expiry_date = e.expiry_date;
                self.notes = e.notes.clone();
                self.is_default = e.is_default;
            }
            PriceListEvent::ItemUpserted(e) => {
                match self
                    .items
                    .iter_mut()
                    .find(|i| i.product_id == e.item.product_id)
                {
                    Some(existing) => *existing = e.item.clone(),
                    None => self.items.push(e.item.clone()),
                }
            }
            PriceListEvent::ItemRemoved(e) => {
                self.items.retain(|i| i.product_id != e.product_id);
            }
            PriceListEvent::VacSurchargeSet(e) => match e.amount_per_kg {
                Some(amount) => {
                    self.vac_surcharges.insert(e.category_id, amount);
                }
                None => {
                    self.vac_surcharges.remove(&e.category_id);
                }
            },
            PriceListEvent::PriceListSubmitted(_) => {
                self.status = PriceListStatus::PendingApproval;
            }
            PriceListEvent::PriceListActivated(_) => {
                self.status = PriceListStatus::Active;
            }
            PriceListEvent::PriceListArchived(_) => {
                self.status = PriceListStatus::Archived;
            }
            PriceListEvent::ReturnedToDraft(_) => {
                self.status = PriceListStatus::Draft;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PriceListCommand::CreatePriceList(cmd) => self.handle_create(cmd),
            PriceListCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            PriceListCommand::UpsertItem(cmd) => self.handle_upsert_item(cmd),
            PriceListCommand::RemoveItem(cmd) => self.handle_remove_item(cmd),
            PriceListCommand::SetVacSurcharge(cmd) => self.handle_set_vac_surcharge(cmd),
            PriceListCommand::SubmitForApproval(cmd) => self.handle_submit(cmd),
            PriceListCommand::Activate(cmd) => self.handle_activate(cmd),
            PriceListCommand::Archive(cmd) => self.handle_archive(cmd),
            PriceListCommand::ReturnToDraft(cmd) => self.handle_return_to_draft(cmd),
        }
    }
}

fn validate_window(effective_date: NaiveDate, expiry_date: NaiveDate) -> DomainResult<()> {
    if expiry_date < effective_date {
        return Err(DomainError::validation(format!(
            "expiry date {expiry_date} is before effective date {effective_date}"
        )));
    }
    Ok(())
}

fn validate_item(item: &PriceListItem) -> DomainResult<()> {
    if item.price == 0 {
        return Err(DomainError::validation(format!(
            "price for product {} must be positive",
            item.product_id
        )));
    }
    if item.vac_price == Some(0) {
        return Err(DomainError::validation(format!(
            "vac price for product {} must be positive when set",
            item.product_id
        )));
    }
    Ok(())
}

impl PriceList {
    fn ensure_exists(&self, price_list_id: PriceListId) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found("price list"));
        }
        if self.id != price_list_id {
            return Err(DomainError::invariant("price_list_id mismatch"));
        }
        Ok(())
    }

    fn ensure_editable(&self) -> DomainResult<()> {
        if !self.status.is_editable() {
            return Err(DomainError::invariant(format!(
                "price list cannot be edited while {}",
                self.status
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreatePriceList) -> DomainResult<Vec<PriceListEvent>> {
        if self.created {
            return Err(DomainError::conflict("price list already exists"));
        }
        if cmd.supplier.name.trim().is_empty() {
            return Err(DomainError::validation("supplier name cannot be empty"));
        }
        validate_window(cmd.effective_date, cmd.expiry_date)?;

        let mut seen = HashSet::new();
        for item in &cmd.items {
            validate_item(item)?;
            if !seen.insert(item.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} listed twice",
                    item.product_id
                )));
            }
        }

        Ok(vec![PriceListEvent::PriceListCreated(PriceListCreated {
            price_list_id: cmd.price_list_id,
            supplier: cmd.supplier.clone(),
            name: derive_name(cmd.effective_date, cmd.expiry_date),
            effective_date: cmd.effective_date,
            expiry_date: cmd.expiry_date,
            is_default: cmd.is_default,
            notes: cmd.notes.clone(),
            vac_surcharges: cmd.vac_surcharges.clone(),
            items: cmd.items.clone(),
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(&self, cmd: &UpdateDetails) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_exists(cmd.price_list_id)?;
        self.ensure_editable()?;

        let effective_date = cmd.effective_date.unwrap_or(self.effective_date);
        let expiry_date = cmd.expiry_date.unwrap_or(self.expiry_date);
        validate_window(effective_date, expiry_date)?;

        Ok(vec![PriceListEvent::PriceListDetailsUpdated(
            PriceListDetailsUpdated {
                price_list_id: cmd.price_list_id,
                name: derive_name(effective_date, expiry_date),
                effective_date,
                expiry_date,
                notes: match &cmd.notes {
                    Some(notes) => notes.clone(),
                    None => self.notes.clone(),
                },
                is_default: cmd.is_default.unwrap_or(self.is_default),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_upsert_item(&self, cmd: &UpsertItem) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_exists(cmd.price_list_id)?;
        self.ensure_editable()?;
        validate_item(&cmd.item)?;

        if self.item(cmd.item.product_id) == Some(&cmd.item) {
            return Ok(vec![]);
        }

        Ok(vec![PriceListEvent::ItemUpserted(ItemUpserted {
            price_list_id: cmd.price_list_id,
            item: cmd.item.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_item(&self, cmd: &RemoveItem) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_exists(cmd.price_list_id)?;
        self.ensure_editable()?;

        if self.item(cmd.product_id).is_none() {
            return Err(DomainError::not_found("price list item"));
        }

        Ok(vec![PriceListEvent::ItemRemoved(ItemRemoved {
            price_list_id: cmd.price_list_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_vac_surcharge(
        &self,
        cmd: &SetVacSurcharge,
    ) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_exists(cmd.price_list_id)?;
        self.ensure_editable()?;

        if self.vac_surcharge(cmd.category_id) == cmd.amount_per_kg {
            return Ok(vec![]);
        }

        Ok(vec![PriceListEvent::VacSurchargeSet(VacSurchargeSet {
            price_list_id: cmd.price_list_id,
            category_id: cmd.category_id,
            amount_per_kg: cmd.amount_per_kg,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitForApproval) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_exists(cmd.price_list_id)?;

        match self.status {
            PriceListStatus::Draft => Ok(vec![PriceListEvent::PriceListSubmitted(
                PriceListSubmitted {
                    price_list_id: cmd.price_list_id,
                    occurred_at: cmd.occurred_at,
                },
            )]),
            PriceListStatus::PendingApproval => Ok(vec![]),
            other => Err(DomainError::invalid_transition(
                other,
                PriceListStatus::PendingApproval,
            )),
        }
    }

    fn handle_activate(&self, cmd: &Activate) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_exists(cmd.price_list_id)?;

        match self.status {
            PriceListStatus::Draft | PriceListStatus::PendingApproval => {
                Ok(vec![PriceListEvent::PriceListActivated(PriceListActivated {
                    price_list_id: cmd.price_list_id,
                    previous_status: self.status,
                    occurred_at: cmd.occurred_at,
                })])
            }
            PriceListStatus::Active => Ok(vec![]),
            PriceListStatus::Archived => Err(DomainError::invalid_transition(
                PriceListStatus::Archived,
                PriceListStatus::Active,
            )),
        }
    }

    fn handle_archive(&self, cmd: &Archive) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_exists(cmd.price_list_id)?;

        match self.status {
            PriceListStatus::Active => Ok(vec![PriceListEvent::PriceListArchived(
                PriceListArchived {
                    price_list_id: cmd.price_list_id,
                    superseded_by: cmd.superseded_by,
                    occurred_at: cmd.occurred_at,
                },
            )]),
            PriceListStatus::Archived => Ok(vec![]),
            other => Err(DomainError::invalid_transition(
                other,
                PriceListStatus::Archived,
            )),
        }
    }

    fn handle_return_to_draft(&self, cmd: &ReturnToDraft) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_exists(cmd.price_list_id)?;

        match self.status {
            PriceListStatus::PendingApproval => Ok(vec![PriceListEvent::ReturnedToDraft(
                ReturnedToDraft {
                    price_list_id: cmd.price_list_id,
                    reason: cmd.reason.clone(),
                    occurred_at: cmd.occurred_at,
                },
            )]),
            PriceListStatus::Draft => Ok(vec![]),
            other => Err(DomainError::invalid_transition(other, PriceListStatus::Draft)),
        }
    }
}
