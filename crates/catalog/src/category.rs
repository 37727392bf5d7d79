use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradegate_core::{Aggregate, AggregateRoot, DomainError, UserId, aggregate_id, persisted};
use tradegate_events::Event;

aggregate_id!(
    /// Product category identifier.
    CategoryId
);

/// Aggregate root: ProductCategory.
///
/// A category is supplier-scoped, defines the unit of measure for its
/// products and decides whether they may be ordered vacuum-packed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    id: CategoryId,
    supplier_id: UserId,
    name: String,
    unit_of_measure: String,
    vac_enabled: bool,
    is_active: bool,
    sort_order: i32,
    #[serde(skip_serializing, default = "persisted")]
    created: bool,
}

impl ProductCategory {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: CategoryId) -> Self {
        Self {
            id,
            supplier_id: UserId::nil(),
            name: String::new(),
            unit_of_measure: String::new(),
            vac_enabled: false,
            is_active: false,
            sort_order: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> CategoryId {
        self.id
    }

    pub fn supplier_id(&self) -> UserId {
        self.supplier_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_of_measure(&self) -> &str {
        &self.unit_of_measure
    }

    pub fn vac_enabled(&self) -> bool {
        self.vac_enabled
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn sort_order(&self) -> i32 {
        self.sort_order
    }
}

impl AggregateRoot for ProductCategory {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreateCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategory {
    pub category_id: CategoryId,
    pub supplier_id: UserId,
    pub name: String,
    pub unit_of_measure: String,
    pub vac_enabled: bool,
    pub sort_order: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateCategory. `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCategory {
    pub category_id: CategoryId,
    pub name: Option<String>,
    pub unit_of_measure: Option<String>,
    pub vac_enabled: Option<bool>,
    pub sort_order: Option<i32>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateCategory {
    pub category_id: CategoryId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ActivateCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateCategory {
    pub category_id: CategoryId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryCommand {
    CreateCategory(CreateCategory),
    UpdateCategory(UpdateCategory),
    DeactivateCategory(DeactivateCategory),
    ActivateCategory(ActivateCategory),
}

/// Event: CategoryCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCreated {
    pub category_id: CategoryId,
    pub supplier_id: UserId,
    pub name: String,
    pub unit_of_measure: String,
    pub vac_enabled: bool,
    pub sort_order: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CategoryUpdated (full post-update values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUpdated {
    pub category_id: CategoryId,
    pub name: String,
    pub unit_of_measure: String,
    pub vac_enabled: bool,
    pub sort_order: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CategoryDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDeactivated {
    pub category_id: CategoryId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CategoryActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryActivated {
    pub category_id: CategoryId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryEvent {
    CategoryCreated(CategoryCreated),
    CategoryUpdated(CategoryUpdated),
    CategoryDeactivated(CategoryDeactivated),
    CategoryActivated(CategoryActivated),
}

impl Event for CategoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CategoryEvent::CategoryCreated(_) => "catalog.category.created",
            CategoryEvent::CategoryUpdated(_) => "catalog.category.updated",
            CategoryEvent::CategoryDeactivated(_) => "catalog.category.deactivated",
            CategoryEvent::CategoryActivated(_) => "catalog.category.activated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CategoryEvent::CategoryCreated(e) => e.occurred_at,
            CategoryEvent::CategoryUpdated(e) => e.occurred_at,
            CategoryEvent::CategoryDeactivated(e) => e.occurred_at,
            CategoryEvent::CategoryActivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ProductCategory {
    type Command = CategoryCommand;
    type Event = CategoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CategoryEvent::CategoryCreated(e) => {
                self.id = e.category_id;
                self.supplier_id = e.supplier_id;
                self.name = e.name.clone();
                self.unit_of_measure = e.unit_of_measure.clone();
                self.vac_enabled = e.vac_enabled;
                self.sort_order = e.sort_order;
                self.is_active = true;
                self.created = true;
            }
            CategoryEvent::CategoryUpdated(e) => {
                self.name = e.name.clone();
                self.unit_of_measure = e.unit_of_measure.clone();
                self.vac_enabled = e.vac_enabled;
                self.sort_order = e.sort_order;
            }
            CategoryEvent::CategoryDeactivated(_) => self.is_active = false,
            CategoryEvent::CategoryActivated(_) => self.is_active = true,
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CategoryCommand::CreateCategory(cmd) => self.handle_create(cmd),
            CategoryCommand::UpdateCategory(cmd) => self.handle_update(cmd),
            CategoryCommand::DeactivateCategory(cmd) => self.handle_deactivate(cmd),
            CategoryCommand::ActivateCategory(cmd) => self.handle_activate(cmd),
        }
    }
}

fn required(value: &str, field: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

impl ProductCategory {
    fn ensure_exists(&self, category_id: CategoryId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("category"));
        }
        if self.id != category_id {
            return Err(DomainError::invariant("category_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateCategory) -> Result<Vec<CategoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("category already exists"));
        }

        Ok(vec![CategoryEvent::CategoryCreated(CategoryCreated {
            category_id: cmd.category_id,
            supplier_id: cmd.supplier_id,
            name: required(&cmd.name, "name")?,
            unit_of_measure: required(&cmd.unit_of_measure, "unit_of_measure")?,
            vac_enabled: cmd.vac_enabled,
            sort_order: cmd.sort_order,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateCategory) -> Result<Vec<CategoryEvent>, DomainError> {
        self.ensure_exists(cmd.category_id)?;

        let name = match &cmd.name {
            Some(n) => required(n, "name")?,
            None => self.name.clone(),
        };
        let unit_of_measure = match &cmd.unit_of_measure {
            Some(u) => required(u, "unit_of_measure")?,
            None => self.unit_of_measure.clone(),
        };

        Ok(vec![CategoryEvent::CategoryUpdated(CategoryUpdated {
            category_id: cmd.category_id,
            name,
            unit_of_measure,
            vac_enabled: cmd.vac_enabled.unwrap_or(self.vac_enabled),
            sort_order: cmd.sort_order.unwrap_or(self.sort_order),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(
        &self,
        cmd: &DeactivateCategory,
    ) -> Result<Vec<CategoryEvent>, DomainError> {
        self.ensure_exists(cmd.category_id)?;
        if !self.is_active {
            return Ok(vec![]);
        }

        Ok(vec![CategoryEvent::CategoryDeactivated(CategoryDeactivated {
            category_id: cmd.category_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateCategory) -> Result<Vec<CategoryEvent>, DomainError> {
        self.ensure_exists(cmd.category_id)?;
        if self.is_active {
            return Ok(vec![]);
        }

        Ok(vec![CategoryEvent::CategoryActivated(CategoryActivated {
            category_id: cmd.category_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
