use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradegate_core::{Aggregate, AggregateRoot, DomainError, UserId, aggregate_id, persisted};
use tradegate_events::Event;

use crate::CategoryId;

aggregate_id!(
    /// Product identifier (supplier-scoped via `supplier_id`).
    ProductId
);

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    supplier_id: UserId,
    category_id: CategoryId,
    name: String,
    /// Unit a price refers to (e.g. "box", "piece").
    base_unit: String,
    is_active: bool,
    sort_order: i32,
    #[serde(skip_serializing, default = "persisted")]
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            supplier_id: UserId::nil(),
            category_id: CategoryId::new(tradegate_core::AggregateId::nil()),
            name: String::new(),
            base_unit: String::new(),
            is_active: false,
            sort_order: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn supplier_id(&self) -> UserId {
        self.supplier_id
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_unit(&self) -> &str {
        &self.base_unit
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn sort_order(&self) -> i32 {
        self.sort_order
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub supplier_id: UserId,
    pub category_id: CategoryId,
    pub name: String,
    pub base_unit: String,
    pub sort_order: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProduct. `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub base_unit: Option<String>,
    pub sort_order: Option<i32>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateProduct {
    pub product_id: ProductId,
    /// Set when the deactivation follows from the category being deactivated.
    pub cascaded: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ActivateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateProduct {
    pub product_id: ProductId,
    /// Whether the product's category is currently active (resolved by the caller).
    pub category_active: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    UpdateProduct(UpdateProduct),
    DeactivateProduct(DeactivateProduct),
    ActivateProduct(ActivateProduct),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub supplier_id: UserId,
    pub category_id: CategoryId,
    pub name: String,
    pub base_unit: String,
    pub sort_order: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductUpdated (full post-update values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub category_id: CategoryId,
    pub name: String,
    pub base_unit: String,
    pub sort_order: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeactivated {
    pub product_id: ProductId,
    pub cascaded: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductActivated {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductUpdated(ProductUpdated),
    ProductDeactivated(ProductDeactivated),
    ProductActivated(ProductActivated),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "catalog.product.created",
            ProductEvent::ProductUpdated(_) => "catalog.product.updated",
            ProductEvent::ProductDeactivated(_) => "catalog.product.deactivated",
            ProductEvent::ProductActivated(_) => "catalog.product.activated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductUpdated(e) => e.occurred_at,
            ProductEvent::ProductDeactivated(e) => e.occurred_at,
            ProductEvent::ProductActivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.supplier_id = e.supplier_id;
                self.category_id = e.category_id;
                self.name = e.name.clone();
                self.base_unit = e.base_unit.clone();
                self.sort_order = e.sort_order;
                self.is_active = true;
                self.created = true;
            }
            ProductEvent::ProductUpdated(e) => {
                self.category_id = e.category_id;
                self.name = e.name.clone();
                self.base_unit = e.base_unit.clone();
                self.sort_order = e.sort_order;
            }
            ProductEvent::ProductDeactivated(_) => self.is_active = false,
            ProductEvent::ProductActivated(_) => self.is_active = true,
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::UpdateProduct(cmd) => self.handle_update(cmd),
            ProductCommand::DeactivateProduct(cmd) => self.handle_deactivate(cmd),
            ProductCommand::ActivateProduct(cmd) => self.handle_activate(cmd),
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

impl Product {
    fn ensure_exists(&self, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("product"));
        }
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            supplier_id: cmd.supplier_id,
            category_id: cmd.category_id,
            name: required(&cmd.name, "name")?,
            base_unit: required(&cmd.base_unit, "base_unit")?,
            sort_order: cmd.sort_order,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;

        let name = match &cmd.name {
            Some(n) => required(n, "name")?,
            None => self.name.clone(),
        };
        let base_unit = match &cmd.base_unit {
            Some(u) => required(u, "base_unit")?,
            None => self.base_unit.clone(),
        };

        Ok(vec![ProductEvent::ProductUpdated(ProductUpdated {
            product_id: cmd.product_id,
            category_id: cmd.category_id.unwrap_or(self.category_id),
            name,
            base_unit,
            sort_order: cmd.sort_order.unwrap_or(self.sort_order),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;
        if !self.is_active {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::ProductDeactivated(ProductDeactivated {
            product_id: cmd.product_id,
            cascaded: cmd.cascaded,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;
        if self.is_active {
            return Ok(vec![]);
        }
        if !cmd.category_active {
            return Err(DomainError::invariant(
                "cannot activate a product while its category is inactive",
            ));
        }

        Ok(vec![ProductEvent::ProductActivated(ProductActivated {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> Product {
        let id = ProductId::generate();
        let mut product = Product::empty(id);
        let events = product
            .handle(&ProductCommand::CreateProduct(CreateProduct {
                product_id: id,
                supplier_id: UserId::new(),
                category_id: CategoryId::generate(),
                name: "Sea bass".to_string(),
                base_unit: "box".to_string(),
                sort_order: 3,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        product.apply(&events[0]);
        product
    }

    fn deactivate(product: &mut Product) {
        let events = product
            .handle(&ProductCommand::DeactivateProduct(DeactivateProduct {
                product_id: product.id_typed(),
                cascaded: true,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            product.apply(e);
        }
    }

    #[test]
    fn create_starts_active() {
        let product = created();
        assert!(product.is_active());
        assert_eq!(product.base_unit(), "box");
    }

    #[test]
    fn create_twice_conflicts() {
        let product = created();
        let err = product
            .handle(&ProductCommand::CreateProduct(CreateProduct {
                product_id: product.id_typed(),
                supplier_id: product.supplier_id(),
                category_id: product.category_id(),
                name: "again".to_string(),
                base_unit: "box".to_string(),
                sort_order: 0,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn activation_requires_active_category() {
        let mut product = created();
        deactivate(&mut product);
        assert!(!product.is_active());

        let blocked = product.handle(&ProductCommand::ActivateProduct(ActivateProduct {
            product_id: product.id_typed(),
            category_active: false,
            occurred_at: Utc::now(),
        }));
        assert!(matches!(blocked, Err(DomainError::InvariantViolation(_))));

        let events = product
            .handle(&ProductCommand::ActivateProduct(ActivateProduct {
                product_id: product.id_typed(),
                category_active: true,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn commands_against_missing_product_are_not_found() {
        let id = ProductId::generate();
        let err = Product::empty(id)
            .handle(&ProductCommand::DeactivateProduct(DeactivateProduct {
                product_id: id,
                cascaded: false,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound("product"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: handle never mutates state and is deterministic.
            #[test]
            fn handle_is_pure(name in "[A-Za-z][A-Za-z0-9 ]{0,40}", sort_order in -100i32..100) {
                let product = created();
                let before = product.clone();
                let cmd = ProductCommand::UpdateProduct(UpdateProduct {
                    product_id: product.id_typed(),
                    name: Some(name),
                    category_id: None,
                    base_unit: None,
                    sort_order: Some(sort_order),
                    occurred_at: Utc::now(),
                });

                let first = product.handle(&cmd);
                let second = product.handle(&cmd);

                prop_assert_eq!(&product, &before);
                prop_assert_eq!(first, second);
            }
        }
    }
}
