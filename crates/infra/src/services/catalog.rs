//! Supplier catalog: categories and products.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info};

use tradegate_auth::{Permission, Principal, authorize, ensure_owner};
use tradegate_catalog::{
    ActivateCategory, ActivateProduct, CategoryCommand, CategoryId, CreateCategory,
    CreateProduct, DeactivateCategory, DeactivateProduct, Product, ProductCategory,
    ProductCategoryLookup, ProductCommand, ProductId, UpdateCategory, UpdateProduct,
};
use tradegate_core::{ExpectedVersion, UserId};
use tradegate_events::{EventBus, EventEnvelope};

use crate::dispatch::{EngineContext, UnitOfWork};
use crate::error::{EngineError, EngineResult};
use crate::repository::{CATEGORY, PRODUCT, Versioned, list, list_values, load};
use crate::store::{DocumentStore, Query, SortDirection, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub unit_of_measure: String,
    pub vac_enabled: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub category_id: CategoryId,
    pub name: String,
    pub base_unit: String,
    pub sort_order: i32,
}

fn catalog_order(supplier_id: UserId) -> Query {
    Query::new()
        .filter("supplier_id", supplier_id.to_string())
        .order_by("sort_order", SortDirection::Ascending)
        .order_by("name", SortDirection::Ascending)
}

fn ensure_catalog_access(actor: &Principal, supplier_id: UserId) -> EngineResult<()> {
    authorize(actor, &Permission::CATALOG_WRITE)?;
    ensure_owner(actor, supplier_id, "catalog")?;
    Ok(())
}

pub struct CatalogService<S, B> {
    ctx: Arc<EngineContext<S, B>>,
}

impl<S, B> CatalogService<S, B>
where
    S: DocumentStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ctx: Arc<EngineContext<S, B>>) -> Self {
        Self { ctx }
    }

    pub fn create_category(
        &self,
        actor: &Principal,
        supplier_id: UserId,
        new: NewCategory,
    ) -> EngineResult<ProductCategory> {
        ensure_catalog_access(actor, supplier_id)?;

        let id = CategoryId::generate();
        let category = self.ctx.insert(
            CATEGORY,
            id.aggregate_id(),
            Some(actor.user_id),
            ProductCategory::empty(id),
            CategoryCommand::CreateCategory(CreateCategory {
                category_id: id,
                supplier_id,
                name: new.name,
                unit_of_measure: new.unit_of_measure,
                vac_enabled: new.vac_enabled,
                sort_order: new.sort_order,
                occurred_at: Utc::now(),
            }),
        )?;

        info!(category_id = %id, supplier_id = %supplier_id, "category created");
        Ok(category)
    }

    pub fn update_category(
        &self,
        actor: &Principal,
        update: UpdateCategory,
    ) -> EngineResult<ProductCategory> {
        let id = update.category_id;
        self.ctx.execute(
            CATEGORY,
            id.aggregate_id(),
            Some(actor.user_id),
            |c: &ProductCategory| ensure_catalog_access(actor, c.supplier_id()),
            CategoryCommand::UpdateCategory(update.clone()),
        )
    }

    /// Deactivate a category and, in the same commit, every active product
    /// filed under it.
    pub fn deactivate_category(
        &self,
        actor: &Principal,
        category_id: CategoryId,
    ) -> EngineResult<ProductCategory> {
        self.ctx.with_retry("deactivate_category", || {
            let store = self.ctx.store();
            let current = load::<ProductCategory, _>(store, CATEGORY.collection, category_id)?;
            ensure_catalog_access(actor, current.value.supplier_id())?;

            let now = Utc::now();
            let mut uow = UnitOfWork::new(Some(actor.user_id));
            let category = uow.stage_update(
                CATEGORY,
                category_id.aggregate_id(),
                &current,
                CategoryCommand::DeactivateCategory(DeactivateCategory {
                    category_id,
                    occurred_at: now,
                }),
            )?;

            let products: Vec<Versioned<Product>> = list(
                store,
                PRODUCT.collection,
                &Query::new()
                    .filter("category_id", category_id.to_string())
                    .filter("is_active", true),
            )?;
            for product in &products {
                let product_id = product.value.id_typed();
                uow.stage_update(
                    PRODUCT,
                    product_id.aggregate_id(),
                    product,
                    ProductCommand::DeactivateProduct(DeactivateProduct {
                        product_id,
                        cascaded: true,
                        occurred_at: now,
                    }),
                )?;
            }

            self.ctx.commit(uow)?;
            info!(
                category_id = %category_id,
                products = products.len(),
                "category deactivated"
            );
            Ok(category)
        })
    }

    /// Reactivate a category. Its products stay inactive until activated
    /// individually.
    pub fn activate_category(
        &self,
        actor: &Principal,
        category_id: CategoryId,
    ) -> EngineResult<ProductCategory> {
        let category = self.ctx.execute(
            CATEGORY,
            category_id.aggregate_id(),
            Some(actor.user_id),
            |c: &ProductCategory| ensure_catalog_access(actor, c.supplier_id()),
            CategoryCommand::ActivateCategory(ActivateCategory {
                category_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(category_id = %category_id, "category activated");
        Ok(category)
    }

    pub fn create_product(
        &self,
        actor: &Principal,
        supplier_id: UserId,
        new: NewProduct,
    ) -> EngineResult<Product> {
        ensure_catalog_access(actor, supplier_id)?;
        self.ensure_category_of(supplier_id, new.category_id)?;

        let id = ProductId::generate();
        let product = self.ctx.insert(
            PRODUCT,
            id.aggregate_id(),
            Some(actor.user_id),
            Product::empty(id),
            ProductCommand::CreateProduct(CreateProduct {
                product_id: id,
                supplier_id,
                category_id: new.category_id,
                name: new.name,
                base_unit: new.base_unit,
                sort_order: new.sort_order,
                occurred_at: Utc::now(),
            }),
        )?;

        info!(product_id = %id, category_id = %new.category_id, "product created");
        Ok(product)
    }

    pub fn update_product(&self, actor: &Principal, update: UpdateProduct) -> EngineResult<Product> {
        let id = update.product_id;
        self.ctx.execute(
            PRODUCT,
            id.aggregate_id(),
            Some(actor.user_id),
            |p: &Product| {
                ensure_catalog_access(actor, p.supplier_id())?;
                match update.category_id {
                    Some(category_id) => self.ensure_category_of(p.supplier_id(), category_id),
                    None => Ok(()),
                }
            },
            ProductCommand::UpdateProduct(update.clone()),
        )
    }

    pub fn deactivate_product(&self, actor: &Principal, product_id: ProductId) -> EngineResult<Product> {
        self.ctx.execute(
            PRODUCT,
            product_id.aggregate_id(),
            Some(actor.user_id),
            |p: &Product| ensure_catalog_access(actor, p.supplier_id()),
            ProductCommand::DeactivateProduct(DeactivateProduct {
                product_id,
                cascaded: false,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn activate_product(&self, actor: &Principal, product_id: ProductId) -> EngineResult<Product> {
        self.ctx.with_retry("activate_product", || {
            let store = self.ctx.store();
            let current = load::<Product, _>(store, PRODUCT.collection, product_id)?;
            ensure_catalog_access(actor, current.value.supplier_id())?;
            let category =
                load::<ProductCategory, _>(store, CATEGORY.collection, current.value.category_id())?;

            let mut uow = UnitOfWork::new(Some(actor.user_id));
            let product = uow.stage_update(
                PRODUCT,
                product_id.aggregate_id(),
                &current,
                ProductCommand::ActivateProduct(ActivateProduct {
                    product_id,
                    category_active: category.value.is_active(),
                    occurred_at: Utc::now(),
                }),
            )?;
            if !current.value.is_active() {
                // A category deactivated since the read must fail this commit.
                uow.push(Write::update(
                    CATEGORY.collection,
                    category.value.id_typed().to_string(),
                    json!({}),
                    ExpectedVersion::Exact(category.version),
                ));
            }
            self.ctx.commit(uow)?;
            Ok(product)
        })
    }

    pub fn get_category(&self, category_id: CategoryId) -> EngineResult<ProductCategory> {
        Ok(load::<ProductCategory, _>(self.ctx.store(), CATEGORY.collection, category_id)?.value)
    }

    pub fn get_product(&self, product_id: ProductId) -> EngineResult<Product> {
        Ok(load::<Product, _>(self.ctx.store(), PRODUCT.collection, product_id)?.value)
    }

    pub fn list_categories(&self, supplier_id: UserId) -> EngineResult<Vec<ProductCategory>> {
        debug!(supplier_id = %supplier_id, "listing categories");
        list_values(self.ctx.store(), CATEGORY.collection, &catalog_order(supplier_id))
    }

    pub fn list_products(&self, supplier_id: UserId) -> EngineResult<Vec<Product>> {
        debug!(supplier_id = %supplier_id, "listing products");
        list_values(self.ctx.store(), PRODUCT.collection, &catalog_order(supplier_id))
    }

    /// Product → category index for pricing a supplier's orders.
    pub fn category_lookup(&self, supplier_id: UserId) -> EngineResult<ProductCategoryLookup> {
        let categories = self.list_categories(supplier_id)?;
        let products = self.list_products(supplier_id)?;
        Ok(ProductCategoryLookup::build(&categories, &products))
    }

    fn ensure_category_of(&self, supplier_id: UserId, category_id: CategoryId) -> EngineResult<()> {
        let category =
            load::<ProductCategory, _>(self.ctx.store(), CATEGORY.collection, category_id)?;
        if category.value.supplier_id() != supplier_id {
            return Err(EngineError::Validation(format!(
                "category {category_id} belongs to another supplier"
            )));
        }
        if !category.value.is_active() {
            return Err(EngineError::Validation(format!(
                "category {category_id} is inactive"
            )));
        }
        Ok(())
    }
}
