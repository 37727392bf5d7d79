//! Supplier catalog domain module.
//!
//! Product categories (unit of measure, VAC eligibility) and the products
//! filed under them, implemented as deterministic domain logic (no IO).

pub mod category;
pub mod lookup;
pub mod product;

pub use category::{
    ActivateCategory, CategoryActivated, CategoryCommand, CategoryCreated, CategoryDeactivated,
    CategoryEvent, CategoryId, CategoryUpdated, CreateCategory, DeactivateCategory,
    ProductCategory, UpdateCategory,
};
pub use lookup::{CatalogEntry, CategoryRef, ProductCategoryLookup};
pub use product::{
    ActivateProduct, CreateProduct, DeactivateProduct, Product, ProductActivated, ProductCommand,
    ProductCreated, ProductDeactivated, ProductEvent, ProductId, ProductUpdated, UpdateProduct,
};
