//! Product → category resolution used when pricing an order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{CategoryId, Product, ProductCategory, ProductId};

/// The category facts an order line needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    pub vac_enabled: bool,
}

impl tradegate_core::ValueObject for CategoryRef {}

/// One resolvable catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product_id: ProductId,
    pub product_name: String,
    pub category: CategoryRef,
    /// Product and category are both active.
    pub orderable: bool,
}

/// Immutable product → category index built from a supplier's catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCategoryLookup {
    entries: HashMap<ProductId, CatalogEntry>,
}

impl ProductCategoryLookup {
    /// Index `products` against `categories`. Products whose category is not
    /// among `categories` are left out.
    pub fn build(categories: &[ProductCategory], products: &[Product]) -> Self {
        let by_id: HashMap<CategoryId, &ProductCategory> =
            categories.iter().map(|c| (c.id_typed(), c)).collect();

        let entries = products
            .iter()
            .filter_map(|p| {
                let category = by_id.get(&p.category_id())?;
                Some((
                    p.id_typed(),
                    CatalogEntry {
                        product_id: p.id_typed(),
                        product_name: p.name().to_string(),
                        category: CategoryRef {
                            id: category.id_typed(),
                            name: category.name().to_string(),
                            vac_enabled: category.vac_enabled(),
                        },
                        orderable: p.is_active() && category.is_active(),
                    },
                ))
            })
            .collect();

        Self { entries }
    }

    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.product_id, entry);
    }

    pub fn get(&self, product_id: ProductId) -> Option<&CatalogEntry> {
        self.entries.get(&product_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
