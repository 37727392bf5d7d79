use serde::{Deserialize, Serialize};

use tradegate_catalog::{CategoryId, ProductId};

/// Immutable pricing snapshot of one order line.
///
/// `total` covers regular units only. VAC units are billed off-platform
/// against shipped weight using `vac_surcharge_at_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub quantity_regular: u32,
    pub quantity_vac: u32,
    pub unit_price: u64,
    /// Per-kg surcharge for the category when the order was placed.
    pub vac_surcharge_at_order: Option<u64>,
    pub total: u64,
}

impl tradegate_core::ValueObject for OrderItem {}
