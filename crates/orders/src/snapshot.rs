//! Freezing cart prices into order items.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use tradegate_catalog::{ProductCategoryLookup, ProductId};
use tradegate_core::{DomainError, DomainResult, line_total};
use tradegate_pricing::PriceList;

use crate::OrderItem;

/// A customer's requested quantities for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity_regular: u32,
    pub quantity_vac: u32,
}

/// A priced cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity_regular: u32,
    pub quantity_vac: u32,
    pub unit_price: u64,
}

/// Price requested lines from the list's items. Unknown or unavailable
/// products are rejected.
pub fn price_lines(requests: &[LineRequest], price_list: &PriceList) -> DomainResult<Vec<CartLine>> {
    requests
        .iter()
        .map(|req| {
            let item = price_list.item(req.product_id).ok_or_else(|| {
                DomainError::validation(format!(
                    "product {} is not on price list {}",
                    req.product_id,
                    price_list.name()
                ))
            })?;
            if !item.is_available {
                return Err(DomainError::validation(format!(
                    "product {} is currently unavailable",
                    req.product_id
                )));
            }
            Ok(CartLine {
                product_id: req.product_id,
                quantity_regular: req.quantity_regular,
                quantity_vac: req.quantity_vac,
                unit_price: item.price,
            })
        })
        .collect()
}

/// Build the order items for `cart`.
///
/// Only the arguments are consulted: the surcharge stamped on each line is
/// the one `price_list` carries at call time, so later edits to the list
/// never reach an order built from this snapshot.
pub fn snapshot(
    cart: &[CartLine],
    price_list: &PriceList,
    lookup: &ProductCategoryLookup,
) -> DomainResult<Vec<OrderItem>> {
    let mut seen = HashSet::with_capacity(cart.len());

    cart.iter()
        .map(|line| {
            if !seen.insert(line.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} appears twice in the cart",
                    line.product_id
                )));
            }
            if line.quantity_regular == 0 && line.quantity_vac == 0 {
                return Err(DomainError::validation(format!(
                    "quantity for product {} must be positive",
                    line.product_id
                )));
            }

            let entry = lookup.get(line.product_id).ok_or_else(|| {
                DomainError::validation(format!(
                    "product {} has no known category",
                    line.product_id
                ))
            })?;
            if line.quantity_vac > 0 && !entry.category.vac_enabled {
                return Err(DomainError::validation(format!(
                    "category {} does not offer VAC packing",
                    entry.category.name
                )));
            }

            Ok(OrderItem {
                product_id: line.product_id,
                product_name: entry.product_name.clone(),
                category_id: entry.category.id,
                category_name: entry.category.name.clone(),
                quantity_regular: line.quantity_regular,
                quantity_vac: line.quantity_vac,
                unit_price: line.unit_price,
                vac_surcharge_at_order: price_list.vac_surcharge(entry.category.id),
                total: line_total(line.quantity_regular, line.unit_price)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::collections::BTreeMap;
    use tradegate_catalog::{CatalogEntry, CategoryId, CategoryRef};
    use tradegate_core::{Aggregate, PartyRef, UserId};
    use tradegate_pricing::{
        CreatePriceList, PriceListCommand, PriceListId, PriceListItem, SetVacSurcharge,
    };

    struct Fixture {
        price_list: PriceList,
        lookup: ProductCategoryLookup,
        fish: ProductId,
        bread: ProductId,
        fish_category: CategoryId,
    }

    /// Fish (VAC, 1.50/kg surcharge, 10.00) and bread (no VAC, 2.50).
    fn fixture() -> Fixture {
        let fish = ProductId::generate();
        let bread = ProductId::generate();
        let fish_category = CategoryId::generate();
        let bread_category = CategoryId::generate();

        let id = PriceListId::generate();
        let mut price_list = PriceList::empty(id);
        let cmd = PriceListCommand::CreatePriceList(CreatePriceList {
            price_list_id: id,
            supplier: PartyRef::new(UserId::new(), "North Sea Fishery"),
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            is_default: false,
            notes: None,
            vac_surcharges: BTreeMap::from([(fish_category, 150)]),
            items: vec![
                PriceListItem {
                    product_id: fish,
                    price: 1_000,
                    vac_price: None,
                    is_available: true,
                },
                PriceListItem {
                    product_id: bread,
                    price: 250,
                    vac_price: None,
                    is_available: false,
                },
            ],
            created_by: UserId::new(),
            occurred_at: Utc::now(),
        });
        for e in price_list.handle(&cmd).unwrap() {
            price_list.apply(&e);
        }

        let mut lookup = ProductCategoryLookup::default();
        lookup.insert(CatalogEntry {
            product_id: fish,
            product_name: "Cod fillet".to_string(),
            category: CategoryRef {
                id: fish_category,
                name: "Fish".to_string(),
                vac_enabled: true,
            },
            orderable: true,
        });
        lookup.insert(CatalogEntry {
            product_id: bread,
            product_name: "Rye loaf".to_string(),
            category: CategoryRef {
                id: bread_category,
                name: "Bakery".to_string(),
                vac_enabled: false,
            },
            orderable: true,
        });

        Fixture {
            price_list,
            lookup,
            fish,
            bread,
            fish_category,
        }
    }

    fn line(product_id: ProductId, regular: u32, vac: u32, price: u64) -> CartLine {
        CartLine {
            product_id,
            quantity_regular: regular,
            quantity_vac: vac,
            unit_price: price,
        }
    }

    #[test]
    fn vac_is_stamped_but_excluded_from_total() {
        let f = fixture();
        let items = snapshot(&[line(f.fish, 3, 2, 1_000)], &f.price_list, &f.lookup).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].total, 3_000);
        assert_eq!(items[0].vac_surcharge_at_order, Some(150));
        assert_eq!(items[0].category_name, "Fish");
    }

    #[test]
    fn category_without_surcharge_snapshots_none() {
        let f = fixture();
        let items = snapshot(&[line(f.bread, 4, 0, 250)], &f.price_list, &f.lookup).unwrap();
        assert_eq!(items[0].vac_surcharge_at_order, None);
        assert_eq!(items[0].total, 1_000);
    }

    #[test]
    fn later_surcharge_edit_does_not_touch_snapshot() {
        let mut f = fixture();
        let items = snapshot(&[line(f.fish, 1, 1, 1_000)], &f.price_list, &f.lookup).unwrap();

        let edit = PriceListCommand::SetVacSurcharge(SetVacSurcharge {
            price_list_id: f.price_list.id_typed(),
            category_id: f.fish_category,
            amount_per_kg: Some(300),
            occurred_at: Utc::now(),
        });
        for e in f.price_list.handle(&edit).unwrap() {
            f.price_list.apply(&e);
        }

        assert_eq!(items[0].vac_surcharge_at_order, Some(150));
        let again = snapshot(&[line(f.fish, 1, 1, 1_000)], &f.price_list, &f.lookup).unwrap();
        assert_eq!(again[0].vac_surcharge_at_order, Some(300));
    }

    #[test]
    fn rejects_empty_duplicate_and_non_vac_lines() {
        let f = fixture();
        let cases = [
            vec![line(f.fish, 0, 0, 1_000)],
            vec![line(f.fish, 1, 0, 1_000), line(f.fish, 2, 0, 1_000)],
            vec![line(f.bread, 1, 1, 250)],
            vec![line(ProductId::generate(), 1, 0, 100)],
        ];
        for cart in cases {
            let err = snapshot(&cart, &f.price_list, &f.lookup).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{cart:?}");
        }
    }

    #[test]
    fn price_lines_uses_list_prices() {
        let f = fixture();
        let priced = price_lines(
            &[LineRequest {
                product_id: f.fish,
                quantity_regular: 2,
                quantity_vac: 0,
            }],
            &f.price_list,
        )
        .unwrap();
        assert_eq!(priced[0].unit_price, 1_000);
    }

    #[test]
    fn price_lines_rejects_unavailable_and_unknown() {
        let f = fixture();
        for product_id in [f.bread, ProductId::generate()] {
            let err = price_lines(
                &[LineRequest {
                    product_id,
                    quantity_regular: 1,
                    quantity_vac: 0,
                }],
                &f.price_list,
            )
            .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: totals depend on regular quantity only.
            #[test]
            fn total_excludes_vac(regular in 0u32..10_000, vac in 0u32..10_000, price in 1u64..1_000_000) {
                prop_assume!(regular > 0 || vac > 0);
                let f = fixture();
                let items = snapshot(&[line(f.fish, regular, vac, price)], &f.price_list, &f.lookup).unwrap();
                prop_assert_eq!(items[0].total, u64::from(regular) * price);
            }

            /// Property: snapshots are referentially transparent.
            #[test]
            fn snapshot_is_deterministic(regular in 1u32..100, vac in 0u32..100) {
                let f = fixture();
                let cart = [line(f.fish, regular, vac, 1_000)];
                prop_assert_eq!(
                    snapshot(&cart, &f.price_list, &f.lookup),
                    snapshot(&cart, &f.price_list, &f.lookup)
                );
            }
        }
    }
}
