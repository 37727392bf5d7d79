use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Days, NaiveDate, Utc};
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tradegate_auth::Principal;
use tradegate_catalog::{
    CategoryCommand, CategoryId, CreateCategory, CreateProduct, Product, ProductCategory,
    ProductCategoryLookup, ProductCommand, ProductId,
};
use tradegate_core::{Aggregate, PartyRef, UserId};
use tradegate_events::{EventEnvelope, InMemoryEventBus};
use tradegate_infra::services::{NewCategory, NewPriceList, NewProduct};
use tradegate_infra::store::{DocumentStore, InMemoryDocumentStore, Write};
use tradegate_infra::{EngineConfig, Marketplace, OrderRequest};
use tradegate_orders::{CartLine, LineRequest, snapshot};
use tradegate_pricing::{CreatePriceList, PriceList, PriceListCommand, PriceListId, PriceListItem};

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// A price list and lookup with `size` products spread over four categories.
fn catalog_of(size: usize) -> (PriceList, ProductCategoryLookup, Vec<ProductId>) {
    let supplier = UserId::new();
    let categories: Vec<ProductCategory> = (0..4)
        .map(|i| {
            let id = CategoryId::generate();
            let mut category = ProductCategory::empty(id);
            let events = category
                .handle(&CategoryCommand::CreateCategory(CreateCategory {
                    category_id: id,
                    supplier_id: supplier,
                    name: format!("Category {i}"),
                    unit_of_measure: "kg".to_string(),
                    vac_enabled: i % 2 == 0,
                    sort_order: i,
                    occurred_at: Utc::now(),
                }))
                .unwrap();
            events.iter().for_each(|e| category.apply(e));
            category
        })
        .collect();

    let products: Vec<Product> = (0..size)
        .map(|i| {
            let id = ProductId::generate();
            let mut product = Product::empty(id);
            let events = product
                .handle(&ProductCommand::CreateProduct(CreateProduct {
                    product_id: id,
                    supplier_id: supplier,
                    category_id: categories[i % categories.len()].id_typed(),
                    name: format!("Product {i}"),
                    base_unit: "box".to_string(),
                    sort_order: i as i32,
                    occurred_at: Utc::now(),
                }))
                .unwrap();
            events.iter().for_each(|e| product.apply(e));
            product
        })
        .collect();

    let id = PriceListId::generate();
    let mut list = PriceList::empty(id);
    let events = list
        .handle(&PriceListCommand::CreatePriceList(CreatePriceList {
            price_list_id: id,
            supplier: PartyRef::new(supplier, "North Sea Fishery"),
            effective_date: start(),
            expiry_date: start() + Days::new(6),
            is_default: false,
            notes: None,
            vac_surcharges: categories.iter().map(|c| (c.id_typed(), 150)).collect(),
            items: products
                .iter()
                .map(|p| PriceListItem {
                    product_id: p.id_typed(),
                    price: 1000,
                    vac_price: None,
                    is_available: true,
                })
                .collect(),
            created_by: supplier,
            occurred_at: Utc::now(),
        }))
        .unwrap();
    events.iter().for_each(|e| list.apply(e));

    let lookup = ProductCategoryLookup::build(&categories, &products);
    let ids = products.iter().map(|p| p.id_typed()).collect();
    (list, lookup, ids)
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("pricing_snapshot");

    for size in [1, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("cart_lines", size), size, |b, &size| {
            let (list, lookup, products) = catalog_of(size);
            let cart: Vec<CartLine> = products
                .iter()
                .map(|&product_id| CartLine {
                    product_id,
                    quantity_regular: 3,
                    quantity_vac: 0,
                    unit_price: 1000,
                })
                .collect();

            b.iter(|| black_box(snapshot(black_box(&cart), &list, &lookup).unwrap()));
        });
    }

    group.finish();
}

struct Setup {
    market: Marketplace<InMemoryDocumentStore, Bus>,
    admin: Principal,
    supplier: Principal,
    customer: Principal,
    product: ProductId,
}

fn setup() -> Setup {
    let market = Marketplace::new(
        InMemoryDocumentStore::new(),
        Arc::new(InMemoryEventBus::new()),
        EngineConfig::default(),
    );
    let admin = Principal::admin(UserId::new(), "Operations");
    let supplier = Principal::supplier(UserId::new(), "North Sea Fishery");
    let customer = Principal::customer(UserId::new(), "Harbour Bistro");

    let category = market
        .catalog()
        .create_category(
            &supplier,
            supplier.user_id,
            NewCategory {
                name: "Fish".to_string(),
                unit_of_measure: "kg".to_string(),
                vac_enabled: true,
                sort_order: 1,
            },
        )
        .unwrap();
    let product = market
        .catalog()
        .create_product(
            &supplier,
            supplier.user_id,
            NewProduct {
                category_id: category.id_typed(),
                name: "Cod fillet".to_string(),
                base_unit: "box".to_string(),
                sort_order: 1,
            },
        )
        .unwrap()
        .id_typed();
    market
        .associations()
        .request_associations(&admin, &customer.as_party(), &[supplier.as_party()])
        .unwrap();

    Setup {
        market,
        admin,
        supplier,
        customer,
        product,
    }
}

impl Setup {
    fn draft(&self, week: u64) -> PriceList {
        let effective_date = start() + Days::new(7 * week);
        self.market
            .price_lists()
            .create(
                &self.supplier,
                &self.supplier.as_party(),
                NewPriceList {
                    effective_date,
                    expiry_date: effective_date + Days::new(6),
                    is_default: false,
                    notes: None,
                    vac_surcharges: BTreeMap::new(),
                    items: vec![PriceListItem {
                        product_id: self.product,
                        price: 1000,
                        vac_price: None,
                        is_available: true,
                    }],
                },
            )
            .unwrap()
    }
}

fn bench_lifecycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle_latency");
    group.sample_size(200);

    // Each iteration archives the previous week's list.
    group.bench_function("activate_price_list", |b| {
        let s = setup();
        let mut week = 0;
        b.iter(|| {
            let draft = s.draft(week);
            week += 1;
            s.market
                .price_lists()
                .activate(&s.admin, draft.id_typed())
                .unwrap();
        });
    });

    group.bench_function("place_order", |b| {
        let s = setup();
        let list = s.draft(0);
        s.market
            .price_lists()
            .activate(&s.admin, list.id_typed())
            .unwrap();

        b.iter(|| {
            s.market
                .place_order(
                    &s.customer,
                    OrderRequest {
                        supplier_id: s.supplier.user_id,
                        price_list_id: list.id_typed(),
                        delivery: None,
                        lines: vec![LineRequest {
                            product_id: s.product,
                            quantity_regular: black_box(3),
                            quantity_vac: 2,
                        }],
                        customer_notes: None,
                    },
                )
                .unwrap()
        });
    });

    group.finish();
}

fn bench_store_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_commit_throughput");

    for batch_size in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("batch_create", batch_size),
            batch_size,
            |b, &size| {
                let store = InMemoryDocumentStore::new();
                let mut next = 0u64;
                b.iter(|| {
                    let writes: Vec<Write> = (0..size)
                        .map(|_| {
                            next += 1;
                            Write::create("orders", next.to_string(), json!({"status": "pending"}))
                        })
                        .collect();
                    black_box(store.commit(writes).unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_snapshot, bench_lifecycles, bench_store_commit);
criterion_main!(benches);
