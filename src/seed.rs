use log::info;
use rusqlite::OptionalExtension;
use serde::Serialize;

use crate::categories::Categories;
use crate::database::Database;
use crate::error::StorefrontError;
use crate::products::{NewProduct, Products, StoredFile};
use crate::stores::{NewStore, Stores};
use crate::utils::Utils;

const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "Skateboards",
        "Complete boards and the parts to build your own",
        &["Decks", "Wheels", "Trucks", "Bearings", "Griptape"],
    ),
    (
        "Clothing",
        "Apparel for riding and hanging out",
        &["Hoodies", "T-shirts", "Pants", "Hats"],
    ),
    (
        "Shoes",
        "Durable shoes with grip",
        &["Low Tops", "High Tops", "Slip Ons"],
    ),
    (
        "Accessories",
        "Everything else you need",
        &["Backpacks", "Socks", "Stickers"],
    ),
];

/// (name, description, payment account)
const STORES: &[(&str, &str, Option<&str>)] = &[
    (
        "Cozy Skate Co",
        "Independent shop run by local riders",
        Some("acct_demo_cozy"),
    ),
    ("Street Supply", "Hardware and apparel at cost", None),
];

struct DemoProduct {
    name: &'static str,
    category: &'static str,
    subcategory: &'static str,
    price: f64,
    inventory: i64,
    store: usize,
    tags: &'static [&'static str],
    with_image: bool,
}

const PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        name: "Maple Street Deck 8.0",
        category: "Skateboards",
        subcategory: "Decks",
        price: 59.99,
        inventory: 25,
        store: 0,
        tags: &["street", "maple"],
        with_image: true,
    },
    DemoProduct {
        name: "Cruiser Deck 9.5",
        category: "Skateboards",
        subcategory: "Decks",
        price: 74.0,
        inventory: 8,
        store: 1,
        tags: &["cruiser"],
        with_image: false,
    },
    DemoProduct {
        name: "Conical Wheels 53mm",
        category: "Skateboards",
        subcategory: "Wheels",
        price: 34.5,
        inventory: 40,
        store: 0,
        tags: &["street"],
        with_image: true,
    },
    DemoProduct {
        name: "Soft Wheels 60mm",
        category: "Skateboards",
        subcategory: "Wheels",
        price: 42.0,
        inventory: 12,
        store: 1,
        tags: &["cruiser", "soft"],
        with_image: false,
    },
    DemoProduct {
        name: "Hollow Trucks 139",
        category: "Skateboards",
        subcategory: "Trucks",
        price: 64.99,
        inventory: 16,
        store: 0,
        tags: &["light"],
        with_image: true,
    },
    DemoProduct {
        name: "Ceramic Bearings",
        category: "Skateboards",
        subcategory: "Bearings",
        price: 89.0,
        inventory: 5,
        store: 1,
        tags: &["speed"],
        with_image: false,
    },
    DemoProduct {
        name: "Coarse Griptape Sheet",
        category: "Skateboards",
        subcategory: "Griptape",
        price: 9.99,
        inventory: 100,
        store: 0,
        tags: &[],
        with_image: false,
    },
    DemoProduct {
        name: "Heavyweight Hoodie",
        category: "Clothing",
        subcategory: "Hoodies",
        price: 65.0,
        inventory: 20,
        store: 0,
        tags: &["winter"],
        with_image: true,
    },
    DemoProduct {
        name: "Logo Tee",
        category: "Clothing",
        subcategory: "T-shirts",
        price: 24.0,
        inventory: 60,
        store: 1,
        tags: &["cotton"],
        with_image: true,
    },
    DemoProduct {
        name: "Double Knee Pants",
        category: "Clothing",
        subcategory: "Pants",
        price: 79.0,
        inventory: 14,
        store: 0,
        tags: &["canvas"],
        with_image: false,
    },
    DemoProduct {
        name: "Five Panel Cap",
        category: "Clothing",
        subcategory: "Hats",
        price: 29.0,
        inventory: 30,
        store: 1,
        tags: &[],
        with_image: false,
    },
    DemoProduct {
        name: "Suede Low Top",
        category: "Shoes",
        subcategory: "Low Tops",
        price: 72.0,
        inventory: 18,
        store: 0,
        tags: &["suede"],
        with_image: true,
    },
    DemoProduct {
        name: "Canvas High Top",
        category: "Shoes",
        subcategory: "High Tops",
        price: 68.0,
        inventory: 9,
        store: 1,
        tags: &["canvas"],
        with_image: true,
    },
    DemoProduct {
        name: "Checker Slip On",
        category: "Shoes",
        subcategory: "Slip Ons",
        price: 55.0,
        inventory: 22,
        store: 0,
        tags: &[],
        with_image: false,
    },
    DemoProduct {
        name: "Board Carry Backpack",
        category: "Accessories",
        subcategory: "Backpacks",
        price: 95.0,
        inventory: 7,
        store: 0,
        tags: &["travel"],
        with_image: true,
    },
    DemoProduct {
        name: "Crew Socks 3-Pack",
        category: "Accessories",
        subcategory: "Socks",
        price: 18.0,
        inventory: 45,
        store: 1,
        tags: &[],
        with_image: false,
    },
    DemoProduct {
        name: "Sticker Pack",
        category: "Accessories",
        subcategory: "Stickers",
        price: 5.0,
        inventory: 200,
        store: 0,
        tags: &["gift"],
        with_image: false,
    },
];

/// What a seeding run created. Entities that already existed are skipped, so a
/// second run reports all zeroes.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub categories: usize,
    pub subcategories: usize,
    pub stores: usize,
    pub products: usize,
}

pub struct Seed;

impl Seed {
    pub fn seed_demo_catalog(db: &Database) -> Result<SeedSummary, StorefrontError> {
        let mut summary = SeedSummary::default();

        let mut category_ids = Vec::new();
        let mut subcategory_ids = Vec::new();
        for (name, description, subcategories) in CATEGORIES {
            let existing =
                Self::lookup_id(db, "SELECT id FROM categories WHERE name = ?", &[*name])?;
            let category_id = match existing {
                Some(id) => id,
                None => {
                    summary.categories += 1;
                    Categories::add_category(db, name, Some(*description))?
                }
            };

            for sub_name in *subcategories {
                let sub_id = match Self::lookup_id(
                    db,
                    "SELECT id FROM subcategories WHERE name = ? AND category_id = ?",
                    &[*sub_name, category_id.as_str()],
                )? {
                    Some(id) => id,
                    None => {
                        summary.subcategories += 1;
                        Categories::add_subcategory(db, &category_id, sub_name, None)?
                    }
                };
                subcategory_ids.push((*name, *sub_name, sub_id));
            }
            category_ids.push((*name, category_id));
        }

        let mut store_ids = Vec::new();
        for (name, description, stripe_account_id) in STORES {
            let slug = Utils::slugify(name);
            let existing =
                Self::lookup_id(db, "SELECT id FROM stores WHERE slug = ?", &[slug.as_str()])?;
            let store_id = match existing {
                Some(id) => id,
                None => {
                    summary.stores += 1;
                    let id = Stores::add_store(
                        db,
                        &NewStore {
                            user_id: None,
                            name: name.to_string(),
                            description: Some(description.to_string()),
                        },
                    )?;
                    if stripe_account_id.is_some() {
                        Stores::set_stripe_account(db, &id, *stripe_account_id)?;
                    }
                    id
                }
            };
            store_ids.push(store_id);
        }

        for product in PRODUCTS {
            let existing =
                Self::lookup_id(db, "SELECT id FROM products WHERE name = ?", &[product.name])?;
            if existing.is_some() {
                continue;
            }

            let category_id = Self::find(&category_ids, |(name, _)| *name == product.category)
                .map(|(_, id)| id.clone())?;
            let subcategory_id = Self::find(&subcategory_ids, |(cat, sub, _)| {
                *cat == product.category && *sub == product.subcategory
            })
            .map(|(_, _, id)| id.clone())?;
            let store_id = store_ids.get(product.store).ok_or_else(|| {
                StorefrontError::Error(format!("No demo store for '{}'", product.name))
            })?;

            let images = if product.with_image {
                let slug = Utils::slugify(product.name);
                vec![StoredFile {
                    id: slug.clone(),
                    name: format!("{slug}.jpg"),
                    url: format!("/images/{slug}.jpg"),
                }]
            } else {
                Vec::new()
            };

            Products::add_product(
                db,
                store_id,
                &NewProduct {
                    name: product.name.to_string(),
                    description: None,
                    images,
                    category_id,
                    subcategory_id: Some(subcategory_id),
                    price: product.price,
                    inventory: product.inventory,
                    tags: product.tags.iter().map(|t| t.to_string()).collect(),
                },
            )?;
            summary.products += 1;
        }

        info!(
            "Seeded demo catalog: {} categories, {} subcategories, {} stores, {} products",
            summary.categories, summary.subcategories, summary.stores, summary.products
        );
        Ok(summary)
    }

    fn lookup_id(
        db: &Database,
        sql: &str,
        keys: &[&str],
    ) -> Result<Option<String>, StorefrontError> {
        let conn = db.get_connection()?;
        let id = conn
            .query_row(sql, rusqlite::params_from_iter(keys), |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    fn find<T, P: Fn(&T) -> bool>(items: &[T], predicate: P) -> Result<&T, StorefrontError> {
        items
            .iter()
            .find(|item| predicate(item))
            .ok_or_else(|| StorefrontError::Error("Demo catalog is inconsistent".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, QueryParams};

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::open_in_memory().unwrap();

        let first = Seed::seed_demo_catalog(&db).unwrap();
        assert_eq!(first.categories, CATEGORIES.len());
        assert_eq!(first.stores, STORES.len());
        assert_eq!(first.products, PRODUCTS.len());

        let second = Seed::seed_demo_catalog(&db).unwrap();
        assert_eq!(second, SeedSummary::default());

        let page = Catalog::get_products(&db, &QueryParams::new().with("per_page", "100"));
        assert_eq!(page.total_count, PRODUCTS.len() as u64);
    }

    #[test]
    fn test_seeded_catalog_supports_filters() {
        let db = Database::open_in_memory().unwrap();
        Seed::seed_demo_catalog(&db).unwrap();

        let shoes = Catalog::get_products(&db, &QueryParams::from_query_string("categories=Shoes"));
        assert_eq!(shoes.total_count, 3);

        let active = Catalog::get_products(
            &db,
            &QueryParams::from_query_string("active=true&per_page=100"),
        );
        let expected = PRODUCTS.iter().filter(|p| p.store == 0).count() as u64;
        assert_eq!(active.total_count, expected);
    }
}
