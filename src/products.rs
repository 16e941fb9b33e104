use log::{error, info};
use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::StorefrontError;
use crate::utils::Utils;

/// An already-uploaded image. Upload and storage happen elsewhere; the
/// catalog only keeps the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// A product as shown on the storefront, joined with its category,
/// subcategory and the owning store's payment account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<StoredFile>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub price: f64,
    pub inventory: i64,
    pub rating: i64,
    pub tags: Vec<String>,
    pub store_id: String,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub stripe_account_id: Option<String>,
}

impl CatalogProduct {
    pub const COLUMNS: &str = "products.id,
        products.name,
        products.description,
        products.images,
        categories.name,
        subcategories.name,
        products.price,
        products.inventory,
        products.rating,
        products.tags,
        products.store_id,
        products.created_at,
        products.updated_at,
        stores.stripe_account_id";

    const FROM_JOINED: &str = "FROM products
        LEFT JOIN stores ON products.store_id = stores.id
        LEFT JOIN categories ON products.category_id = categories.id
        LEFT JOIN subcategories ON products.subcategory_id = subcategories.id";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CatalogProduct {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            images: Utils::json_column(row, 3)?,
            category: row.get(4)?,
            subcategory: row.get(5)?,
            price: row.get(6)?,
            inventory: row.get(7)?,
            rating: row.get(8)?,
            tags: Utils::json_column(row, 9)?,
            store_id: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
            stripe_account_id: row.get(13)?,
        })
    }
}

/// A row of the merchant dashboard's product table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTableRow {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub price: f64,
    pub inventory: i64,
    pub rating: i64,
    pub created_at: i64,
}

impl ProductTableRow {
    pub const COLUMNS: &str = "products.id,
        products.name,
        categories.name,
        products.price,
        products.inventory,
        products.rating,
        products.created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ProductTableRow {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            price: row.get(3)?,
            inventory: row.get(4)?,
            rating: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

/// Fields a merchant supplies when adding or editing a product.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<StoredFile>,
    pub category_id: String,
    #[serde(default)]
    pub subcategory_id: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub inventory: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewProduct {
    fn validate(&self) -> Result<(), StorefrontError> {
        if self.name.trim().is_empty() {
            return Err(StorefrontError::InvalidInput("Product name cannot be empty".into()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(StorefrontError::InvalidInput(format!(
                "Invalid price: {}",
                self.price
            )));
        }
        if self.inventory < 0 {
            return Err(StorefrontError::InvalidInput(format!(
                "Invalid inventory: {}",
                self.inventory
            )));
        }
        Ok(())
    }
}

/// Result of the per-category count. Failures report zero plus the message
/// rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCount {
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A product name hit from the search box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductMatch {
    pub id: String,
    pub name: String,
}

/// Search hits grouped under their category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryMatches {
    pub id: String,
    pub name: String,
    pub products: Vec<ProductMatch>,
}

/// Search response. `data` is null for an empty query or a failed search;
/// a failure also carries the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSearch {
    pub data: Option<Vec<CategoryMatches>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Products;

impl Products {
    const FEATURED_LIMIT: i64 = 8;
    const MAX_RATING: i64 = 5;

    pub fn get_product(
        db: &Database,
        product_id: &str,
    ) -> Result<Option<CatalogProduct>, StorefrontError> {
        let conn = db.get_connection()?;
        let sql = format!(
            "SELECT {} {} WHERE products.id = ?",
            CatalogProduct::COLUMNS,
            CatalogProduct::FROM_JOINED
        );

        conn.query_row(&sql, [product_id], CatalogProduct::from_row)
            .optional()
            .map_err(StorefrontError::DatabaseError)
    }

    /// Products from stores that can take payment first, then products with
    /// images, newest first within each group.
    pub fn get_featured_products(db: &Database) -> Result<Vec<CatalogProduct>, StorefrontError> {
        let conn = db.get_connection()?;
        let sql = format!(
            "SELECT {} {}
            ORDER BY (stores.stripe_account_id IS NOT NULL) DESC,
                (products.images IS NOT NULL AND products.images <> '[]') DESC,
                products.created_at DESC,
                products.id ASC
            LIMIT ?",
            CatalogProduct::COLUMNS,
            CatalogProduct::FROM_JOINED
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([Self::FEATURED_LIMIT], CatalogProduct::from_row)?;
        let products = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    pub fn try_count_by_category(
        db: &Database,
        category_id: &str,
    ) -> Result<i64, StorefrontError> {
        let conn = db.get_connection()?;
        let count = conn.query_row(
            "SELECT COUNT(products.id) FROM products WHERE products.category_id = ?",
            [category_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn get_product_count(db: &Database, category_id: &str) -> ProductCount {
        match Self::try_count_by_category(db, category_id) {
            Ok(count) => ProductCount { count, error: None },
            Err(e) => {
                error!("Failed to count products for category {}: {}", category_id, e);
                ProductCount {
                    count: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Case-insensitive substring match on product names, grouped by
    /// category. Returns `None` when the trimmed query is empty.
    pub fn try_search_products(
        db: &Database,
        query: &str,
    ) -> Result<Option<Vec<CategoryMatches>>, StorefrontError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let conn = db.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT categories.id, categories.name, products.id, products.name
            FROM products
            JOIN categories ON products.category_id = categories.id
            WHERE instr(lower(products.name), lower(?)) > 0
            ORDER BY categories.name ASC, categories.id ASC, products.name ASC, products.id ASC",
        )?;

        let mut groups: Vec<CategoryMatches> = Vec::new();
        let mut rows = stmt.query([query])?;
        while let Some(row) = rows.next()? {
            let category_id: String = row.get(0)?;
            let product = ProductMatch {
                id: row.get(2)?,
                name: row.get(3)?,
            };

            match groups.last_mut() {
                Some(group) if group.id == category_id => group.products.push(product),
                _ => groups.push(CategoryMatches {
                    id: category_id,
                    name: row.get(1)?,
                    products: vec![product],
                }),
            }
        }

        Ok(Some(groups))
    }

    pub fn search_products(db: &Database, query: &str) -> ProductSearch {
        match Self::try_search_products(db, query) {
            Ok(data) => ProductSearch { data, error: None },
            Err(e) => {
                error!("Failed to search products for '{}': {}", query, e);
                ProductSearch {
                    data: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn add_product(
        db: &Database,
        store_id: &str,
        input: &NewProduct,
    ) -> Result<String, StorefrontError> {
        input.validate()?;

        let mut conn = db.get_connection()?;
        let tx = conn.transaction()?;

        if !Self::exists(&tx, "SELECT EXISTS(SELECT 1 FROM stores WHERE id = ?)", store_id)? {
            return Err(StorefrontError::NotFound(format!("Store '{store_id}'")));
        }
        Self::ensure_category(&tx, input)?;

        if Self::name_taken(&tx, &input.name, None)? {
            return Err(StorefrontError::Conflict("Product name already taken.".into()));
        }

        let product_id = Utils::generate_id();
        tx.execute(
            "INSERT INTO products (
                id, name, description, images, category_id, subcategory_id,
                price, inventory, rating, tags, store_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)",
            params![
                product_id,
                input.name,
                input.description,
                serde_json::to_string(&input.images)?,
                input.category_id,
                input.subcategory_id,
                input.price,
                input.inventory,
                serde_json::to_string(&input.tags)?,
                store_id,
                Utils::now_ts(),
            ],
        )?;

        tx.commit()?;

        info!("Added product '{}' ({}) to store {}", input.name, product_id, store_id);
        Ok(product_id)
    }

    pub fn update_product(
        db: &Database,
        store_id: &str,
        product_id: &str,
        input: &NewProduct,
    ) -> Result<(), StorefrontError> {
        input.validate()?;

        let mut conn = db.get_connection()?;
        let tx = conn.transaction()?;

        if !Self::owned_by_store(&tx, store_id, product_id)? {
            return Err(StorefrontError::NotFound("Product not found.".into()));
        }
        Self::ensure_category(&tx, input)?;

        if Self::name_taken(&tx, &input.name, Some(product_id))? {
            return Err(StorefrontError::Conflict("Product name already taken.".into()));
        }

        tx.execute(
            "UPDATE products SET
                name = ?, description = ?, images = ?, category_id = ?, subcategory_id = ?,
                price = ?, inventory = ?, tags = ?, updated_at = ?
            WHERE id = ?",
            params![
                input.name,
                input.description,
                serde_json::to_string(&input.images)?,
                input.category_id,
                input.subcategory_id,
                input.price,
                input.inventory,
                serde_json::to_string(&input.tags)?,
                Utils::now_ts(),
                product_id,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn update_product_rating(
        db: &Database,
        product_id: &str,
        rating: i64,
    ) -> Result<(), StorefrontError> {
        if !(0..=Self::MAX_RATING).contains(&rating) {
            return Err(StorefrontError::InvalidInput(format!(
                "Rating must be between 0 and {}: {}",
                Self::MAX_RATING,
                rating
            )));
        }

        let conn = db.get_connection()?;
        let updated = conn.execute(
            "UPDATE products SET rating = ? WHERE id = ?",
            params![rating, product_id],
        )?;

        if updated == 0 {
            return Err(StorefrontError::NotFound("Product not found.".into()));
        }
        Ok(())
    }

    pub fn delete_product(
        db: &Database,
        store_id: &str,
        product_id: &str,
    ) -> Result<(), StorefrontError> {
        let conn = db.get_connection()?;
        let deleted = conn.execute(
            "DELETE FROM products WHERE id = ? AND store_id = ?",
            params![product_id, store_id],
        )?;

        if deleted == 0 {
            return Err(StorefrontError::NotFound("Product not found.".into()));
        }

        info!("Deleted product {} from store {}", product_id, store_id);
        Ok(())
    }

    fn exists(tx: &Transaction, sql: &str, id: &str) -> Result<bool, StorefrontError> {
        Ok(tx.query_row(sql, [id], |row| row.get(0))?)
    }

    fn owned_by_store(
        tx: &Transaction,
        store_id: &str,
        product_id: &str,
    ) -> Result<bool, StorefrontError> {
        Ok(tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = ? AND store_id = ?)",
            [product_id, store_id],
            |row| row.get(0),
        )?)
    }

    fn ensure_category(tx: &Transaction, input: &NewProduct) -> Result<(), StorefrontError> {
        if !Self::exists(
            tx,
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?)",
            &input.category_id,
        )? {
            return Err(StorefrontError::InvalidInput(format!(
                "Unknown category '{}'",
                input.category_id
            )));
        }

        if let Some(subcategory_id) = &input.subcategory_id {
            let belongs: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM subcategories WHERE id = ? AND category_id = ?)",
                [subcategory_id, &input.category_id],
                |row| row.get(0),
            )?;
            if !belongs {
                return Err(StorefrontError::InvalidInput(format!(
                    "Subcategory '{}' is not part of category '{}'",
                    subcategory_id, input.category_id
                )));
            }
        }
        Ok(())
    }

    fn name_taken(
        tx: &Transaction,
        name: &str,
        except_id: Option<&str>,
    ) -> Result<bool, StorefrontError> {
        Ok(tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM products WHERE name = ? AND id IS NOT ?)",
            params![name, except_id],
            |row| row.get(0),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::Categories;
    use crate::stores::{NewStore, Stores};

    struct Fixture {
        db: Database,
        store_id: String,
        category_id: String,
        subcategory_id: String,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let store_id = Stores::add_store(
            &db,
            &NewStore {
                user_id: None,
                name: "Cozy Skate Co".into(),
                description: None,
            },
        )
        .unwrap();
        let category_id = Categories::add_category(&db, "Skateboards", None).unwrap();
        let subcategory_id =
            Categories::add_subcategory(&db, &category_id, "Decks", None).unwrap();
        Fixture {
            db,
            store_id,
            category_id,
            subcategory_id,
        }
    }

    fn new_product(f: &Fixture, name: &str) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: Some("Maple".into()),
            images: vec![StoredFile {
                id: "f1".into(),
                name: "deck.png".into(),
                url: "https://files.example/deck.png".into(),
            }],
            category_id: f.category_id.clone(),
            subcategory_id: Some(f.subcategory_id.clone()),
            price: 59.99,
            inventory: 12,
            tags: vec!["street".into()],
        }
    }

    #[test]
    fn test_add_and_get_product() {
        let f = fixture();
        let id = Products::add_product(&f.db, &f.store_id, &new_product(&f, "Deck")).unwrap();

        let product = Products::get_product(&f.db, &id).unwrap().unwrap();
        assert_eq!(product.name, "Deck");
        assert_eq!(product.category.as_deref(), Some("Skateboards"));
        assert_eq!(product.subcategory.as_deref(), Some("Decks"));
        assert_eq!(product.images.len(), 1);
        assert_eq!(product.tags, vec!["street"]);
        assert_eq!(product.rating, 0);
        assert!(product.updated_at.is_none());

        assert!(Products::get_product(&f.db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_add_product_duplicate_name() {
        let f = fixture();
        Products::add_product(&f.db, &f.store_id, &new_product(&f, "Deck")).unwrap();
        let err = Products::add_product(&f.db, &f.store_id, &new_product(&f, "Deck")).unwrap_err();
        assert!(matches!(err, StorefrontError::Conflict(_)));
    }

    #[test]
    fn test_add_product_validation() {
        let f = fixture();

        let mut input = new_product(&f, "Deck");
        input.price = -1.0;
        assert!(matches!(
            Products::add_product(&f.db, &f.store_id, &input),
            Err(StorefrontError::InvalidInput(_))
        ));

        let mut input = new_product(&f, "Deck");
        input.category_id = "nope".into();
        assert!(matches!(
            Products::add_product(&f.db, &f.store_id, &input),
            Err(StorefrontError::InvalidInput(_))
        ));

        assert!(matches!(
            Products::add_product(&f.db, "no-store", &new_product(&f, "Deck")),
            Err(StorefrontError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_product_scoped_to_store() {
        let f = fixture();
        let id = Products::add_product(&f.db, &f.store_id, &new_product(&f, "Deck")).unwrap();

        let mut input = new_product(&f, "Deck Pro");
        input.price = 79.0;
        Products::update_product(&f.db, &f.store_id, &id, &input).unwrap();

        let product = Products::get_product(&f.db, &id).unwrap().unwrap();
        assert_eq!(product.name, "Deck Pro");
        assert_eq!(product.price, 79.0);
        assert!(product.updated_at.is_some());

        let err = Products::update_product(&f.db, "other-store", &id, &input).unwrap_err();
        assert!(matches!(err, StorefrontError::NotFound(_)));
    }

    #[test]
    fn test_update_product_keeps_own_name() {
        let f = fixture();
        let id = Products::add_product(&f.db, &f.store_id, &new_product(&f, "Deck")).unwrap();
        Products::add_product(&f.db, &f.store_id, &new_product(&f, "Wheels")).unwrap();

        Products::update_product(&f.db, &f.store_id, &id, &new_product(&f, "Deck")).unwrap();
        let err =
            Products::update_product(&f.db, &f.store_id, &id, &new_product(&f, "Wheels")).unwrap_err();
        assert!(matches!(err, StorefrontError::Conflict(_)));
    }

    #[test]
    fn test_rating_and_delete() {
        let f = fixture();
        let id = Products::add_product(&f.db, &f.store_id, &new_product(&f, "Deck")).unwrap();

        Products::update_product_rating(&f.db, &id, 4).unwrap();
        assert_eq!(Products::get_product(&f.db, &id).unwrap().unwrap().rating, 4);
        assert!(matches!(
            Products::update_product_rating(&f.db, &id, 9),
            Err(StorefrontError::InvalidInput(_))
        ));
        assert!(matches!(
            Products::update_product_rating(&f.db, "missing", 3),
            Err(StorefrontError::NotFound(_))
        ));

        assert!(matches!(
            Products::delete_product(&f.db, "other-store", &id),
            Err(StorefrontError::NotFound(_))
        ));
        Products::delete_product(&f.db, &f.store_id, &id).unwrap();
        assert!(Products::get_product(&f.db, &id).unwrap().is_none());
    }

    #[test]
    fn test_product_count_by_category() {
        let f = fixture();
        Products::add_product(&f.db, &f.store_id, &new_product(&f, "Deck")).unwrap();
        Products::add_product(&f.db, &f.store_id, &new_product(&f, "Deck 2")).unwrap();

        let count = Products::get_product_count(&f.db, &f.category_id);
        assert_eq!(count, ProductCount { count: 2, error: None });
        assert_eq!(Products::get_product_count(&f.db, "other").count, 0);
    }

    #[test]
    fn test_product_count_reports_failure() {
        let f = fixture();
        f.db.get_connection()
            .unwrap()
            .execute_batch("DROP TABLE products")
            .unwrap();

        let count = Products::get_product_count(&f.db, &f.category_id);
        assert_eq!(count.count, 0);
        assert!(count.error.is_some());
    }

    #[test]
    fn test_search_groups_matches_by_category() {
        let f = fixture();
        let shoes = Categories::add_category(&f.db, "Shoes", None).unwrap();
        Products::add_product(&f.db, &f.store_id, &new_product(&f, "Street Deck")).unwrap();
        Products::add_product(&f.db, &f.store_id, &new_product(&f, "Park Deck")).unwrap();
        Products::add_product(&f.db, &f.store_id, &new_product(&f, "Bearings")).unwrap();
        let mut deck_shoe = new_product(&f, "Deck Shoe");
        deck_shoe.category_id = shoes;
        deck_shoe.subcategory_id = None;
        Products::add_product(&f.db, &f.store_id, &deck_shoe).unwrap();

        let groups = Products::try_search_products(&f.db, " DECK ").unwrap().unwrap();
        let summary: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|g| {
                (
                    g.name.as_str(),
                    g.products.iter().map(|p| p.name.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Shoes", vec!["Deck Shoe"]),
                ("Skateboards", vec!["Park Deck", "Street Deck"]),
            ]
        );

        assert_eq!(
            Products::try_search_products(&f.db, "helmet").unwrap(),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_search_empty_query_and_failure() {
        let f = fixture();
        assert_eq!(
            Products::search_products(&f.db, "   "),
            ProductSearch {
                data: None,
                error: None
            }
        );

        f.db.get_connection()
            .unwrap()
            .execute_batch("DROP TABLE products")
            .unwrap();
        let search = Products::search_products(&f.db, "deck");
        assert!(search.data.is_none());
        assert!(search.error.is_some());
    }

    #[test]
    fn test_featured_prefers_payable_stores_and_images() {
        let f = fixture();
        let other_store = Stores::add_store(
            &f.db,
            &NewStore {
                user_id: None,
                name: "Street Supply".into(),
                description: None,
            },
        )
        .unwrap();
        Stores::set_stripe_account(&f.db, &other_store, Some("acct_1")).unwrap();

        let mut no_images = new_product(&f, "Plain");
        no_images.images.clear();
        Products::add_product(&f.db, &f.store_id, &no_images).unwrap();
        Products::add_product(&f.db, &f.store_id, &new_product(&f, "Pictured")).unwrap();
        Products::add_product(&f.db, &other_store, &new_product(&f, "Payable")).unwrap();

        let featured = Products::get_featured_products(&f.db).unwrap();
        let names: Vec<&str> = featured.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Payable", "Pictured", "Plain"]);
    }
}
