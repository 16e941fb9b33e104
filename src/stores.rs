use log::info;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::StorefrontError;
use crate::utils::Utils;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub stripe_account_id: Option<String>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl Store {
    const COLUMNS: &str =
        "id, user_id, name, description, slug, stripe_account_id, created_at, updated_at";

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Store {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            slug: row.get(4)?,
            stripe_account_id: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

/// A store as listed by the filtered stores query, with its product count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreListing {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub stripe_account_id: Option<String>,
    pub product_count: i64,
    pub created_at: i64,
}

impl StoreListing {
    pub const COLUMNS: &str = "stores.id,
        stores.name,
        stores.description,
        stores.stripe_account_id,
        COUNT(products.id),
        stores.created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(StoreListing {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            stripe_account_id: row.get(3)?,
            product_count: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub struct Stores;

impl Stores {
    pub fn get_store(db: &Database, store_id: &str) -> Result<Option<Store>, StorefrontError> {
        let conn = db.get_connection()?;
        let sql = format!("SELECT {} FROM stores WHERE id = ?", Store::COLUMNS);

        conn.query_row(&sql, [store_id], Store::from_row)
            .optional()
            .map_err(StorefrontError::DatabaseError)
    }

    pub fn add_store(db: &Database, input: &NewStore) -> Result<String, StorefrontError> {
        let slug = Self::slug_for(&input.name)?;

        let mut conn = db.get_connection()?;
        let tx = conn.transaction()?;

        if Self::slug_taken(&tx, &slug, None)? {
            return Err(StorefrontError::Conflict("Store name already taken.".into()));
        }

        let store_id = Utils::generate_id();
        tx.execute(
            "INSERT INTO stores (id, user_id, name, description, slug, created_at)
            VALUES (?, ?, ?, ?, ?, ?)",
            params![
                store_id,
                input.user_id,
                input.name.trim(),
                input.description,
                slug,
                Utils::now_ts(),
            ],
        )?;
        tx.commit()?;

        info!("Added store '{}' ({})", input.name.trim(), store_id);
        Ok(store_id)
    }

    /// Renames or re-describes a store. The owner is not editable here.
    pub fn update_store(
        db: &Database,
        store_id: &str,
        input: &NewStore,
    ) -> Result<(), StorefrontError> {
        let slug = Self::slug_for(&input.name)?;

        let mut conn = db.get_connection()?;
        let tx = conn.transaction()?;

        if Self::slug_taken(&tx, &slug, Some(store_id))? {
            return Err(StorefrontError::Conflict("Store name already taken.".into()));
        }

        let updated = tx.execute(
            "UPDATE stores SET name = ?, description = ?, slug = ?, updated_at = ? WHERE id = ?",
            params![
                input.name.trim(),
                input.description,
                slug,
                Utils::now_ts(),
                store_id
            ],
        )?;
        if updated == 0 {
            return Err(StorefrontError::NotFound("Store not found.".into()));
        }

        tx.commit()?;
        Ok(())
    }

    /// Links (or with `None`, unlinks) the store's payment account. Only
    /// stores with a linked account count as active.
    pub fn set_stripe_account(
        db: &Database,
        store_id: &str,
        stripe_account_id: Option<&str>,
    ) -> Result<(), StorefrontError> {
        let conn = db.get_connection()?;
        let updated = conn.execute(
            "UPDATE stores SET stripe_account_id = ?, updated_at = ? WHERE id = ?",
            params![stripe_account_id, Utils::now_ts(), store_id],
        )?;

        if updated == 0 {
            return Err(StorefrontError::NotFound("Store not found.".into()));
        }
        Ok(())
    }

    fn slug_for(name: &str) -> Result<String, StorefrontError> {
        let slug = Utils::slugify(name);
        if slug.is_empty() {
            return Err(StorefrontError::InvalidInput(format!(
                "Invalid store name: '{name}'"
            )));
        }
        Ok(slug)
    }

    fn slug_taken(
        conn: &rusqlite::Connection,
        slug: &str,
        except_id: Option<&str>,
    ) -> Result<bool, StorefrontError> {
        Ok(conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM stores WHERE slug = ? AND id IS NOT ?)",
            params![slug, except_id],
            |row| row.get(0),
        )?)
    }
}
