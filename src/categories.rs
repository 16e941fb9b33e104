use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::database::Database;
use crate::error::StorefrontError;
use crate::utils::Utils;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: i64,
}

impl Category {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            description: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: String,
    pub created_at: i64,
}

impl Subcategory {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Subcategory {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            description: row.get(3)?,
            category_id: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

pub struct Categories;

impl Categories {
    pub fn get_categories(db: &Database) -> Result<Vec<Category>, StorefrontError> {
        let conn = db.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, slug, description, created_at
            FROM categories
            ORDER BY name DESC",
        )?;
        let rows = stmt.query_map([], Category::from_row)?;
        let categories = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    pub fn get_subcategories(db: &Database) -> Result<Vec<Subcategory>, StorefrontError> {
        let conn = db.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, slug, description, category_id, created_at
            FROM subcategories
            ORDER BY name ASC, id ASC",
        )?;
        let rows = stmt.query_map([], Subcategory::from_row)?;
        let subcategories = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(subcategories)
    }

    pub fn get_subcategories_by_category(
        db: &Database,
        category_id: &str,
    ) -> Result<Vec<Subcategory>, StorefrontError> {
        let conn = db.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, slug, description, category_id, created_at
            FROM subcategories
            WHERE category_id = ?
            ORDER BY name ASC, id ASC",
        )?;
        let rows = stmt.query_map([category_id], Subcategory::from_row)?;
        let subcategories = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(subcategories)
    }

    pub fn add_category(
        db: &Database,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, StorefrontError> {
        let slug = Self::slug_for(name)?;
        let conn = db.get_connection()?;

        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ? OR slug = ?)",
            params![name, slug],
            |row| row.get(0),
        )?;
        if taken {
            return Err(StorefrontError::Conflict(format!("Category '{name}' already exists")));
        }

        let id = Utils::generate_id();
        conn.execute(
            "INSERT INTO categories (id, name, slug, description, created_at) VALUES (?, ?, ?, ?, ?)",
            params![id, name, slug, description, Utils::now_ts()],
        )?;
        Ok(id)
    }

    /// Subcategory slugs are globally unique. They are prefixed with the
    /// parent's slug so "Shoes/Accessories" and "Clothing/Accessories" coexist.
    pub fn add_subcategory(
        db: &Database,
        category_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, StorefrontError> {
        Self::slug_for(name)?;
        let conn = db.get_connection()?;

        let parent_slug: Option<String> = conn
            .query_row(
                "SELECT slug FROM categories WHERE id = ?",
                [category_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(parent_slug) = parent_slug else {
            return Err(StorefrontError::NotFound(format!("Category '{category_id}'")));
        };

        let slug = Utils::slugify(&format!("{parent_slug} {name}"));
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM subcategories WHERE slug = ?)",
            [&slug],
            |row| row.get(0),
        )?;
        if taken {
            return Err(StorefrontError::Conflict(format!(
                "Subcategory '{name}' already exists"
            )));
        }

        let id = Utils::generate_id();
        conn.execute(
            "INSERT INTO subcategories (id, name, slug, description, category_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)",
            params![id, name, slug, description, category_id, Utils::now_ts()],
        )?;
        Ok(id)
    }

    fn slug_for(name: &str) -> Result<String, StorefrontError> {
        let slug = Utils::slugify(name);
        if slug.is_empty() {
            return Err(StorefrontError::InvalidInput(format!("Invalid name: '{name}'")));
        }
        Ok(slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_sorted_by_name_desc() {
        let db = Database::open_in_memory().unwrap();
        for name in ["Clothing", "Skateboards", "Accessories", "Shoes"] {
            Categories::add_category(&db, name, None).unwrap();
        }

        let names: Vec<String> = Categories::get_categories(&db)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Skateboards", "Shoes", "Clothing", "Accessories"]);
    }

    #[test]
    fn test_duplicate_category() {
        let db = Database::open_in_memory().unwrap();
        Categories::add_category(&db, "Shoes", None).unwrap();
        assert!(matches!(
            Categories::add_category(&db, "Shoes", None),
            Err(StorefrontError::Conflict(_))
        ));
    }

    #[test]
    fn test_subcategories_by_category_filters_on_parent() {
        let db = Database::open_in_memory().unwrap();
        let shoes = Categories::add_category(&db, "Shoes", None).unwrap();
        let clothing = Categories::add_category(&db, "Clothing", None).unwrap();

        Categories::add_subcategory(&db, &shoes, "Low Tops", None).unwrap();
        Categories::add_subcategory(&db, &shoes, "High Tops", None).unwrap();
        Categories::add_subcategory(&db, &clothing, "Hoodies", None).unwrap();
        Categories::add_subcategory(&db, &clothing, "Accessories", None).unwrap();
        Categories::add_subcategory(&db, &shoes, "Accessories", None).unwrap();

        let names: Vec<String> = Categories::get_subcategories_by_category(&db, &shoes)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Accessories", "High Tops", "Low Tops"]);

        assert_eq!(Categories::get_subcategories(&db).unwrap().len(), 5);
        assert!(Categories::get_subcategories_by_category(&db, "missing")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_subcategory_requires_parent() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            Categories::add_subcategory(&db, "missing", "Decks", None),
            Err(StorefrontError::NotFound(_))
        ));
    }
}
