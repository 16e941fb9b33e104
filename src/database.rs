use std::path::Path;
use std::time::Duration;

use log::info;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OptionalExtension;

use crate::error::StorefrontError;
use crate::schema::{CREATE_SCHEMA_SQL, SCHEMA_VERSION};

pub type PooledConn = PooledConnection<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Owned handle to the connection pool. Cloning is cheap and every clone
/// shares the same pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn open(db_path: &Path, pool_size: u32) -> Result<Self, StorefrontError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(BUSY_TIMEOUT)
        });

        let db = Self::from_manager(manager, pool_size)?;

        // WAL lets readers keep a stable snapshot while a writer commits
        let conn = db.get_connection()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        info!("Database opened at: {} (journal_mode={})", db_path.display(), mode);
        drop(conn);

        db.ensure_schema()?;
        Ok(db)
    }

    /// Single-connection in-memory database. Every checkout returns the same
    /// connection, so all callers see the same data.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorefrontError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.pragma_update(None, "foreign_keys", "ON"));
        let db = Self::from_manager(manager, 1)?;
        db.ensure_schema()?;
        Ok(db)
    }

    fn from_manager(
        manager: SqliteConnectionManager,
        pool_size: u32,
    ) -> Result<Self, StorefrontError> {
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(manager)?;

        Ok(Database { pool })
    }

    pub fn get_connection(&self) -> Result<PooledConn, StorefrontError> {
        Ok(self.pool.get()?)
    }

    fn ensure_schema(&self) -> Result<(), StorefrontError> {
        let conn = self.get_connection()?;

        let table_exists: bool = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='meta'",
                [],
                |row| row.get::<_, i32>(0),
            )
            .map(|count| count > 0)?;

        if !table_exists {
            conn.execute_batch(CREATE_SCHEMA_SQL)?;
            return Ok(());
        }

        let stored_version: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match stored_version.as_deref() {
            Some(SCHEMA_VERSION) => Ok(()),
            Some(other) => Err(StorefrontError::Error(format!(
                "Schema version mismatch: database is '{other}', expected '{SCHEMA_VERSION}'"
            ))),
            None => Err(StorefrontError::Error("Schema version missing".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_schema_created() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.get_connection().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('categories', 'subcategories', 'stores', 'products')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn test_in_memory_connections_share_data() {
        let db = Database::open_in_memory().unwrap();
        {
            let conn = db.get_connection().unwrap();
            conn.execute(
                "INSERT INTO stores (id, name, created_at) VALUES ('s1', 'Shop', 0)",
                [],
            )
            .unwrap();
        }
        let conn = db.clone().get_connection().unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM stores", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shop.db");

        Database::open(&path, 2).unwrap();
        // Second open finds the existing schema version
        let db = Database::open(&path, 2).unwrap();
        let conn = db.get_connection().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_schema_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.db");
        {
            let db = Database::open(&path, 1).unwrap();
            let conn = db.get_connection().unwrap();
            conn.execute(
                "UPDATE meta SET value = '99' WHERE key = 'schema_version'",
                [],
            )
            .unwrap();
        }
        let Err(err) = Database::open(&path, 1) else {
            panic!("opening a database with a foreign schema version should fail");
        };
        assert!(err.to_string().contains("Schema version mismatch"));
    }
}
