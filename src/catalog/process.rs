use log::{debug, error, Level};
use logging_timer::timer;
use rusqlite::{ToSql, TransactionBehavior};

use crate::database::Database;
use crate::error::StorefrontError;
use crate::products::{CatalogProduct, ProductTableRow};
use crate::stores::StoreListing;

use super::descriptor::{FilterDescriptor, StoreProductsDescriptor, StoresDescriptor};
use super::page::ResultPage;
use super::params::QueryParams;
use super::query::{ProductsQuery, Query, StoreProductsQuery, StoresQuery};

/// Entry points for the filtered catalog queries.
///
/// Each query comes in two forms. `try_*` returns the storage error to the
/// caller. The plain form logs the error and answers with an empty page, so a
/// storage outage looks like "nothing matched".
pub struct Catalog;

impl Catalog {
    pub fn get_products(db: &Database, params: &QueryParams) -> ResultPage<CatalogProduct> {
        Self::or_empty("products", Self::try_get_products(db, params))
    }

    pub fn try_get_products(
        db: &Database,
        params: &QueryParams,
    ) -> Result<ResultPage<CatalogProduct>, StorefrontError> {
        Self::try_get_products_with(db, &FilterDescriptor::from_params(params))
    }

    pub fn try_get_products_with(
        db: &Database,
        descriptor: &FilterDescriptor,
    ) -> Result<ResultPage<CatalogProduct>, StorefrontError> {
        debug!("Products query: {}", descriptor.to_params().to_query_string());
        Self::execute_page(db, &ProductsQuery::new(descriptor))
    }

    pub fn get_store_products(
        db: &Database,
        store_id: &str,
        params: &QueryParams,
    ) -> ResultPage<ProductTableRow> {
        Self::or_empty("store products", Self::try_get_store_products(db, store_id, params))
    }

    pub fn try_get_store_products(
        db: &Database,
        store_id: &str,
        params: &QueryParams,
    ) -> Result<ResultPage<ProductTableRow>, StorefrontError> {
        let descriptor = StoreProductsDescriptor::from_params(params);
        debug!(
            "Store products query for {}: {}",
            store_id,
            descriptor.to_params().to_query_string()
        );
        Self::execute_page(db, &StoreProductsQuery::new(store_id, &descriptor))
    }

    pub fn get_stores(db: &Database, params: &QueryParams) -> ResultPage<StoreListing> {
        Self::or_empty("stores", Self::try_get_stores(db, params))
    }

    pub fn try_get_stores(
        db: &Database,
        params: &QueryParams,
    ) -> Result<ResultPage<StoreListing>, StorefrontError> {
        let descriptor = StoresDescriptor::from_params(params);
        debug!("Stores query: {}", descriptor.to_params().to_query_string());
        Self::execute_page(db, &StoresQuery::new(&descriptor))
    }

    /// Runs the item and count statements inside one deferred transaction so
    /// both read the same snapshot.
    pub fn execute_page<Q: Query>(
        db: &Database,
        query: &Q,
    ) -> Result<ResultPage<Q::Row>, StorefrontError> {
        let query_impl = query.query_impl();
        let _tmr = timer!(
            Level::Trace;
            "Catalog::execute_page",
            "{} page {}",
            query.name(),
            query_impl.pagination().page()
        );

        let mut conn = db.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        let items = {
            let (sql, params_vec) = query_impl.build_sql(false);
            let sql_params: Vec<&dyn ToSql> = params_vec.iter().map(|b| &**b).collect();
            let mut sql_statement = tx.prepare(&sql)?;
            let rows = sql_statement.query_map(&sql_params[..], Q::map_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let total_count: i64 = {
            let (sql, params_vec) = query_impl.build_sql(true);
            let sql_params: Vec<&dyn ToSql> = params_vec.iter().map(|b| &**b).collect();
            tx.query_row(&sql, &sql_params[..], |row| row.get(0))?
        };

        tx.commit()?;

        Ok(ResultPage::new(
            items,
            u64::try_from(total_count).unwrap_or_default(),
            query_impl.pagination(),
        ))
    }

    fn or_empty<T>(
        what: &str,
        result: Result<ResultPage<T>, StorefrontError>,
    ) -> ResultPage<T> {
        result.unwrap_or_else(|e| {
            error!("Failed to query {}: {}", what, e);
            ResultPage::empty()
        })
    }
}
