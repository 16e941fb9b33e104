use rusqlite::{Row, ToSql};

use crate::products::{CatalogProduct, ProductTableRow};
use crate::stores::StoreListing;

use super::descriptor::{FilterDescriptor, Pagination, StoreProductsDescriptor, StoresDescriptor};
use super::filter::{
    ContainsFilter, DateFilter, EqFilter, Filter, InFilter, NotNullFilter, PriceFilter,
};
use super::order::Order;

/// A catalog query that yields typed rows. The item and count statements are
/// both produced from the same [`QueryImpl`], so they always share one
/// FROM/JOIN/WHERE and one parameter list.
pub trait Query {
    type Row;

    fn name(&self) -> &'static str;

    fn query_impl(&self) -> &QueryImpl;

    fn map_row(row: &Row) -> rusqlite::Result<Self::Row>;
}

#[derive(Debug)]
pub struct QueryImpl {
    sql_template: &'static str,
    select_list: &'static str,

    filters: Vec<Box<dyn Filter>>,
    order_clause: String,
    pagination: Pagination,
}

impl QueryImpl {
    const PRODUCTS_SQL_QUERY: &str = "SELECT {select_list}
        FROM products
        LEFT JOIN stores
            ON products.store_id = stores.id
        LEFT JOIN categories
            ON products.category_id = categories.id
        LEFT JOIN subcategories
            ON products.subcategory_id = subcategories.id
        {where_clause}
        {order_clause}
        {limit_clause}
        {offset_clause}";

    const STORE_PRODUCTS_SQL_QUERY: &str = "SELECT {select_list}
        FROM products
        LEFT JOIN categories
            ON products.category_id = categories.id
        {where_clause}
        {order_clause}
        {limit_clause}
        {offset_clause}";

    const STORES_SQL_QUERY: &str = "SELECT {select_list}
        FROM stores
        LEFT JOIN products
            ON products.store_id = stores.id
        {where_clause}
        GROUP BY stores.id
        {order_clause}
        {limit_clause}
        {offset_clause}";

    fn new(
        sql_template: &'static str,
        select_list: &'static str,
        order_clause: String,
        pagination: Pagination,
    ) -> Self {
        QueryImpl {
            sql_template,
            select_list,

            filters: Vec::new(),
            order_clause,
            pagination,
        }
    }

    fn add_filter<F: Filter + 'static>(&mut self, filter: Option<F>) {
        if let Some(filter) = filter {
            self.filters.push(Box::new(filter));
        }
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Builds the item statement, or with `count_only` the statement counting
    /// every matching row. The count wraps the unpaginated item query, so
    /// grouping and filtering are identical in both.
    pub fn build_sql(&self, count_only: bool) -> (String, Vec<Box<dyn ToSql>>) {
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
        let mut where_clause = String::new();

        if !self.filters.is_empty() {
            let mut first = true;
            where_clause.push_str("\nWHERE ");
            for filter in &self.filters {
                if !first {
                    where_clause.push_str(" AND ");
                }
                first = false;

                let (pred_str, pred_vec) = filter.to_predicate_parts();
                where_clause.push_str(&pred_str);
                params_vec.extend(pred_vec);
            }
        }

        let sql = if count_only {
            let inner_sql = self
                .sql_template
                .replace("{select_list}", "1")
                .replace("{where_clause}", &where_clause)
                .replace("{order_clause}", "")
                .replace("{limit_clause}", "")
                .replace("{offset_clause}", "");

            format!("SELECT COUNT(*) FROM ({}) AS subquery", inner_sql)
        } else {
            let limit_clause = format!("\nLIMIT {}", self.pagination.per_page());
            let offset_clause = format!("\nOFFSET {}", self.pagination.offset());

            self.sql_template
                .replace("{select_list}", self.select_list)
                .replace("{where_clause}", &where_clause)
                .replace("{order_clause}", &self.order_clause)
                .replace("{limit_clause}", &limit_clause)
                .replace("{offset_clause}", &offset_clause)
        };

        (sql, params_vec)
    }
}

/// Storefront product browsing.
#[derive(Debug)]
pub struct ProductsQuery {
    query_impl: QueryImpl,
}

impl ProductsQuery {
    pub fn new(descriptor: &FilterDescriptor) -> Self {
        let mut query_impl = QueryImpl::new(
            QueryImpl::PRODUCTS_SQL_QUERY,
            CatalogProduct::COLUMNS,
            Order::new(descriptor.sort).to_order_clause(),
            descriptor.pagination,
        );

        query_impl.add_filter(InFilter::new("categories.name", &descriptor.category_names));
        query_impl.add_filter(InFilter::new(
            "subcategories.name",
            &descriptor.subcategory_names,
        ));
        query_impl.add_filter(PriceFilter::new("products.price", descriptor.price));
        query_impl.add_filter(InFilter::new("products.store_id", &descriptor.store_ids));
        if descriptor.active_only {
            query_impl.add_filter(Some(NotNullFilter::new("stores.stripe_account_id")));
        }

        ProductsQuery { query_impl }
    }
}

impl Query for ProductsQuery {
    type Row = CatalogProduct;

    fn name(&self) -> &'static str {
        "products"
    }

    fn query_impl(&self) -> &QueryImpl {
        &self.query_impl
    }

    fn map_row(row: &Row) -> rusqlite::Result<Self::Row> {
        CatalogProduct::from_row(row)
    }
}

/// One store's products, as shown in the merchant dashboard table.
#[derive(Debug)]
pub struct StoreProductsQuery {
    query_impl: QueryImpl,
}

impl StoreProductsQuery {
    pub fn new(store_id: &str, descriptor: &StoreProductsDescriptor) -> Self {
        let mut query_impl = QueryImpl::new(
            QueryImpl::STORE_PRODUCTS_SQL_QUERY,
            ProductTableRow::COLUMNS,
            Order::new(descriptor.sort).to_order_clause(),
            descriptor.pagination,
        );

        query_impl.add_filter(Some(EqFilter::new("products.store_id", store_id)));
        query_impl.add_filter(
            descriptor
                .name
                .as_ref()
                .map(|name| ContainsFilter::new("products.name", name.as_str())),
        );
        query_impl.add_filter(InFilter::new("products.category_id", &descriptor.category_ids));
        query_impl.add_filter(
            descriptor
                .created
                .map(|range| DateFilter::new("products.created_at", range)),
        );

        StoreProductsQuery { query_impl }
    }
}

impl Query for StoreProductsQuery {
    type Row = ProductTableRow;

    fn name(&self) -> &'static str {
        "store_products"
    }

    fn query_impl(&self) -> &QueryImpl {
        &self.query_impl
    }

    fn map_row(row: &Row) -> rusqlite::Result<Self::Row> {
        ProductTableRow::from_row(row)
    }
}

#[derive(Debug)]
pub struct StoresQuery {
    query_impl: QueryImpl,
}

impl StoresQuery {
    pub fn new(descriptor: &StoresDescriptor) -> Self {
        let mut query_impl = QueryImpl::new(
            QueryImpl::STORES_SQL_QUERY,
            StoreListing::COLUMNS,
            Order::new(descriptor.sort).to_order_clause(),
            descriptor.pagination,
        );

        query_impl.add_filter(InFilter::new("stores.id", &descriptor.store_ids));
        if descriptor.active_only {
            query_impl.add_filter(Some(NotNullFilter::new("stores.stripe_account_id")));
        }

        StoresQuery { query_impl }
    }
}

impl Query for StoresQuery {
    type Row = StoreListing;

    fn name(&self) -> &'static str {
        "stores"
    }

    fn query_impl(&self) -> &QueryImpl {
        &self.query_impl
    }

    fn map_row(row: &Row) -> rusqlite::Result<Self::Row> {
        StoreListing::from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::params::QueryParams;

    fn squash(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_unfiltered_products_query_has_no_where() {
        let query = ProductsQuery::new(&FilterDescriptor::default());
        let (sql, params) = query.query_impl().build_sql(false);
        let sql = squash(&sql);

        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("ORDER BY products.created_at DESC, products.id ASC LIMIT 10 OFFSET 0"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_products_query_filters_and_params() {
        let params = QueryParams::from_query_string(
            "categories=Shoes.Hats&price_range=10-50&store_ids=A.B&active=true&page=3&per_page=5",
        );
        let query = ProductsQuery::new(&FilterDescriptor::from_params(&params));
        let (sql, params) = query.query_impl().build_sql(false);
        let sql = squash(&sql);

        assert!(sql.contains(
            "WHERE (categories.name IN (?, ?)) AND (products.price >= ? AND products.price <= ?) \
             AND (products.store_id IN (?, ?)) AND (stores.stripe_account_id IS NOT NULL)"
        ));
        assert!(!sql.contains("subcategories.name IN"));
        assert!(sql.ends_with("LIMIT 5 OFFSET 10"));
        assert_eq!(params.len(), 6);
    }

    #[test]
    fn test_count_query_shares_filters() {
        let params = QueryParams::from_query_string("categories=Shoes&active=true");
        let query = ProductsQuery::new(&FilterDescriptor::from_params(&params));

        let (item_sql, item_params) = query.query_impl().build_sql(false);
        let (count_sql, count_params) = query.query_impl().build_sql(true);
        let item_sql = squash(&item_sql);
        let count_sql = squash(&count_sql);

        assert!(count_sql.starts_with("SELECT COUNT(*) FROM (SELECT 1 FROM products"));
        assert!(count_sql.ends_with(") AS subquery"));
        assert!(!count_sql.contains("ORDER BY"));
        assert!(!count_sql.contains("LIMIT"));
        assert_eq!(item_params.len(), count_params.len());

        let where_start = item_sql.find("WHERE").unwrap();
        let where_end = item_sql.find(" ORDER BY").unwrap();
        assert!(count_sql.contains(&item_sql[where_start..where_end]));
    }

    #[test]
    fn test_store_products_query() {
        let params = QueryParams::from_query_string(
            "name=Boot&category=c1.c2&from=2024-01-01&to=2024-01-31&sort=price.asc",
        );
        let query = StoreProductsQuery::new("s1", &StoreProductsDescriptor::from_params(&params));
        let (sql, params) = query.query_impl().build_sql(false);
        let sql = squash(&sql);

        assert!(sql.contains(
            "WHERE (products.store_id = ?) AND (instr(lower(products.name), lower(?)) > 0) \
             AND (products.category_id IN (?, ?)) AND (products.created_at BETWEEN ? AND ?)"
        ));
        assert!(sql.contains("ORDER BY products.price ASC, products.id ASC"));
        assert_eq!(params.len(), 6);
    }

    #[test]
    fn test_stores_query_groups_before_ordering() {
        let params = QueryParams::from_query_string("store_ids=A&active=true&sort=productCount.desc");
        let query = StoresQuery::new(&StoresDescriptor::from_params(&params));

        let (sql, _) = query.query_impl().build_sql(false);
        let sql = squash(&sql);
        assert!(sql.contains(
            "WHERE (stores.id IN (?)) AND (stores.stripe_account_id IS NOT NULL) GROUP BY stores.id \
             ORDER BY COUNT(products.id) DESC, stores.id ASC"
        ));

        let (count_sql, _) = query.query_impl().build_sql(true);
        assert!(squash(&count_sql).contains("GROUP BY stores.id ) AS subquery"));
    }
}
