//! Normalization of raw query parameters into typed, immutable descriptors.
//!
//! Every field parser reports a [`ValidationError`] when it cannot use its
//! input. The descriptors never fail: each error is logged and the field's
//! default is used instead.

use std::collections::BTreeSet;
use std::num::IntErrorKind;

use chrono::NaiveDate;
use log::debug;

use crate::error::ValidationError;

use super::columns::{ProductSortColumn, SortColumn, SortDirection, StoreSortColumn};
use super::params::QueryParams;

pub const DEFAULT_PER_PAGE: u32 = 10;
/// Upper bound for `per_page`. Larger requests are clamped, not rejected.
pub const MAX_PER_PAGE: u32 = 100;

const TOKEN_DELIMITER: char = '.';
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    /// Builds a pagination from already-valid values. Out-of-range values are
    /// clamped the same way the query-string parser clamps them.
    #[cfg(test)]
    pub fn new(page: u32, per_page: u32) -> Self {
        let per_page = if per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            per_page.min(MAX_PER_PAGE)
        };
        Pagination {
            page: page.max(1),
            per_page,
        }
    }

    pub fn from_params(params: &QueryParams) -> Self {
        Pagination {
            page: or_default(parse_page(params.first("page")), 1),
            per_page: or_default(parse_per_page(params.first("per_page")), DEFAULT_PER_PAGE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn page_count(&self, total_count: u64) -> u64 {
        total_count.div_ceil(u64::from(self.per_page))
    }

    fn write_params(&self, params: &mut QueryParams) {
        params.insert("page", self.page.to_string());
        params.insert("per_page", self.per_page.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<C: SortColumn> {
    pub column: C,
    pub direction: SortDirection,
}

impl<C: SortColumn> Default for Sort<C> {
    fn default() -> Self {
        Sort {
            column: C::DEFAULT,
            direction: SortDirection::Desc,
        }
    }
}

impl<C: SortColumn> Sort<C> {
    #[cfg(test)]
    pub fn new(column: C, direction: SortDirection) -> Self {
        Sort { column, direction }
    }

    pub fn from_params(params: &QueryParams) -> Self {
        or_default(parse_sort(params.first("sort")), Sort::default())
    }

    fn to_param(self) -> String {
        format!("{}.{}", self.column.as_ref(), self.direction.as_ref())
    }
}

/// Inclusive price bounds. Either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    fn to_param(self) -> String {
        let side = |v: Option<f64>| v.map(|p| p.to_string()).unwrap_or_default();
        format!("{}-{}", side(self.min), side(self.max))
    }
}

/// Storefront product query: the public catalog with category, price, store
/// and availability filters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterDescriptor {
    pub pagination: Pagination,
    pub sort: Sort<ProductSortColumn>,
    pub category_names: BTreeSet<String>,
    pub subcategory_names: BTreeSet<String>,
    pub price: PriceRange,
    pub store_ids: BTreeSet<String>,
    pub active_only: bool,
}

impl FilterDescriptor {
    pub fn from_params(params: &QueryParams) -> Self {
        FilterDescriptor {
            pagination: Pagination::from_params(params),
            sort: Sort::from_params(params),
            category_names: parse_tokens(params.all("categories")),
            subcategory_names: parse_tokens(params.all("subcategories")),
            price: parse_price_range(params.first("price_range")),
            store_ids: parse_tokens(params.all("store_ids")),
            active_only: parse_active(params.first("active")),
        }
    }

    /// Canonical query-string form. Parsing the result yields an equal
    /// descriptor.
    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        self.pagination.write_params(&mut params);
        params.insert("sort", self.sort.to_param());
        insert_tokens(&mut params, "categories", &self.category_names);
        insert_tokens(&mut params, "subcategories", &self.subcategory_names);
        if !self.price.is_unbounded() {
            params.insert("price_range", self.price.to_param());
        }
        insert_tokens(&mut params, "store_ids", &self.store_ids);
        if self.active_only {
            params.insert("active", "true");
        }
        params
    }
}

/// Creation-date window, stored as unix seconds. `end` covers the whole of
/// its last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl CreatedRange {
    pub fn start_ts(&self) -> i64 {
        self.from
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(i64::MIN)
    }

    pub fn end_ts(&self) -> i64 {
        self.to
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(i64::MAX)
    }
}

/// Merchant dashboard product table for a single store. The store id comes
/// from the route, never from the query string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreProductsDescriptor {
    pub pagination: Pagination,
    pub sort: Sort<ProductSortColumn>,
    pub name: Option<String>,
    pub category_ids: BTreeSet<String>,
    pub created: Option<CreatedRange>,
}

impl StoreProductsDescriptor {
    pub fn from_params(params: &QueryParams) -> Self {
        let name = params
            .first("name")
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned);

        StoreProductsDescriptor {
            pagination: Pagination::from_params(params),
            sort: Sort::from_params(params),
            name,
            category_ids: parse_tokens(params.all("category")),
            created: parse_created_range(params.first("from"), params.first("to")),
        }
    }

    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        self.pagination.write_params(&mut params);
        params.insert("sort", self.sort.to_param());
        if let Some(name) = &self.name {
            params.insert("name", name.clone());
        }
        insert_tokens(&mut params, "category", &self.category_ids);
        if let Some(created) = &self.created {
            params.insert("from", created.from.format(DATE_FORMAT).to_string());
            params.insert("to", created.to.format(DATE_FORMAT).to_string());
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoresDescriptor {
    pub pagination: Pagination,
    pub sort: Sort<StoreSortColumn>,
    pub store_ids: BTreeSet<String>,
    pub active_only: bool,
}

impl StoresDescriptor {
    pub fn from_params(params: &QueryParams) -> Self {
        StoresDescriptor {
            pagination: Pagination::from_params(params),
            sort: Sort::from_params(params),
            store_ids: parse_tokens(params.all("store_ids")),
            active_only: parse_active(params.first("active")),
        }
    }

    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        self.pagination.write_params(&mut params);
        params.insert("sort", self.sort.to_param());
        insert_tokens(&mut params, "store_ids", &self.store_ids);
        if self.active_only {
            params.insert("active", "true");
        }
        params
    }
}

fn or_default<T>(result: Result<T, ValidationError>, default: T) -> T {
    result.unwrap_or_else(|e| {
        debug!("Using default: {}", e);
        default
    })
}

/// Integers beyond the range of `i64` saturate rather than fail, so an
/// oversized page number behaves like any other page past the end.
fn parse_int(field: &'static str, raw: &str) -> Result<i64, ValidationError> {
    match raw.trim().parse::<i64>() {
        Ok(n) => Ok(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(i64::MAX),
            IntErrorKind::NegOverflow => Ok(i64::MIN),
            _ => Err(ValidationError::new(field, format!("not an integer: '{raw}'"))),
        },
    }
}

pub fn parse_page(raw: Option<&str>) -> Result<u32, ValidationError> {
    let raw = raw.ok_or_else(|| ValidationError::new("page", "missing"))?;
    let page = parse_int("page", raw)?;
    if page < 1 {
        return Err(ValidationError::new("page", format!("must be at least 1: {page}")));
    }
    Ok(u32::try_from(page).unwrap_or(u32::MAX))
}

pub fn parse_per_page(raw: Option<&str>) -> Result<u32, ValidationError> {
    let raw = raw.ok_or_else(|| ValidationError::new("per_page", "missing"))?;
    let per_page = parse_int("per_page", raw)?;
    if per_page < 1 {
        return Err(ValidationError::new(
            "per_page",
            format!("must be at least 1: {per_page}"),
        ));
    }
    Ok(u32::try_from(per_page).unwrap_or(u32::MAX).min(MAX_PER_PAGE))
}

/// `column.direction`. An unknown column is an error (the caller falls back
/// to the default sort); a known column with any direction other than `asc`
/// sorts descending.
pub fn parse_sort<C: SortColumn>(raw: Option<&str>) -> Result<Sort<C>, ValidationError> {
    let raw = raw.ok_or_else(|| ValidationError::new("sort", "missing"))?;
    let mut parts = raw.split('.');
    let column_name = parts.next().unwrap_or_default();
    let column = column_name
        .parse::<C>()
        .map_err(|_| ValidationError::new("sort", format!("unknown column: '{column_name}'")))?;

    let direction = match parts.next() {
        Some("asc") => SortDirection::Asc,
        _ => SortDirection::Desc,
    };

    Ok(Sort { column, direction })
}

/// `min-max`, split on the first `-`. Sides that are empty or not a
/// non-negative number are left open.
pub fn parse_price_range(raw: Option<&str>) -> PriceRange {
    let Some(raw) = raw else {
        return PriceRange::default();
    };

    let (min_raw, max_raw) = raw.split_once('-').unwrap_or((raw, ""));

    PriceRange {
        min: parse_price_side(min_raw).map_err(|e| debug!("Ignoring: {}", e)).ok().flatten(),
        max: parse_price_side(max_raw).map_err(|e| debug!("Ignoring: {}", e)).ok().flatten(),
    }
}

fn parse_price_side(raw: &str) -> Result<Option<f64>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Ok(Some(price)),
        _ => Err(ValidationError::new(
            "price_range",
            format!("not a valid price: '{raw}'"),
        )),
    }
}

/// Splits every value on `.` and keeps the non-empty tokens.
pub fn parse_tokens(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .flat_map(|v| v.split(TOKEN_DELIMITER))
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn parse_active(raw: Option<&str>) -> bool {
    raw == Some("true")
}

/// Both ends must parse for the range to apply.
pub fn parse_created_range(from: Option<&str>, to: Option<&str>) -> Option<CreatedRange> {
    let parse = |field: &'static str, raw: Option<&str>| -> Result<NaiveDate, ValidationError> {
        let raw = raw.ok_or_else(|| ValidationError::new(field, "missing"))?;
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map_err(|_| ValidationError::new(field, format!("not a date: '{raw}'")))
    };

    match (parse("from", from), parse("to", to)) {
        (Ok(from), Ok(to)) => Some(CreatedRange { from, to }),
        (Err(e), _) | (_, Err(e)) => {
            if from.is_some() || to.is_some() {
                debug!("Ignoring created range: {}", e);
            }
            None
        }
    }
}

fn insert_tokens(params: &mut QueryParams, key: &str, tokens: &BTreeSet<String>) {
    if !tokens.is_empty() {
        let joined = tokens
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(".");
        params.insert(key, joined);
    }
}
