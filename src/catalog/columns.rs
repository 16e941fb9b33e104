use std::fmt::Debug;
use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A whitelisted sort column. The external name (`createdAt`, `price`, ...) is
/// parsed into a variant; only the variant's static SQL expression ever
/// reaches a query.
pub trait SortColumn: Copy + Debug + PartialEq + FromStr + AsRef<str> {
    const DEFAULT: Self;

    /// Key used to break ties so that pages never overlap or skip rows.
    const TIEBREAK_DB: &'static str;

    fn name_db(&self) -> &'static str;

    fn collation(&self) -> Option<&'static str> {
        None
    }
}

#[derive(AsRefStr, EnumIter, EnumString, Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum ProductSortColumn {
    #[strum(serialize = "createdAt")]
    CreatedAt,
    #[strum(serialize = "updatedAt")]
    UpdatedAt,
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "price")]
    Price,
    #[strum(serialize = "rating")]
    Rating,
    #[strum(serialize = "inventory")]
    Inventory,
}

impl SortColumn for ProductSortColumn {
    const DEFAULT: Self = ProductSortColumn::CreatedAt;
    const TIEBREAK_DB: &'static str = "products.id";

    fn name_db(&self) -> &'static str {
        match self {
            ProductSortColumn::CreatedAt => "products.created_at",
            ProductSortColumn::UpdatedAt => "products.updated_at",
            ProductSortColumn::Name => "products.name",
            ProductSortColumn::Price => "products.price",
            ProductSortColumn::Rating => "products.rating",
            ProductSortColumn::Inventory => "products.inventory",
        }
    }

    fn collation(&self) -> Option<&'static str> {
        match self {
            ProductSortColumn::Name => Some("NOCASE"),
            _ => None,
        }
    }
}

#[derive(AsRefStr, EnumIter, EnumString, Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum StoreSortColumn {
    #[strum(serialize = "createdAt")]
    CreatedAt,
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "productCount")]
    ProductCount,
}

impl SortColumn for StoreSortColumn {
    const DEFAULT: Self = StoreSortColumn::CreatedAt;
    const TIEBREAK_DB: &'static str = "stores.id";

    fn name_db(&self) -> &'static str {
        match self {
            StoreSortColumn::CreatedAt => "stores.created_at",
            StoreSortColumn::Name => "stores.name",
            StoreSortColumn::ProductCount => "COUNT(products.id)",
        }
    }

    fn collation(&self) -> Option<&'static str> {
        match self {
            StoreSortColumn::Name => Some("NOCASE"),
            _ => None,
        }
    }
}

#[derive(AsRefStr, EnumIter, EnumString, Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum SortDirection {
    #[strum(serialize = "asc")]
    Asc,
    #[strum(serialize = "desc")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}
