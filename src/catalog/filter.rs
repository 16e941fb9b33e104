use std::collections::BTreeSet;
use std::fmt::Debug;

use rusqlite::ToSql;

use super::descriptor::{CreatedRange, PriceRange};

/// A single WHERE predicate. Column names are static strings chosen by the
/// query builder; every value is a bound parameter.
pub trait Filter: Debug {
    /// return predicate text and params
    fn to_predicate_parts(&self) -> (String, Vec<Box<dyn ToSql>>);
}

/// `col IN (?, ?, ...)`. Never built from an empty set, so there is no
/// always-false `IN ()` form.
#[derive(Debug, Clone)]
pub struct InFilter {
    col_db: &'static str,
    values: Vec<String>,
}

impl InFilter {
    pub fn new(col_db: &'static str, values: &BTreeSet<String>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(InFilter {
            col_db,
            values: values.iter().cloned().collect(),
        })
    }
}

impl Filter for InFilter {
    fn to_predicate_parts(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let placeholders = vec!["?"; self.values.len()].join(", ");
        let pred_str = format!("({} IN ({}))", self.col_db, placeholders);
        let pred_vec = self
            .values
            .iter()
            .map(|v| Box::new(v.clone()) as Box<dyn ToSql>)
            .collect();

        (pred_str, pred_vec)
    }
}

#[derive(Debug, Clone)]
pub struct PriceFilter {
    price_col_db: &'static str,
    range: PriceRange,
}

impl PriceFilter {
    pub fn new(price_col_db: &'static str, range: PriceRange) -> Option<Self> {
        if range.is_unbounded() {
            return None;
        }
        Some(PriceFilter {
            price_col_db,
            range,
        })
    }
}

impl Filter for PriceFilter {
    fn to_predicate_parts(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut parts = Vec::new();
        let mut pred_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(min) = self.range.min {
            parts.push(format!("{} >= ?", self.price_col_db));
            pred_vec.push(Box::new(min));
        }
        if let Some(max) = self.range.max {
            parts.push(format!("{} <= ?", self.price_col_db));
            pred_vec.push(Box::new(max));
        }

        (format!("({})", parts.join(" AND ")), pred_vec)
    }
}

#[derive(Debug, Clone)]
pub struct NotNullFilter {
    col_db: &'static str,
}

impl NotNullFilter {
    pub fn new(col_db: &'static str) -> Self {
        NotNullFilter { col_db }
    }
}

impl Filter for NotNullFilter {
    fn to_predicate_parts(&self) -> (String, Vec<Box<dyn ToSql>>) {
        (format!("({} IS NOT NULL)", self.col_db), Vec::new())
    }
}

#[derive(Debug, Clone)]
pub struct EqFilter {
    col_db: &'static str,
    value: String,
}

impl EqFilter {
    pub fn new(col_db: &'static str, value: impl Into<String>) -> Self {
        EqFilter {
            col_db,
            value: value.into(),
        }
    }
}

impl Filter for EqFilter {
    fn to_predicate_parts(&self) -> (String, Vec<Box<dyn ToSql>>) {
        (
            format!("({} = ?)", self.col_db),
            vec![Box::new(self.value.clone()) as Box<dyn ToSql>],
        )
    }
}

/// Case-insensitive substring match. `instr` avoids LIKE wildcard escaping.
#[derive(Debug, Clone)]
pub struct ContainsFilter {
    col_db: &'static str,
    needle: String,
}

impl ContainsFilter {
    pub fn new(col_db: &'static str, needle: impl Into<String>) -> Self {
        ContainsFilter {
            col_db,
            needle: needle.into(),
        }
    }
}

impl Filter for ContainsFilter {
    fn to_predicate_parts(&self) -> (String, Vec<Box<dyn ToSql>>) {
        (
            format!("(instr(lower({}), lower(?)) > 0)", self.col_db),
            vec![Box::new(self.needle.clone()) as Box<dyn ToSql>],
        )
    }
}

#[derive(Debug, Clone)]
pub struct DateFilter {
    date_col_db: &'static str,
    range: CreatedRange,
}

impl DateFilter {
    pub fn new(date_col_db: &'static str, range: CreatedRange) -> Self {
        DateFilter { date_col_db, range }
    }
}

impl Filter for DateFilter {
    fn to_predicate_parts(&self) -> (String, Vec<Box<dyn ToSql>>) {
        (
            format!("({} BETWEEN ? AND ?)", self.date_col_db),
            vec![
                Box::new(self.range.start_ts()) as Box<dyn ToSql>,
                Box::new(self.range.end_ts()) as Box<dyn ToSql>,
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_in_filter_placeholders() {
        let filter = InFilter::new("categories.name", &set(&["Shoes", "Hats"])).unwrap();
        let (pred, params) = filter.to_predicate_parts();
        assert_eq!(pred, "(categories.name IN (?, ?))");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_in_filter_empty_set_is_omitted() {
        assert!(InFilter::new("categories.name", &BTreeSet::new()).is_none());
    }

    #[test]
    fn test_price_filter_sides() {
        let both = PriceFilter::new("products.price", PriceRange { min: Some(1.0), max: Some(5.0) })
            .unwrap();
        assert_eq!(
            both.to_predicate_parts().0,
            "(products.price >= ? AND products.price <= ?)"
        );

        let max_only = PriceFilter::new("products.price", PriceRange { min: None, max: Some(5.0) })
            .unwrap();
        let (pred, params) = max_only.to_predicate_parts();
        assert_eq!(pred, "(products.price <= ?)");
        assert_eq!(params.len(), 1);

        assert!(PriceFilter::new("products.price", PriceRange::default()).is_none());
    }

    #[test]
    fn test_simple_filters() {
        assert_eq!(
            NotNullFilter::new("stores.stripe_account_id").to_predicate_parts().0,
            "(stores.stripe_account_id IS NOT NULL)"
        );
        assert_eq!(
            EqFilter::new("products.store_id", "s1").to_predicate_parts().0,
            "(products.store_id = ?)"
        );
        assert_eq!(
            ContainsFilter::new("products.name", "boot").to_predicate_parts().0,
            "(instr(lower(products.name), lower(?)) > 0)"
        );
    }

    #[test]
    fn test_date_filter() {
        let range = CreatedRange {
            from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        let (pred, params) = DateFilter::new("products.created_at", range).to_predicate_parts();
        assert_eq!(pred, "(products.created_at BETWEEN ? AND ?)");
        assert_eq!(params.len(), 2);
    }
}
