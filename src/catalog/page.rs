use serde::Serialize;

use super::descriptor::Pagination;

/// One page of a filtered catalog query. Serializes as `{data, pageCount}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPage<T> {
    #[serde(rename = "data")]
    pub items: Vec<T>,
    #[serde(skip)]
    pub total_count: u64,
    #[serde(rename = "pageCount")]
    pub page_count: u64,
}

impl<T> ResultPage<T> {
    pub fn new(items: Vec<T>, total_count: u64, pagination: &Pagination) -> Self {
        ResultPage {
            items,
            total_count,
            page_count: pagination.page_count(total_count),
        }
    }

    /// What callers see when the query could not run.
    pub fn empty() -> Self {
        ResultPage {
            items: Vec::new(),
            total_count: 0,
            page_count: 0,
        }
    }
}
