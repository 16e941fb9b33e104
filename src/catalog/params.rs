use std::collections::BTreeMap;

use url::form_urlencoded;

/// Raw query-string input: each key maps to one or more values in the order
/// they were supplied. Absent keys are simply not present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        QueryParams::default()
    }

    /// Parses `application/x-www-form-urlencoded` text. A leading `?` is
    /// accepted. Repeated keys accumulate.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    #[cfg(test)]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// First value for `key`. Single-valued fields use this when a key was
    /// repeated.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.values {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_string() {
        let params = QueryParams::from_query_string("?page=2&sort=price.asc&categories=Shoes.Hats");
        assert_eq!(params.first("page"), Some("2"));
        assert_eq!(params.first("sort"), Some("price.asc"));
        assert_eq!(params.first("categories"), Some("Shoes.Hats"));
        assert_eq!(params.first("missing"), None);
    }

    #[test]
    fn test_repeated_keys_accumulate() {
        let params = QueryParams::from_query_string("store_ids=A&store_ids=B&page=3&page=1");
        assert_eq!(params.all("store_ids"), ["A".to_string(), "B".to_string()]);
        assert_eq!(params.first("page"), Some("3"));
        assert!(params.all("nothing").is_empty());
    }

    #[test]
    fn test_percent_decoding() {
        let params = QueryParams::from_query_string("name=Red%20Shoes&categories=T%26S");
        assert_eq!(params.first("name"), Some("Red Shoes"));
        assert_eq!(params.first("categories"), Some("T&S"));
    }

    #[test]
    fn test_encode_and_reparse() {
        let params = QueryParams::new()
            .with("categories", "Shoes & Socks")
            .with("page", "2");
        let encoded = params.to_query_string();
        assert_eq!(encoded, "categories=Shoes+%26+Socks&page=2");
        assert_eq!(QueryParams::from_query_string(&encoded), params);
    }

    #[test]
    fn test_empty_query() {
        assert!(QueryParams::from_query_string("").is_empty());
        assert!(QueryParams::from_query_string("?").is_empty());
    }
}
