use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;

pub struct Utils {}

impl Utils {
    const ID_LENGTH: usize = 16;

    /// 16 random alphanumeric characters, the id format used by every table.
    pub fn generate_id() -> String {
        std::iter::repeat_with(fastrand::alphanumeric)
            .take(Self::ID_LENGTH)
            .collect()
    }

    pub fn slugify(s: &str) -> String {
        let mut slug = String::with_capacity(s.len());
        let mut last_dash = false;

        for c in s.to_lowercase().chars() {
            if c.is_alphanumeric() || c == '_' {
                slug.push(c);
                last_dash = false;
            } else if (c == ' ' || c == '-') && !last_dash {
                slug.push('-');
                last_dash = true;
            }
        }

        slug.trim_matches('-').to_string()
    }

    pub fn now_ts() -> i64 {
        Utc::now().timestamp()
    }

    /// Reads a nullable JSON text column. NULL yields `T::default()`.
    pub fn json_column<T: DeserializeOwned + Default>(row: &Row, idx: usize) -> rusqlite::Result<T> {
        let text: Option<String> = row.get(idx)?;
        match text {
            None => Ok(T::default()),
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        }
    }
}
