//! Query strings for the backend's REST table endpoints.
//!
//! Filters follow the `column=op.value` convention: `eq.`, `in.(...)`,
//! `gte.`, `lte.`, plus `select=`, `order=` and `limit=`.

use core::fmt::Display;

use url::Url;

use super::Table;
use crate::config::BackendConfig;

/// Sort direction for [`TableQuery::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A read, update or delete against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: Table,
    params: Vec<(String, String)>,
}

impl TableQuery {
    #[must_use]
    pub const fn new(table: Table) -> Self {
        Self {
            table,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub const fn table(&self) -> Table {
        self.table
    }

    /// Column list, including embedded relations (`*,product:products(*)`).
    #[must_use]
    pub fn select(self, columns: &str) -> Self {
        self.param("select", columns.to_string())
    }

    #[must_use]
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{}", quote(&value.to_string())))
    }

    #[must_use]
    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("gte.{}", quote(&value.to_string())))
    }

    #[must_use]
    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("lte.{}", quote(&value.to_string())))
    }

    /// Match any of `values`.
    #[must_use]
    pub fn in_list<I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let list = values
            .into_iter()
            .map(|v| quote(&v.to_string()))
            .collect::<Vec<_>>()
            .join(",");
        self.param(column, format!("in.({list})"))
    }

    #[must_use]
    pub fn order(self, column: &str, direction: Direction) -> Self {
        self.param("order", format!("{column}.{}", direction.as_str()))
    }

    #[must_use]
    pub fn limit(self, limit: usize) -> Self {
        self.param("limit", limit.to_string())
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Full request URL under `rest/v1/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend base URL cannot be joined.
    pub fn url(&self, backend: &BackendConfig) -> Result<Url, url::ParseError> {
        let mut url = backend.endpoint(&format!("rest/v1/{}", self.table.as_str()))?;
        if !self.params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    fn param(mut self, key: &str, value: String) -> Self {
        self.params.push((key.to_string(), value));
        self
    }
}

/// Double-quote values containing filter syntax characters.
fn quote(value: &str) -> String {
    if value.contains([',', '(', ')', '"', ':']) && !is_timestamp(value) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

fn is_timestamp(value: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(value).is_ok()
}
