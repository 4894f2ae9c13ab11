use crate::core::{CacheError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    #[default]
    Asc,
    Desc,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Asc => "asc",
            OrderBy::Desc => "desc",
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderBy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(OrderBy::Asc),
            "desc" => Ok(OrderBy::Desc),
            other => Err(CacheError::Config(format!(
                "orderBy must be 'asc' or 'desc', got '{}'",
                other
            ))),
        }
    }
}

/// Which count a listing envelope carries. The name may be a dotted path
/// (`meta.totalPages`) for envelopes that nest their pagination info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountField {
    TotalPages(String),
    TotalItems(String),
}

/// Where and how a collection is listed remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Collection key this endpoint feeds.
    pub collection: String,
    /// Path relative to the API base URL.
    pub path: String,
    /// Envelope property holding the page's items.
    pub items_field: String,
    pub count: CountField,
    /// Declared page size; used to turn item totals into page counts.
    pub page_size: Option<u32>,
}

impl EndpointConfig {
    pub fn new(collection: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            path: path.into(),
            items_field: "items".to_string(),
            count: CountField::TotalPages("totalPages".to_string()),
            page_size: None,
        }
    }

    pub fn items_field(mut self, name: impl Into<String>) -> Self {
        self.items_field = name.into();
        self
    }

    pub fn total_pages(mut self, name: impl Into<String>) -> Self {
        self.count = CountField::TotalPages(name.into());
        self
    }

    pub fn total_items(mut self, name: impl Into<String>) -> Self {
        self.count = CountField::TotalItems(name.into());
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }
}

/// One decoded listing page: raw items plus the counts it declares.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePage {
    pub items: Vec<Value>,
    pub total_pages: u32,
    /// Item total, for endpoints that declare one instead of a page count.
    pub total_items: Option<u64>,
}

impl RemotePage {
    /// Reads a listing envelope according to the endpoint's declared layout.
    pub fn from_envelope(envelope: &Value, endpoint: &EndpointConfig, page: u32) -> Result<Self> {
        let unusable = |reason: String| CacheError::FetchUnavailable {
            collection: endpoint.collection.clone(),
            page,
            reason,
        };

        let items = lookup(envelope, &endpoint.items_field)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                unusable(format!(
                    "envelope has no '{}' array",
                    endpoint.items_field
                ))
            })?
            .clone();

        let (name, is_pages) = match &endpoint.count {
            CountField::TotalPages(name) => (name, true),
            CountField::TotalItems(name) => (name, false),
        };
        let count = lookup(envelope, name)
            .and_then(Value::as_u64)
            .ok_or_else(|| unusable(format!("envelope has no numeric '{}'", name)))?;

        let total_pages = if is_pages {
            count
        } else {
            let size = endpoint
                .page_size
                .map(u64::from)
                .unwrap_or(items.len() as u64);
            match (count, size) {
                (0, _) => 0,
                (total, 0) => {
                    return Err(unusable(format!(
                        "'{}' declares {} items but the page holds none",
                        name, total
                    )));
                }
                (total, size) => total.div_ceil(size),
            }
        };

        Ok(Self {
            items,
            total_pages: u32::try_from(total_pages)
                .map_err(|_| unusable(format!("page count {} out of range", total_pages)))?,
            total_items: (!is_pages).then_some(count),
        })
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, part| current.get(part))
}
