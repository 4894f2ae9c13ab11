use crate::core::{CacheError, Result};
use crate::remote::{EndpointConfig, FetchOptions, OrderBy, PagePolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Cache engine configuration
///
/// Built with chained setters, or from `MIRRORCACHE_*` environment variables.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding one JSON file per collection
    pub data_dir: PathBuf,

    /// Base URL of the remote business API
    pub base_url: String,

    /// Upper bound for one page request
    pub request_timeout: Duration,

    /// Sort order requested from listing endpoints
    pub order_by: OrderBy,

    /// What bootstrap does when a page after the first fails
    pub bootstrap_policy: PagePolicy,

    pub employees: EndpointConfig,
    pub products: EndpointConfig,
    pub counterparties: EndpointConfig,
    pub counterparty_prices: EndpointConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(".mirrorcache", "http://localhost:8080/api")
    }
}

impl CacheConfig {
    pub fn new(data_dir: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(30),
            order_by: OrderBy::Asc,
            bootstrap_policy: PagePolicy::KeepAccumulated,
            employees: EndpointConfig::new("employees", "employees").total_pages("totalPages"),
            products: EndpointConfig::new("products", "products").total_items("total"),
            counterparties: EndpointConfig::new("counterparties", "counterparties")
                .total_pages("pages"),
            counterparty_prices: EndpointConfig::new("counterparty_prices", "counterparties/prices")
                .items_field("data")
                .total_items("meta.total"),
        }
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the remote base URL
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Set the per-page request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = order;
        self
    }

    pub fn bootstrap_policy(mut self, policy: PagePolicy) -> Self {
        self.bootstrap_policy = policy;
        self
    }

    /// Replace the endpoint of the collection named by `endpoint.collection`
    pub fn endpoint(mut self, endpoint: EndpointConfig) -> Result<Self> {
        let slot = match endpoint.collection.as_str() {
            "employees" => &mut self.employees,
            "products" => &mut self.products,
            "counterparties" => &mut self.counterparties,
            "counterparty_prices" => &mut self.counterparty_prices,
            other => {
                return Err(CacheError::Config(format!(
                    "No collection named '{}'",
                    other
                )));
            }
        };
        *slot = endpoint;
        Ok(self)
    }

    /// Reads configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for unset keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("MIRRORCACHE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("MIRRORCACHE_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = lookup("MIRRORCACHE_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CacheError::Config(format!(
                    "MIRRORCACHE_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    secs
                ))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(order) = lookup("MIRRORCACHE_ORDER_BY") {
            config.order_by = order.parse()?;
        }
        if let Some(policy) = lookup("MIRRORCACHE_BOOTSTRAP_POLICY") {
            config.bootstrap_policy = parse_page_policy(&policy)?;
        }

        Ok(config)
    }

    /// Fetch options for bootstrap; reconciliation overrides the policy itself
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            order: self.order_by,
            page_timeout: self.request_timeout,
            policy: self.bootstrap_policy,
            cancel: None,
        }
    }
}

pub fn parse_page_policy(value: &str) -> Result<PagePolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "keep" | "keep_accumulated" | "partial" => Ok(PagePolicy::KeepAccumulated),
        "abort" => Ok(PagePolicy::Abort),
        other => Err(CacheError::Config(format!(
            "bootstrap policy must be 'keep' or 'abort', got '{}'",
            other
        ))),
    }
}
