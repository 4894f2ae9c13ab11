use super::{EndpointConfig, OrderBy, RemotePage, RemoteSource};
use crate::core::{CacheError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Remote source over HTTP: `GET {base_url}/{path}?page=<n>&orderBy=<asc|desc>`.
#[derive(Debug, Clone)]
pub struct HttpRemoteSource {
    client: Client,
    base_url: String,
}

impl HttpRemoteSource {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| CacheError::Config(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, endpoint: &EndpointConfig) -> String {
        format!("{}/{}", self.base_url, endpoint.path.trim_start_matches('/'))
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_page(
        &self,
        endpoint: &EndpointConfig,
        page: u32,
        order: OrderBy,
    ) -> Result<RemotePage> {
        let unavailable = |reason: String| CacheError::FetchUnavailable {
            collection: endpoint.collection.clone(),
            page,
            reason,
        };

        let url = self.url_for(endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[("page", page.to_string()), ("orderBy", order.to_string())])
            .send()
            .await
            .map_err(|err| unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("{} returned {}", url, status)));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|err| unavailable(format!("invalid JSON body: {}", err)))?;
        debug!(url = %url, page, status = status.as_u16(), "page received");

        RemotePage::from_envelope(&envelope, endpoint, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let source = HttpRemoteSource::new("http://api.local/v1/", Duration::from_secs(1)).unwrap();
        let endpoint = EndpointConfig::new("employees", "/employees");
        assert_eq!(source.url_for(&endpoint), "http://api.local/v1/employees");
    }
}
