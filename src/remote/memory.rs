use super::{CountField, EndpointConfig, OrderBy, RemotePage, RemoteSource};
use crate::core::{CacheError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Remote source served from memory, with per-page failure injection.
///
/// Pages are rendered into the envelope layout the endpoint declares and parsed
/// back through [`RemotePage::from_envelope`], so endpoint configuration is
/// exercised the same way as against a real server.
pub struct MemoryRemoteSource {
    page_size: usize,
    collections: Mutex<HashMap<String, Vec<Value>>>,
    failing: Mutex<HashSet<(String, u32)>>,
    requests: Mutex<Vec<(String, u32)>>,
}

impl MemoryRemoteSource {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            collections: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_items(&self, collection: &str, items: Vec<Value>) {
        if let Ok(mut collections) = self.collections.lock() {
            collections.insert(collection.to_string(), items);
        }
    }

    pub fn fail_page(&self, collection: &str, page: u32) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert((collection.to_string(), page));
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }

    /// Pages requested for `collection`, in request order.
    pub fn requested_pages(&self, collection: &str) -> Vec<u32> {
        self.requests
            .lock()
            .map(|requests| {
                requests
                    .iter()
                    .filter(|(name, _)| name == collection)
                    .map(|(_, page)| *page)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn render(&self, endpoint: &EndpointConfig, page: u32, order: OrderBy) -> Result<Value> {
        let mut items = self
            .collections
            .lock()?
            .get(&endpoint.collection)
            .cloned()
            .unwrap_or_default();
        if order == OrderBy::Desc {
            items.reverse();
        }

        let page_size = endpoint
            .page_size
            .map(|size| size as usize)
            .unwrap_or(self.page_size)
            .max(1);
        let total_items = items.len();
        let total_pages = total_items.div_ceil(page_size);
        let start = (page.saturating_sub(1) as usize).saturating_mul(page_size);
        let slice: Vec<Value> = items.into_iter().skip(start).take(page_size).collect();

        let mut envelope = Value::Object(Map::new());
        insert_path(&mut envelope, &endpoint.items_field, Value::Array(slice));
        match &endpoint.count {
            CountField::TotalPages(name) => insert_path(&mut envelope, name, total_pages.into()),
            CountField::TotalItems(name) => insert_path(&mut envelope, name, total_items.into()),
        }
        Ok(envelope)
    }
}

#[async_trait]
impl RemoteSource for MemoryRemoteSource {
    async fn fetch_page(
        &self,
        endpoint: &EndpointConfig,
        page: u32,
        order: OrderBy,
    ) -> Result<RemotePage> {
        self.requests
            .lock()?
            .push((endpoint.collection.clone(), page));

        if self
            .failing
            .lock()?
            .contains(&(endpoint.collection.clone(), page))
        {
            return Err(CacheError::FetchUnavailable {
                collection: endpoint.collection.clone(),
                page,
                reason: "injected failure".to_string(),
            });
        }

        let envelope = self.render(endpoint, page, order)?;
        RemotePage::from_envelope(&envelope, endpoint, page)
    }
}

fn insert_path(target: &mut Value, path: &str, value: Value) {
    let mut current = target;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        let Some(object) = current.as_object_mut() else {
            return;
        };
        if parts.peek().is_none() {
            object.insert(part.to_string(), value);
            return;
        }
        current = object
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_renders_declared_envelope_layout() {
        let remote = MemoryRemoteSource::new(2);
        remote.set_items("products", vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})]);
        let endpoint = EndpointConfig::new("products", "products")
            .items_field("data")
            .total_items("meta.total");

        let envelope = remote.render(&endpoint, 2, OrderBy::Asc).unwrap();
        assert_eq!(envelope, json!({"data": [{"id": "c"}], "meta": {"total": 3}}));

        let page = remote.fetch_page(&endpoint, 1, OrderBy::Desc).await.unwrap();
        assert_eq!(page.items, vec![json!({"id": "c"}), json!({"id": "b"})]);
        assert_eq!(page.total_pages, 2);
    }
}
