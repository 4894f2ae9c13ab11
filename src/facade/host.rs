use crate::cache::{CacheEntity, EntityCache};
use crate::config::CacheConfig;
use crate::core::{CacheError, Result};
use crate::entities::{Counterparty, CounterpartyPriceList, Employee, Product};
use crate::remote::{EndpointConfig, FetchOptions, RemoteSource};
use crate::storage::RecordStore;
use crate::sync::{ValidateOptions, initialize, validate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

/// One call across the host/UI boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRequest {
    pub collection: String,
    pub operation: String,
    #[serde(default)]
    pub payload: Value,
}

impl HostRequest {
    pub fn new(collection: &str, operation: &str, payload: Value) -> Self {
        Self {
            collection: collection.to_string(),
            operation: operation.to_string(),
            payload,
        }
    }
}

/// Owns every entity cache of the process and routes named operations to them.
///
/// Constructed explicitly with its store and remote source, so tests can pass
/// in-memory doubles for both.
pub struct CacheHost {
    config: CacheConfig,
    remote: Arc<dyn RemoteSource>,
    employees: EntityCache<Employee>,
    products: EntityCache<Product>,
    counterparties: EntityCache<Counterparty>,
    counterparty_prices: EntityCache<CounterpartyPriceList>,
}

impl CacheHost {
    /// Hydrates all caches from `store`.
    pub fn open(
        config: CacheConfig,
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteSource>,
    ) -> Result<Self> {
        Ok(Self {
            employees: EntityCache::open(store.clone())?,
            products: EntityCache::open(store.clone())?,
            counterparties: EntityCache::open(store.clone())?,
            counterparty_prices: EntityCache::open(store)?,
            config,
            remote,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn collections() -> [&'static str; 4] {
        [
            Employee::COLLECTION,
            Product::COLLECTION,
            Counterparty::COLLECTION,
            CounterpartyPriceList::COLLECTION,
        ]
    }

    pub fn employees(&mut self) -> &mut EntityCache<Employee> {
        &mut self.employees
    }

    pub fn products(&mut self) -> &mut EntityCache<Product> {
        &mut self.products
    }

    pub fn counterparties(&mut self) -> &mut EntityCache<Counterparty> {
        &mut self.counterparties
    }

    pub fn counterparty_prices(&mut self) -> &mut EntityCache<CounterpartyPriceList> {
        &mut self.counterparty_prices
    }

    /// Dispatches `request` and returns a JSON result.
    ///
    /// Operations: `get_all`, `get`, `add`, `remove`, `replace`, `reorder`,
    /// `update`, `initialize`, `validate`.
    pub async fn call(&mut self, request: HostRequest) -> Result<Value> {
        debug!(collection = %request.collection, operation = %request.operation, "host call");
        let fetch = self.config.fetch_options();
        let remote = self.remote.as_ref();
        let HostRequest {
            collection,
            operation,
            payload,
        } = request;

        match collection.as_str() {
            "employees" => {
                let route = Route::new(remote, &self.config.employees, &fetch);
                route.dispatch(&mut self.employees, &operation, payload).await
            }
            "products" => {
                let route = Route::new(remote, &self.config.products, &fetch);
                route.dispatch(&mut self.products, &operation, payload).await
            }
            "counterparties" => {
                let route = Route::new(remote, &self.config.counterparties, &fetch);
                route.dispatch(&mut self.counterparties, &operation, payload).await
            }
            "counterparty_prices" => {
                let route = Route::new(remote, &self.config.counterparty_prices, &fetch);
                route
                    .dispatch(&mut self.counterparty_prices, &operation, payload)
                    .await
            }
            other => Err(CacheError::UnknownOperation(format!(
                "no collection named '{}'",
                other
            ))),
        }
    }
}

struct Route<'a> {
    remote: &'a dyn RemoteSource,
    endpoint: &'a EndpointConfig,
    fetch: &'a FetchOptions,
}

impl<'a> Route<'a> {
    fn new(remote: &'a dyn RemoteSource, endpoint: &'a EndpointConfig, fetch: &'a FetchOptions) -> Self {
        Self {
            remote,
            endpoint,
            fetch,
        }
    }

    async fn dispatch<E: CacheEntity>(
        &self,
        cache: &mut EntityCache<E>,
        operation: &str,
        payload: Value,
    ) -> Result<Value> {
        match operation {
            "get_all" => Ok(serde_json::to_value(cache.get_all())?),
            "get" => {
                let id = payload_id(&payload)?;
                let entity = cache
                    .get(&id)
                    .ok_or_else(|| CacheError::not_found(cache.key(), id.as_str()))?;
                Ok(serde_json::to_value(entity)?)
            }
            "add" => {
                let entity: E = decode_entity(payload)?;
                let stored = serde_json::to_value(&entity)?;
                cache.add(entity)?;
                Ok(stored)
            }
            "remove" => {
                let id = payload_id(&payload)?;
                let removed = cache.remove(&id)?;
                Ok(json!({ "removed": removed }))
            }
            "replace" => {
                let Value::Array(values) = payload else {
                    return Err(CacheError::InvalidPayload(
                        "replace expects an array of entities".to_string(),
                    ));
                };
                let list = values
                    .into_iter()
                    .map(decode_entity::<E>)
                    .collect::<Result<Vec<_>>>()?;
                cache.replace_all(list)?;
                Ok(json!({ "count": cache.len() }))
            }
            "reorder" => {
                let ids = payload_ids(payload)?;
                cache.reorder(&ids)?;
                Ok(serde_json::to_value(cache.get_all())?)
            }
            "update" => {
                let id = payload_id(&payload)?;
                let patch = payload
                    .get("patch")
                    .and_then(Value::as_object)
                    .ok_or_else(|| {
                        CacheError::InvalidPayload("update expects a 'patch' object".to_string())
                    })?
                    .clone();
                let current = cache
                    .get(&id)
                    .ok_or_else(|| CacheError::not_found(cache.key(), id.as_str()))?;
                let mut merged = serde_json::to_value(current)?;
                if let Some(object) = merged.as_object_mut() {
                    for (key, value) in patch {
                        object.insert(key, value);
                    }
                }
                let next: E = decode_entity(merged)?;
                let stored = serde_json::to_value(&next)?;
                cache.update(&id, |entity| {
                    *entity = next;
                    Ok(())
                })?;
                Ok(stored)
            }
            "initialize" => {
                let outcome = initialize(cache, self.remote, self.endpoint, self.fetch).await?;
                Ok(serde_json::to_value(outcome)?)
            }
            "validate" => {
                let options: ValidateOptions = if payload.is_null() {
                    ValidateOptions::default()
                } else {
                    serde_json::from_value(payload)
                        .map_err(|err| CacheError::InvalidPayload(err.to_string()))?
                };
                let report = validate(cache, self.remote, self.endpoint, &options, self.fetch).await?;
                Ok(serde_json::to_value(report)?)
            }
            other => Err(CacheError::UnknownOperation(format!(
                "'{}' on '{}'",
                other,
                cache.key()
            ))),
        }
    }
}

/// Conforms a payload to the entity shape (filling cache-only defaults) and decodes it.
fn decode_entity<E: CacheEntity>(payload: Value) -> Result<E> {
    let conformed = E::shape().conform(&payload).ok_or_else(|| {
        CacheError::InvalidPayload(format!("not a valid '{}' entity", E::COLLECTION))
    })?;
    serde_json::from_value(conformed).map_err(|err| CacheError::InvalidPayload(err.to_string()))
}

fn payload_id(payload: &Value) -> Result<String> {
    match payload {
        Value::String(id) => Ok(id.clone()),
        Value::Object(object) => object
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CacheError::InvalidPayload("payload has no string 'id'".to_string())),
        _ => Err(CacheError::InvalidPayload(
            "expected an id or an object with 'id'".to_string(),
        )),
    }
}

fn payload_ids(payload: Value) -> Result<Vec<String>> {
    let list = match payload {
        Value::Array(list) => list,
        Value::Object(mut object) => match object.remove("ids") {
            Some(Value::Array(list)) => list,
            _ => {
                return Err(CacheError::InvalidPayload(
                    "reorder expects 'ids' to be an array".to_string(),
                ));
            }
        },
        _ => {
            return Err(CacheError::InvalidPayload(
                "reorder expects an array of ids".to_string(),
            ));
        }
    };

    list.into_iter()
        .map(|value| match value {
            Value::String(id) => Ok(id),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(CacheError::InvalidPayload(format!("invalid id {}", other))),
        })
        .collect()
}
