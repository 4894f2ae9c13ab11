//! Per-counterparty price lists.
//!
//! The remote side only knows which products a counterparty trades; the agreed
//! prices are kept locally and survive every reconciliation.

use super::{check_nested_keys, deserialize_id};
use crate::cache::{CacheEntity, EntityCache, RemoteRecord, decode_field, unknown_field};
use crate::core::{CacheError, Result};
use crate::storage::{ObjectShape, Shape};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedProduct {
    pub product_id: String,
    /// Cache-only agreed price.
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyPriceList {
    /// Counterparty id.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub products: Vec<PricedProduct>,
}

impl CounterpartyPriceList {
    pub fn price_of(&self, product_id: &str) -> Option<f64> {
        self.products
            .iter()
            .find(|p| p.product_id == product_id)
            .map(|p| p.price)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePricedProduct {
    #[serde(deserialize_with = "deserialize_id")]
    pub product_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCounterpartyPriceList {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub products: Vec<RemotePricedProduct>,
}

impl RemoteRecord for RemoteCounterpartyPriceList {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("item has an empty id".to_string());
        }
        check_nested_keys(
            "products",
            self.products.iter().map(|p| p.product_id.as_str()),
        )
    }
}

impl CacheEntity for CounterpartyPriceList {
    type Remote = RemoteCounterpartyPriceList;

    const COLLECTION: &'static str = "counterparty_prices";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_remote(remote: &RemoteCounterpartyPriceList) -> Self {
        Self {
            id: remote.id.clone(),
            name: remote.name.clone(),
            products: remote
                .products
                .iter()
                .map(|p| PricedProduct {
                    product_id: p.product_id.clone(),
                    price: 0.0,
                })
                .collect(),
        }
    }

    fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            products: Vec::new(),
        }
    }

    fn remote_fields(&self) -> Vec<(&'static str, Value)> {
        vec![("name", json!(self.name))]
    }

    fn set_remote_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "name" => self.name = decode_field(Self::COLLECTION, field, value)?,
            _ => return Err(unknown_field(Self::COLLECTION, field)),
        }
        Ok(())
    }

    fn shape() -> Shape {
        let product = ObjectShape::closed()
            .require_field("productId", Shape::Text)
            .default_field("price", Shape::Number, json!(0.0))
            .into_shape();

        ObjectShape::closed()
            .require_field("id", Shape::Text)
            .default_field("name", Shape::Text, json!(""))
            .default_field("products", Shape::array_of(product), json!([]))
            .into_shape()
    }

    fn nested_field() -> Option<&'static str> {
        Some("products")
    }

    fn nested_keys(&self) -> Vec<String> {
        self.products.iter().map(|p| p.product_id.clone()).collect()
    }

    fn adopt_nested(&mut self, key: &str, source: &Self) {
        if self.products.iter().any(|p| p.product_id == key) {
            return;
        }
        if let Some(product) = source.products.iter().find(|p| p.product_id == key) {
            self.products.push(product.clone());
        }
    }

    fn remove_nested(&mut self, key: &str) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.product_id != key);
        self.products.len() != before
    }
}

impl EntityCache<CounterpartyPriceList> {
    pub fn set_price(&mut self, counterparty_id: &str, product_id: &str, price: f64) -> Result<()> {
        let key = self.key().to_string();
        self.update(counterparty_id, |list| {
            let entry = list
                .products
                .iter_mut()
                .find(|p| p.product_id == product_id)
                .ok_or_else(|| {
                    CacheError::not_found(&key, format!("{}/{}", counterparty_id, product_id))
                })?;
            entry.price = price;
            Ok(())
        })
    }
}
