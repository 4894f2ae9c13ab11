use super::{check_nested_keys, deserialize_id};
use crate::cache::{CacheEntity, EntityCache, RemoteRecord, decode_field, unknown_field};
use crate::core::{CacheError, Result};
use crate::storage::{ObjectShape, Shape};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// How many previous unit prices a scale remembers.
pub const MAX_PRICE_HISTORY: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scale {
    pub name: String,
    /// Cache-only: most recent unit prices, newest last.
    #[serde(default)]
    pub last_prices: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub scales: Vec<Scale>,
    /// Cache-only: locally remembered selling price.
    #[serde(default)]
    pub cached_price: Option<f64>,
}

impl Product {
    pub fn scale(&self, name: &str) -> Option<&Scale> {
        self.scales.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteScale {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProduct {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub scales: Vec<RemoteScale>,
}

impl RemoteRecord for RemoteProduct {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("item has an empty id".to_string());
        }
        check_nested_keys("scales", self.scales.iter().map(|s| s.name.as_str()))
    }
}

impl CacheEntity for Product {
    type Remote = RemoteProduct;

    const COLLECTION: &'static str = "products";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_remote(remote: &RemoteProduct) -> Self {
        Self {
            id: remote.id.clone(),
            name: remote.name.clone(),
            unit: remote.unit.clone().unwrap_or_default(),
            scales: remote
                .scales
                .iter()
                .map(|s| Scale {
                    name: s.name.clone(),
                    last_prices: Vec::new(),
                })
                .collect(),
            cached_price: None,
        }
    }

    fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            unit: String::new(),
            scales: Vec::new(),
            cached_price: None,
        }
    }

    fn remote_fields(&self) -> Vec<(&'static str, Value)> {
        vec![("name", json!(self.name)), ("unit", json!(self.unit))]
    }

    fn set_remote_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "name" => self.name = decode_field(Self::COLLECTION, field, value)?,
            "unit" => self.unit = decode_field(Self::COLLECTION, field, value)?,
            _ => return Err(unknown_field(Self::COLLECTION, field)),
        }
        Ok(())
    }

    fn shape() -> Shape {
        let scale = ObjectShape::closed()
            .require_field("name", Shape::Text)
            .default_field("lastPrices", Shape::array_of(Shape::Number), json!([]))
            .into_shape();

        ObjectShape::closed()
            .require_field("id", Shape::Text)
            .default_field("name", Shape::Text, json!(""))
            .default_field("unit", Shape::Text, json!(""))
            .default_field("scales", Shape::array_of(scale), json!([]))
            .default_field("cachedPrice", Shape::nullable(Shape::Number), Value::Null)
            .into_shape()
    }

    fn nested_field() -> Option<&'static str> {
        Some("scales")
    }

    fn nested_keys(&self) -> Vec<String> {
        self.scales.iter().map(|s| s.name.clone()).collect()
    }

    fn adopt_nested(&mut self, key: &str, source: &Self) {
        if self.scale(key).is_some() {
            return;
        }
        if let Some(scale) = source.scale(key) {
            self.scales.push(scale.clone());
        }
    }

    fn remove_nested(&mut self, key: &str) -> bool {
        let before = self.scales.len();
        self.scales.retain(|s| s.name != key);
        self.scales.len() != before
    }
}

impl EntityCache<Product> {
    /// Appends `price` to a scale's price history, keeping the newest entries.
    pub fn record_scale_price(&mut self, product_id: &str, scale: &str, price: f64) -> Result<()> {
        let key = self.key().to_string();
        self.update(product_id, |product| {
            let entry = product
                .scales
                .iter_mut()
                .find(|s| s.name == scale)
                .ok_or_else(|| CacheError::not_found(&key, format!("{}/{}", product_id, scale)))?;
            entry.last_prices.push(price);
            if entry.last_prices.len() > MAX_PRICE_HISTORY {
                let excess = entry.last_prices.len() - MAX_PRICE_HISTORY;
                entry.last_prices.drain(..excess);
            }
            Ok(())
        })
    }

    pub fn set_cached_price(&mut self, product_id: &str, price: Option<f64>) -> Result<()> {
        self.update(product_id, |product| {
            product.cached_price = price;
            Ok(())
        })
    }
}
