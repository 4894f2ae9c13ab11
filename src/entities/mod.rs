//! Concrete entity kinds and their typed remote counterparts.

mod counterparty;
mod counterparty_price;
mod employee;
mod product;

pub use counterparty::{Counterparty, RemoteCounterparty};
pub use counterparty_price::{
    CounterpartyPriceList, PricedProduct, RemoteCounterpartyPriceList, RemotePricedProduct,
};
pub use employee::{Employee, RemoteEmployee};
pub use product::{MAX_PRICE_HISTORY, Product, RemoteProduct, RemoteScale, Scale};

use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

/// Remote ids arrive as strings or integers depending on the endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Signed(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}

/// Rejects empty or repeated secondary keys in a remote nested collection.
pub(crate) fn check_nested_keys<'a, I>(field: &str, keys: I) -> Result<(), String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for key in keys {
        if key.trim().is_empty() {
            return Err(format!("{} contains an item with an empty key", field));
        }
        if !seen.insert(key) {
            return Err(format!("{} contains '{}' more than once", field, key));
        }
    }
    Ok(())
}
