use super::deserialize_id;
use crate::cache::{CacheEntity, EntityCache, RemoteRecord, decode_field, unknown_field};
use crate::core::Result;
use crate::storage::{ObjectShape, Shape};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterparty {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Cache-only free-form note.
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCounterparty {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RemoteRecord for RemoteCounterparty {
    fn id(&self) -> &str {
        &self.id
    }
}

impl CacheEntity for Counterparty {
    type Remote = RemoteCounterparty;

    const COLLECTION: &'static str = "counterparties";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_remote(remote: &RemoteCounterparty) -> Self {
        Self {
            id: remote.id.clone(),
            name: remote.name.clone(),
            tax_id: remote.tax_id.clone(),
            phone: remote.phone.clone(),
            note: String::new(),
        }
    }

    fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            tax_id: None,
            phone: None,
            note: String::new(),
        }
    }

    fn remote_fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", json!(self.name)),
            ("taxId", json!(self.tax_id)),
            ("phone", json!(self.phone)),
        ]
    }

    fn set_remote_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "name" => self.name = decode_field(Self::COLLECTION, field, value)?,
            "taxId" => self.tax_id = decode_field(Self::COLLECTION, field, value)?,
            "phone" => self.phone = decode_field(Self::COLLECTION, field, value)?,
            _ => return Err(unknown_field(Self::COLLECTION, field)),
        }
        Ok(())
    }

    fn shape() -> Shape {
        ObjectShape::closed()
            .require_field("id", Shape::Text)
            .default_field("name", Shape::Text, json!(""))
            .default_field("taxId", Shape::nullable(Shape::Text), Value::Null)
            .default_field("phone", Shape::nullable(Shape::Text), Value::Null)
            .default_field("note", Shape::Text, json!(""))
            .into_shape()
    }
}

impl EntityCache<Counterparty> {
    pub fn set_note(&mut self, id: &str, note: impl Into<String>) -> Result<()> {
        let note = note.into();
        self.update(id, |counterparty| {
            counterparty.note = note;
            Ok(())
        })
    }
}
