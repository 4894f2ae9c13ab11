use super::deserialize_id;
use crate::cache::{CacheEntity, RemoteRecord, decode_field, unknown_field};
use crate::core::Result;
use crate::storage::{ObjectShape, Shape};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Cache-only running total (payroll accruals and the like).
    #[serde(default)]
    pub accumulated: f64,
}

impl Employee {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: String::new(),
            phone: None,
            accumulated: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEmployee {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RemoteRecord for RemoteEmployee {
    fn id(&self) -> &str {
        &self.id
    }
}

impl CacheEntity for Employee {
    type Remote = RemoteEmployee;

    const COLLECTION: &'static str = "employees";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_remote(remote: &RemoteEmployee) -> Self {
        Self {
            id: remote.id.clone(),
            name: remote.name.clone(),
            position: remote.position.clone().unwrap_or_default(),
            phone: remote.phone.clone(),
            accumulated: 0.0,
        }
    }

    fn placeholder(id: &str) -> Self {
        Self::new(id, "")
    }

    fn remote_fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", json!(self.name)),
            ("position", json!(self.position)),
            ("phone", json!(self.phone)),
        ]
    }

    fn set_remote_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "name" => self.name = decode_field(Self::COLLECTION, field, value)?,
            "position" => self.position = decode_field(Self::COLLECTION, field, value)?,
            "phone" => self.phone = decode_field(Self::COLLECTION, field, value)?,
            _ => return Err(unknown_field(Self::COLLECTION, field)),
        }
        Ok(())
    }

    fn shape() -> Shape {
        ObjectShape::closed()
            .require_field("id", Shape::Text)
            .default_field("name", Shape::Text, json!(""))
            .default_field("position", Shape::Text, json!(""))
            .default_field("phone", Shape::nullable(Shape::Text), Value::Null)
            .default_field("accumulated", Shape::Number, json!(0.0))
            .into_shape()
    }
}
