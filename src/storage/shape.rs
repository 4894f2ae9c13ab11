//! Declared shapes for persisted records.
//!
//! A shape never rejects a stored value outright. [`Shape::conform`] walks the
//! value and repairs what it can: declared defaults replace absent or invalid
//! fields, undeclared properties of closed objects are stripped, and array
//! elements that cannot be repaired are dropped. Only when nothing sensible
//! is left does it return `None`, and the caller falls back to the record
//! default.

use serde_json::{Map, Value};
use std::collections::HashSet;

/// Supported value shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Any,
    Number,
    Text,
    Nullable(Box<Shape>),
    Array(Box<Shape>),
    Object(ObjectShape),
}

/// Contract for a single property of an object shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    pub name: String,
    pub shape: Shape,
    pub required: bool,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectShape {
    pub fields: Vec<FieldShape>,
    pub allow_extra_fields: bool,
}

impl Default for ObjectShape {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            allow_extra_fields: false,
        }
    }
}

impl ObjectShape {
    /// Creates a closed object shape (undeclared properties are stripped).
    pub fn closed() -> Self {
        Self::default()
    }

    /// Adds a required field with no default. A value missing it cannot be repaired.
    pub fn require_field(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.fields.push(FieldShape {
            name: name.into(),
            shape,
            required: true,
            default: None,
        });
        self
    }

    /// Adds an optional field that is simply omitted when absent or invalid.
    pub fn optional_field(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.fields.push(FieldShape {
            name: name.into(),
            shape,
            required: false,
            default: None,
        });
        self
    }

    /// Adds a field that takes `default` whenever it is absent or invalid.
    pub fn default_field(mut self, name: impl Into<String>, shape: Shape, default: Value) -> Self {
        self.fields.push(FieldShape {
            name: name.into(),
            shape,
            required: true,
            default: Some(default),
        });
        self
    }

    pub fn allow_extra_fields(mut self, allow: bool) -> Self {
        self.allow_extra_fields = allow;
        self
    }

    pub fn into_shape(self) -> Shape {
        Shape::Object(self)
    }

    fn conform(&self, value: &Value) -> Option<Value> {
        let object = value.as_object()?;
        let mut repaired = Map::new();
        let mut declared = HashSet::new();

        for field in &self.fields {
            declared.insert(field.name.as_str());

            match object.get(&field.name).and_then(|v| field.shape.conform(v)) {
                Some(conformed) => {
                    repaired.insert(field.name.clone(), conformed);
                }
                None => match &field.default {
                    Some(default) => {
                        repaired.insert(field.name.clone(), default.clone());
                    }
                    None if field.required => return None,
                    None => {}
                },
            }
        }

        if self.allow_extra_fields {
            for (key, value) in object {
                if !declared.contains(key.as_str()) {
                    repaired.insert(key.clone(), value.clone());
                }
            }
        }

        Some(Value::Object(repaired))
    }
}

impl Shape {
    pub fn array_of(item: Shape) -> Self {
        Self::Array(Box::new(item))
    }

    pub fn nullable(inner: Shape) -> Self {
        Self::Nullable(Box::new(inner))
    }

    /// Returns the value made conformant, or `None` if it cannot be repaired.
    pub fn conform(&self, value: &Value) -> Option<Value> {
        match self {
            Shape::Any => Some(value.clone()),
            Shape::Number => value.is_number().then(|| value.clone()),
            Shape::Text => value.is_string().then(|| value.clone()),
            Shape::Nullable(inner) => {
                if value.is_null() {
                    Some(Value::Null)
                } else {
                    inner.conform(value)
                }
            }
            Shape::Array(item) => {
                let items = value.as_array()?;
                Some(Value::Array(
                    items.iter().filter_map(|v| item.conform(v)).collect(),
                ))
            }
            Shape::Object(object) => object.conform(value),
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        self.conform(value).as_ref() == Some(value)
    }
}

/// Shape plus the default a record falls back to when its stored value is unusable.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub shape: Shape,
    pub default: Value,
}

/// How a loaded record relates to what was on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Intact,
    Repaired,
    Defaulted,
}

impl RecordSchema {
    pub fn new(shape: Shape, default: Value) -> Self {
        Self { shape, default }
    }

    /// Schema for a collection stored as an array of `item`, defaulting to `[]`.
    pub fn collection(item: Shape) -> Self {
        Self::new(Shape::array_of(item), Value::Array(Vec::new()))
    }

    pub fn resolve(&self, stored: Option<&Value>) -> (Value, LoadState) {
        let Some(stored) = stored else {
            return (self.default.clone(), LoadState::Defaulted);
        };

        match self.shape.conform(stored) {
            Some(conformed) if &conformed == stored => (conformed, LoadState::Intact),
            Some(conformed) => (conformed, LoadState::Repaired),
            None => (self.default.clone(), LoadState::Defaulted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn employee_shape() -> Shape {
        ObjectShape::closed()
            .require_field("id", Shape::Text)
            .require_field("name", Shape::Text)
            .default_field("accumulated", Shape::Number, json!(0.0))
            .into_shape()
    }

    #[test]
    fn test_conforming_value_is_intact() {
        let schema = RecordSchema::collection(employee_shape());
        let stored = json!([{"id": "1", "name": "A", "accumulated": 5.5}]);
        let (value, state) = schema.resolve(Some(&stored));
        assert_eq!(state, LoadState::Intact);
        assert_eq!(value, stored);
    }

    #[test]
    fn test_invalid_field_takes_declared_default() {
        let schema = RecordSchema::collection(employee_shape());
        let stored = json!([{"id": "1", "name": "A", "accumulated": "lots"}]);
        let (value, state) = schema.resolve(Some(&stored));
        assert_eq!(state, LoadState::Repaired);
        assert_eq!(value, json!([{"id": "1", "name": "A", "accumulated": 0.0}]));
    }

    #[test]
    fn test_closed_object_strips_unknown_properties() {
        let schema = RecordSchema::collection(employee_shape());
        let stored = json!([{"id": "1", "name": "A", "accumulated": 1, "rogue": true}]);
        let (value, state) = schema.resolve(Some(&stored));
        assert_eq!(state, LoadState::Repaired);
        assert_eq!(value, json!([{"id": "1", "name": "A", "accumulated": 1}]));
    }

    #[test]
    fn test_unrepairable_elements_are_dropped() {
        let schema = RecordSchema::collection(employee_shape());
        let stored = json!([{"name": "no id"}, {"id": "2", "name": "B"}]);
        let (value, state) = schema.resolve(Some(&stored));
        assert_eq!(state, LoadState::Repaired);
        assert_eq!(value, json!([{"id": "2", "name": "B", "accumulated": 0.0}]));
    }

    #[test]
    fn test_wrong_root_type_falls_back_to_default() {
        let schema = RecordSchema::collection(employee_shape());
        let (value, state) = schema.resolve(Some(&json!({"not": "an array"})));
        assert_eq!(state, LoadState::Defaulted);
        assert_eq!(value, json!([]));

        let (value, state) = schema.resolve(None);
        assert_eq!(state, LoadState::Defaulted);
        assert_eq!(value, json!([]));
    }

    #[test]
    fn test_nullable_and_nested_arrays() {
        let shape = ObjectShape::closed()
            .require_field("name", Shape::Text)
            .default_field("price", Shape::nullable(Shape::Number), Value::Null)
            .default_field("history", Shape::array_of(Shape::Number), json!([]))
            .into_shape();

        assert!(shape.matches(&json!({"name": "x", "price": null, "history": [1, 2.5]})));
        assert_eq!(
            shape.conform(&json!({"name": "x", "history": [1, "bad", 3]})),
            Some(json!({"name": "x", "price": null, "history": [1, 3]}))
        );
    }

    #[test]
    fn test_open_object_keeps_extra_properties() {
        let shape = ObjectShape::closed()
            .require_field("id", Shape::Text)
            .allow_extra_fields(true)
            .into_shape();
        assert!(shape.matches(&json!({"id": "1", "extra": [1, 2]})));
    }
}
