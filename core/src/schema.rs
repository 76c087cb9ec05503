//! Declarative JSON schemas for structured LLM output.
//!
//! An [ObjectSchema] describes a flat JSON object as an ordered list of named fields. The same
//! value is serialized into the request (so the server can constrain its reply) and used to check
//! the reply once it comes back, so the contract lives in one place.

use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// JSON type of a single schema field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
        }
    }
}

/// Description of one field of an [ObjectSchema].
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    pub kind: FieldType,
    pub description: Option<String>,
    pub enum_values: Option<Vec<String>>,
    pub required: bool,
}

impl FieldSchema {
    /// A required field of type `kind`.
    pub fn of(kind: FieldType) -> FieldSchema {
        FieldSchema {
            kind,
            description: None,
            enum_values: None,
            required: true,
        }
    }

    /// A required string field.
    pub fn string() -> FieldSchema {
        FieldSchema::of(FieldType::String)
    }

    pub fn description(mut self, description: &str) -> FieldSchema {
        self.description = Some(description.to_string());
        self
    }

    /// Restricts the field to the given values.
    pub fn one_of(mut self, values: &[&str]) -> FieldSchema {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn optional(mut self) -> FieldSchema {
        self.required = false;
        self
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".into(), json!(self.kind));
        if let Some(ref description) = self.description {
            out.insert("description".into(), json!(description));
        }
        if let Some(ref values) = self.enum_values {
            out.insert("enum".into(), json!(values));
        }
        Value::Object(out)
    }
}

/// A JSON object schema with an ordered set of fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectSchema {
    fields: Vec<(String, FieldSchema)>,
}

impl ObjectSchema {
    pub fn new() -> ObjectSchema {
        ObjectSchema::default()
    }

    /// Adds a field. Adding a name twice replaces the earlier definition in place.
    pub fn field(mut self, name: &str, field: FieldSchema) -> ObjectSchema {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = field,
            None => self.fields.push((name.to_string(), field)),
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// Names of the required fields, in declaration order.
    pub fn required(&self) -> Vec<&str> {
        self.fields()
            .filter(|(_, f)| f.required)
            .map(|(n, _)| n)
            .collect()
    }

    /// Renders this schema as a JSON-schema document.
    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.to_json()))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required(),
        })
    }

    /// Checks that `value` is an object carrying every required field with the declared type
    /// (and, for enumerated fields, one of the allowed values). Extra fields are accepted.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        let Some(object) = value.as_object() else {
            return Err(SchemaError::NotAnObject);
        };
        for (name, field) in self.fields() {
            let Some(found) = object.get(name) else {
                if field.required {
                    return Err(SchemaError::MissingField(name.to_string()));
                }
                continue;
            };
            if !field.kind.matches(found) {
                return Err(SchemaError::WrongType {
                    field: name.to_string(),
                    expected: field.kind,
                });
            }
            if let Some(ref allowed) = field.enum_values
                && !allowed.iter().any(|a| found.as_str() == Some(a))
            {
                return Err(SchemaError::NotAllowed(name.to_string()));
            }
        }
        Ok(())
    }
}

impl Serialize for ObjectSchema {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Reason a value does not conform to an [ObjectSchema].
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("field `{field}` is not of type {expected:?}")]
    WrongType { field: String, expected: FieldType },
    #[error("field `{0}` is not one of the allowed values")]
    NotAllowed(String),
}
