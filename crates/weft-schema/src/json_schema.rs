//! Conversion between [`Schema`] and JSON Schema documents.
//!
//! Only the subset needed to describe step payloads is supported:
//! `type` (a single string), `properties`, `required`, `items` and a boolean
//! `additionalProperties`. A document without `type` maps to [`Schema::Any`].
//!
//! ```json
//! {
//!   "type": "object",
//!   "properties": { "name": { "type": "string" } },
//!   "required": ["name"]
//! }
//! ```

use std::collections::HashSet;

use serde_json::{Value, json};

use crate::error::SchemaError;
use crate::schema::{Field, ObjectSchema, Schema, UnknownKeys};

impl Schema {
  /// Build a schema from a JSON Schema document.
  pub fn from_json_schema(document: &Value) -> Result<Self, SchemaError> {
    parse_node(document, "$")
  }

  /// Render this schema as a JSON Schema document.
  ///
  /// Used when advertising tools to consumers that speak JSON Schema.
  pub fn to_json_schema(&self) -> Value {
    match self {
      Schema::Any => json!({}),
      Schema::Array(items) => json!({
        "type": "array",
        "items": items.to_json_schema(),
      }),
      Schema::Object(object) => {
        let properties: serde_json::Map<String, Value> = object
          .fields
          .iter()
          .map(|(name, field)| (name.clone(), field.schema.to_json_schema()))
          .collect();
        let required: Vec<&String> = object
          .fields
          .iter()
          .filter(|(_, field)| field.required)
          .map(|(name, _)| name)
          .collect();

        let mut doc = json!({
          "type": "object",
          "properties": properties,
          "required": required,
        });
        match object.unknown_keys {
          UnknownKeys::Reject => doc["additionalProperties"] = Value::Bool(false),
          UnknownKeys::Passthrough => doc["additionalProperties"] = Value::Bool(true),
          UnknownKeys::Strip => {}
        }
        doc
      }
      scalar => json!({ "type": scalar.type_name() }),
    }
  }
}

fn parse_node(node: &Value, path: &str) -> Result<Schema, SchemaError> {
  let Some(obj) = node.as_object() else {
    return Err(SchemaError::Malformed {
      path: path.to_string(),
      message: "schema must be an object".to_string(),
    });
  };

  let type_name = match obj.get("type") {
    None => return Ok(Schema::Any),
    Some(Value::String(s)) => s.as_str(),
    Some(_) => {
      return Err(SchemaError::Malformed {
        path: path.to_string(),
        message: "'type' must be a single string".to_string(),
      });
    }
  };

  match type_name {
    "string" => Ok(Schema::String),
    "number" => Ok(Schema::Number),
    "integer" => Ok(Schema::Integer),
    "boolean" => Ok(Schema::Boolean),
    "null" => Ok(Schema::Null),
    "array" => {
      let items = match obj.get("items") {
        Some(items) => parse_node(items, &format!("{}.items", path))?,
        None => Schema::Any,
      };
      Ok(Schema::array(items))
    }
    "object" => parse_object(obj, path).map(Schema::Object),
    other => Err(SchemaError::UnsupportedType {
      path: path.to_string(),
      type_name: other.to_string(),
    }),
  }
}

fn parse_object(
  obj: &serde_json::Map<String, Value>,
  path: &str,
) -> Result<ObjectSchema, SchemaError> {
  let malformed_required = || SchemaError::Malformed {
    path: path.to_string(),
    message: "'required' must be an array of strings".to_string(),
  };
  let required: HashSet<&str> = match obj.get("required") {
    None => HashSet::new(),
    Some(Value::Array(names)) => names
      .iter()
      .map(|n| n.as_str().ok_or_else(malformed_required))
      .collect::<Result<_, _>>()?,
    Some(_) => return Err(malformed_required()),
  };

  let mut object = ObjectSchema::default();

  match obj.get("properties") {
    None => {}
    Some(Value::Object(properties)) => {
      for (name, prop) in properties {
        let schema = parse_node(prop, &format!("{}.properties.{}", path, name))?;
        object.fields.insert(
          name.clone(),
          Field {
            schema,
            required: required.contains(name.as_str()),
          },
        );
      }
    }
    Some(_) => {
      return Err(SchemaError::Malformed {
        path: path.to_string(),
        message: "'properties' must be an object".to_string(),
      });
    }
  }

  object.unknown_keys = match obj.get("additionalProperties") {
    Some(Value::Bool(false)) => UnknownKeys::Reject,
    Some(Value::Bool(true)) => UnknownKeys::Passthrough,
    _ => UnknownKeys::Strip,
  };

  Ok(object)
}

impl From<Schema> for Value {
  fn from(schema: Schema) -> Self {
    schema.to_json_schema()
  }
}

impl TryFrom<Value> for Schema {
  type Error = SchemaError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    Schema::from_json_schema(&value)
  }
}

impl serde::Serialize for Schema {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_json_schema().serialize(serializer)
  }
}

impl<'de> serde::Deserialize<'de> for Schema {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Schema::from_json_schema(&value).map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_object_schema() {
    let schema = Schema::from_json_schema(&json!({
      "type": "object",
      "properties": {
        "name": { "type": "string" },
        "tags": { "type": "array", "items": { "type": "string" } }
      },
      "required": ["name"]
    }))
    .unwrap();

    let Schema::Object(object) = &schema else {
      panic!("expected object schema");
    };
    assert!(object.fields["name"].required);
    assert!(!object.fields["tags"].required);
    assert_eq!(
      object.fields["tags"].schema,
      Schema::array(Schema::string())
    );
  }

  #[test]
  fn test_missing_type_is_any() {
    assert_eq!(Schema::from_json_schema(&json!({})).unwrap(), Schema::Any);
  }

  #[test]
  fn test_unsupported_type() {
    let err = Schema::from_json_schema(&json!({
      "type": "object",
      "properties": { "when": { "type": "date" } }
    }))
    .unwrap_err();
    assert!(matches!(
      err,
      SchemaError::UnsupportedType { ref path, ref type_name }
        if path == "$.properties.when" && type_name == "date"
    ));
  }

  #[test]
  fn test_type_array_is_malformed() {
    let err = Schema::from_json_schema(&json!({ "type": ["string", "null"] })).unwrap_err();
    assert!(matches!(err, SchemaError::Malformed { .. }));
  }

  #[test]
  fn test_non_string_required_entry_is_malformed() {
    let err = Schema::from_json_schema(&json!({
      "type": "object",
      "properties": { "a": { "type": "string" } },
      "required": ["a", 1]
    }))
    .unwrap_err();
    assert!(matches!(
      err,
      SchemaError::Malformed { ref path, .. } if path == "$"
    ));
  }

  #[test]
  fn test_render_strict_object() {
    let schema: Schema = Schema::object()
      .field("message", Schema::string())
      .strict()
      .into();
    let doc = schema.to_json_schema();
    assert_eq!(doc["type"], "object");
    assert_eq!(doc["properties"]["message"]["type"], "string");
    assert_eq!(doc["required"], json!(["message"]));
    assert_eq!(doc["additionalProperties"], false);
  }

  #[test]
  fn test_render_then_parse_preserves_shape() {
    let schema: Schema = Schema::object()
      .field("name", Schema::string())
      .optional("scores", Schema::array(Schema::number()))
      .into();
    let reparsed = Schema::from_json_schema(&schema.to_json_schema()).unwrap();
    assert_eq!(reparsed, schema);
  }
}
