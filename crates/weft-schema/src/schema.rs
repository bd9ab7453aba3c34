//! The [`Schema`] value and its validator.
//!
//! A schema describes the structural shape of a JSON payload. `validate`
//! walks the payload and returns a normalized copy:
//! - object keys the schema does not declare are dropped (unless the object
//!   schema is `passthrough`, or rejected if it is `strict`)
//! - everything else is returned as given
//!
//! All issues are collected before failing, each tagged with a JSON path.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ValidationDetails;

const ROOT: &str = "$";

/// A runtime shape for JSON payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
  /// Accepts any value unchanged.
  Any,
  String,
  Number,
  Integer,
  Boolean,
  Null,
  /// Homogeneous array of the inner schema.
  Array(Box<Schema>),
  Object(ObjectSchema),
}

/// How an object schema treats keys it does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKeys {
  /// Drop them from the validated value.
  #[default]
  Strip,
  /// Keep them untouched.
  Passthrough,
  /// Report each one as an issue.
  Reject,
}

/// A declared object field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  pub schema: Schema,
  pub required: bool,
}

/// A record with named, typed fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
  pub fields: BTreeMap<String, Field>,
  pub unknown_keys: UnknownKeys,
}

impl ObjectSchema {
  /// Declare a required field.
  pub fn field(mut self, name: impl Into<String>, schema: Schema) -> Self {
    self.fields.insert(
      name.into(),
      Field {
        schema,
        required: true,
      },
    );
    self
  }

  /// Declare an optional field.
  pub fn optional(mut self, name: impl Into<String>, schema: Schema) -> Self {
    self.fields.insert(
      name.into(),
      Field {
        schema,
        required: false,
      },
    );
    self
  }

  /// Keep undeclared keys in the validated value.
  pub fn passthrough(mut self) -> Self {
    self.unknown_keys = UnknownKeys::Passthrough;
    self
  }

  /// Fail validation on undeclared keys.
  pub fn strict(mut self) -> Self {
    self.unknown_keys = UnknownKeys::Reject;
    self
  }
}

impl From<ObjectSchema> for Schema {
  fn from(object: ObjectSchema) -> Self {
    Schema::Object(object)
  }
}

impl Schema {
  /// Start an object schema with no fields.
  ///
  /// An empty object schema accepts any object and returns `{}`.
  pub fn object() -> ObjectSchema {
    ObjectSchema::default()
  }

  pub fn string() -> Self {
    Schema::String
  }

  pub fn number() -> Self {
    Schema::Number
  }

  pub fn integer() -> Self {
    Schema::Integer
  }

  pub fn boolean() -> Self {
    Schema::Boolean
  }

  pub fn array(items: Schema) -> Self {
    Schema::Array(Box::new(items))
  }

  /// Short name used in error messages and JSON Schema output.
  pub fn type_name(&self) -> &'static str {
    match self {
      Schema::Any => "any",
      Schema::String => "string",
      Schema::Number => "number",
      Schema::Integer => "integer",
      Schema::Boolean => "boolean",
      Schema::Null => "null",
      Schema::Array(_) => "array",
      Schema::Object(_) => "object",
    }
  }

  /// Validate `value`, returning the normalized value or every issue found.
  pub fn validate(&self, value: &Value) -> Result<Value, ValidationDetails> {
    let mut details = ValidationDetails::new();
    let normalized = self.check(value, ROOT, &mut details);
    if details.is_empty() {
      Ok(normalized)
    } else {
      Err(details)
    }
  }

  /// Validate and deserialize into `T`.
  ///
  /// A deserialization failure after successful validation is reported as a
  /// root-level issue.
  pub fn parse<T: DeserializeOwned>(&self, value: &Value) -> Result<T, ValidationDetails> {
    let normalized = self.validate(value)?;
    serde_json::from_value(normalized).map_err(|e| {
      let mut details = ValidationDetails::new();
      details.push(ROOT, e.to_string());
      details
    })
  }

  fn check(&self, value: &Value, path: &str, details: &mut ValidationDetails) -> Value {
    match (self, value) {
      (Schema::Any, _) => value.clone(),
      (Schema::String, Value::String(_)) => value.clone(),
      (Schema::Number, Value::Number(_)) => value.clone(),
      (Schema::Integer, Value::Number(n)) if is_integral(n) => value.clone(),
      (Schema::Integer, Value::Number(_)) => {
        details.push(path, format!("expected integer, got {}", value));
        Value::Null
      }
      (Schema::Boolean, Value::Bool(_)) => value.clone(),
      (Schema::Null, Value::Null) => Value::Null,
      (Schema::Array(items), Value::Array(elements)) => Value::Array(
        elements
          .iter()
          .enumerate()
          .map(|(i, element)| items.check(element, &format!("{}[{}]", path, i), details))
          .collect(),
      ),
      (Schema::Object(object), Value::Object(map)) => object.check(map, path, details),
      _ => {
        details.push(
          path,
          format!("expected {}, got {}", self.type_name(), json_type(value)),
        );
        Value::Null
      }
    }
  }
}

impl ObjectSchema {
  fn check(
    &self,
    map: &serde_json::Map<String, Value>,
    path: &str,
    details: &mut ValidationDetails,
  ) -> Value {
    let mut out = serde_json::Map::new();

    for (name, field) in &self.fields {
      let field_path = format!("{}.{}", path, name);
      match map.get(name) {
        Some(value) => {
          let checked = field.schema.check(value, &field_path, details);
          out.insert(name.clone(), checked);
        }
        None if field.required => details.push(field_path, "required field is missing"),
        None => {}
      }
    }

    for (key, value) in map {
      if self.fields.contains_key(key) {
        continue;
      }
      match self.unknown_keys {
        UnknownKeys::Strip => {}
        UnknownKeys::Passthrough => {
          out.insert(key.clone(), value.clone());
        }
        UnknownKeys::Reject => {
          details.push(format!("{}.{}", path, key), "unrecognized key");
        }
      }
    }

    Value::Object(out)
  }
}

fn is_integral(n: &serde_json::Number) -> bool {
  if n.is_i64() || n.is_u64() {
    return true;
  }
  n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

fn json_type(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn greeting() -> Schema {
    Schema::object()
      .field("name", Schema::string())
      .optional("age", Schema::integer())
      .into()
  }

  #[test]
  fn test_valid_object() {
    let value = greeting().validate(&json!({"name": "Ada", "age": 36})).unwrap();
    assert_eq!(value, json!({"name": "Ada", "age": 36}));
  }

  #[test]
  fn test_missing_required_field() {
    let details = greeting().validate(&json!({})).unwrap_err();
    assert_eq!(details.len(), 1);
    assert!(details.has_issue_at("$.name"));
  }

  #[test]
  fn test_unknown_keys_stripped_by_default() {
    let value = greeting()
      .validate(&json!({"name": "Ada", "extra": true}))
      .unwrap();
    assert_eq!(value, json!({"name": "Ada"}));
  }

  #[test]
  fn test_passthrough_keeps_unknown_keys() {
    let schema: Schema = Schema::object()
      .field("name", Schema::string())
      .passthrough()
      .into();
    let value = schema.validate(&json!({"name": "Ada", "extra": 1})).unwrap();
    assert_eq!(value["extra"], 1);
  }

  #[test]
  fn test_strict_rejects_unknown_keys() {
    let schema: Schema = Schema::object().strict().into();
    let details = schema.validate(&json!({"extra": 1})).unwrap_err();
    assert!(details.has_issue_at("$.extra"));
  }

  #[test]
  fn test_collects_all_issues() {
    let schema: Schema = Schema::object()
      .field("a", Schema::string())
      .field("b", Schema::boolean())
      .field("c", Schema::array(Schema::number()))
      .into();
    let details = schema
      .validate(&json!({"a": 1, "b": "no", "c": [1, "two", 3]}))
      .unwrap_err();
    assert_eq!(details.len(), 3);
    assert!(details.has_issue_at("$.a"));
    assert!(details.has_issue_at("$.b"));
    assert!(details.has_issue_at("$.c[1]"));
  }

  #[test]
  fn test_integer_accepts_integral_float() {
    assert!(Schema::integer().validate(&json!(3.0)).is_ok());
    assert!(Schema::integer().validate(&json!(3.5)).is_err());
  }

  #[test]
  fn test_empty_object_schema_rejects_non_objects() {
    let schema: Schema = Schema::object().into();
    assert_eq!(schema.validate(&json!({"x": 1})).unwrap(), json!({}));
    assert!(schema.validate(&json!("nope")).is_err());
  }

  #[test]
  fn test_parse_typed() {
    #[derive(serde::Deserialize)]
    struct Greeting {
      name: String,
    }
    let parsed: Greeting = greeting().parse(&json!({"name": "Ada"})).unwrap();
    assert_eq!(parsed.name, "Ada");
  }
}
