//! Validation of nested payloads through the public API.

use serde_json::json;
use weft_schema::{Schema, ValidationDetails};

fn document_schema() -> Schema {
  Schema::from_json_schema(&json!({
    "type": "object",
    "properties": {
      "title": { "type": "string" },
      "chunks": {
        "type": "array",
        "items": {
          "type": "object",
          "properties": {
            "text": { "type": "string" },
            "index": { "type": "integer" }
          },
          "required": ["text", "index"]
        }
      }
    },
    "required": ["chunks"]
  }))
  .expect("schema should parse")
}

#[test]
fn test_nested_valid_payload_is_normalized() {
  let value = document_schema()
    .validate(&json!({
      "chunks": [
        { "text": "a", "index": 0, "score": 0.5 },
        { "text": "b", "index": 1 }
      ]
    }))
    .expect("payload should validate");

  assert_eq!(
    value,
    json!({ "chunks": [{ "text": "a", "index": 0 }, { "text": "b", "index": 1 }] })
  );
}

#[test]
fn test_nested_issue_paths() {
  let details: ValidationDetails = document_schema()
    .validate(&json!({
      "title": 7,
      "chunks": [{ "text": "a" }, { "text": 1, "index": 1 }]
    }))
    .unwrap_err();

  assert!(details.has_issue_at("$.title"));
  assert!(details.has_issue_at("$.chunks[0].index"));
  assert!(details.has_issue_at("$.chunks[1].text"));
  assert_eq!(details.len(), 3);
}

#[test]
fn test_details_display() {
  let schema: Schema = Schema::object().field("name", Schema::string()).into();
  let details = schema.validate(&json!({})).unwrap_err();
  assert_eq!(details.to_string(), "$.name: required field is missing");
}

#[test]
fn test_schema_serde_roundtrip_through_json_schema() {
  let schema: Schema = Schema::object()
    .field("message", Schema::string())
    .into();
  let encoded = serde_json::to_value(&schema).unwrap();
  assert_eq!(encoded["properties"]["message"]["type"], "string");

  let decoded: Schema = serde_json::from_value(encoded).unwrap();
  assert_eq!(decoded, schema);
}
