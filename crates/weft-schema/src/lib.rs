//! Weft Schema
//!
//! Runtime schemas used at every step boundary. A [`Schema`] is a plain value:
//! it can be built in code, parsed from a JSON Schema document, and rendered
//! back to JSON Schema for discovery.
//!
//! ```ignore
//! use weft_schema::Schema;
//!
//! let schema: Schema = Schema::object().field("name", Schema::string()).into();
//! let value = schema.validate(&serde_json::json!({ "name": "Ada" }))?;
//! ```

mod error;
mod json_schema;
mod schema;

pub use error::{Issue, SchemaError, ValidationDetails};
pub use schema::{Field, ObjectSchema, Schema, UnknownKeys};
