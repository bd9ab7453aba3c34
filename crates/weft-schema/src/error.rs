//! Schema error types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors raised while building a [`Schema`](crate::Schema) from a JSON Schema document.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
  /// The `type` keyword names a type this crate does not model.
  #[error("unsupported schema type '{type_name}' at {path}")]
  UnsupportedType { path: String, type_name: String },

  /// A keyword has the wrong JSON shape (e.g. `properties` is not an object).
  #[error("malformed schema at {path}: {message}")]
  Malformed { path: String, message: String },
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
  /// Location of the offending value, e.g. `$.items[2].name`.
  pub path: String,
  /// Human readable reason.
  pub message: String,
}

/// Every issue found while validating one value.
///
/// Validation does not stop at the first problem; callers get the full list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDetails {
  pub issues: Vec<Issue>,
}

impl ValidationDetails {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record an issue at `path`.
  pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
    self.issues.push(Issue {
      path: path.into(),
      message: message.into(),
    });
  }

  pub fn is_empty(&self) -> bool {
    self.issues.is_empty()
  }

  pub fn len(&self) -> usize {
    self.issues.len()
  }

  /// Whether any issue was recorded at exactly `path`.
  pub fn has_issue_at(&self, path: &str) -> bool {
    self.issues.iter().any(|issue| issue.path == path)
  }
}

impl fmt::Display for ValidationDetails {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.issues.is_empty() {
      return write!(f, "no issues");
    }
    for (i, issue) in self.issues.iter().enumerate() {
      if i > 0 {
        write!(f, "; ")?;
      }
      write!(f, "{}: {}", issue.path, issue.message)?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationDetails {}
