//! Serde types matching the admin backend's responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::Cacheable;

// ============================================================================
// Collection endpoint
// ============================================================================

/// One page of a collection read: `{ data: [...], total: n }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  #[serde(default = "Vec::new")]
  pub data: Vec<T>,
  #[serde(default)]
  pub total: u64,
}

impl<T> Page<T> {
  pub fn new(data: Vec<T>, total: u64) -> Self {
    Self { data, total }
  }

  pub fn empty() -> Self {
    Self {
      data: Vec::new(),
      total: 0,
    }
  }
}

// ============================================================================
// Schema-less entity
// ============================================================================

/// An entity whose schema this client does not know.
///
/// Field layouts differ per resource (skills, levels, careers, roles, ...),
/// so the console treats every entity as a JSON object and only relies on
/// its `id` and a handful of display fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

/// Fields tried in order when picking a display label.
const LABEL_FIELDS: &[&str] = &["name", "title", "label", "code", "email", "username"];

impl Record {
  /// The entity id rendered as a string (numeric ids included).
  pub fn id(&self) -> Option<String> {
    match self.0.get("id")? {
      Value::String(s) => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    }
  }

  pub fn get(&self, field: &str) -> Option<&Value> {
    self.0.get(field)
  }

  /// Best-effort human readable label.
  pub fn label(&self) -> String {
    LABEL_FIELDS
      .iter()
      .find_map(|f| self.0.get(*f).and_then(Value::as_str))
      .map(String::from)
      .unwrap_or_else(|| Value::Object(self.0.clone()).to_string())
  }
}

impl From<Value> for Record {
  fn from(value: Value) -> Self {
    match value {
      Value::Object(map) => Record(map),
      other => {
        let mut map = Map::new();
        map.insert("value".to_string(), other);
        Record(map)
      }
    }
  }
}

impl Cacheable for Record {
  fn cache_key(&self) -> Option<String> {
    self.id()
  }
}
