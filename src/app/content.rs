//! Content entries: what the worker should find at each port.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::PortNumber;
use crate::error::{Error, Result};

pub const FIELD_DISPLAY_NAME: &str = "display_name";
pub const FIELD_NAME: &str = "name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_IMAGE_PATH: &str = "image_path";

/// Content map keyed by port number.
pub type ContentMap = BTreeMap<PortNumber, ContentEntry>;

/// Free-form named fields describing a port's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContentEntry {
    fields: BTreeMap<String, String>,
}

/// Documents accept the same scalar fields as [`ContentEntry::from_json`].
impl<'de> Deserialize<'de> for ContentEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}

impl ContentEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Build an entry from an untyped payload (tag write, RPC body).
    ///
    /// The payload must be an object whose values are scalars; numbers and
    /// booleans are stored in their textual form, `null` drops the field.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(obj) = value else {
            return Err(Error::invalid(format!(
                "content must be an object, got {}",
                json_kind(value)
            )));
        };
        let mut entry = Self::new();
        for (key, v) in obj {
            match v {
                Value::String(s) => entry.set(key, s),
                Value::Number(n) => entry.set(key, &n.to_string()),
                Value::Bool(b) => entry.set(key, &b.to_string()),
                Value::Null => {}
                other => {
                    return Err(Error::invalid(format!(
                        "content field '{key}' must be a scalar, got {}",
                        json_kind(other)
                    )));
                }
            }
        }
        Ok(entry)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_owned(), value.to_owned());
    }

    pub fn name(&self) -> Option<&str> {
        self.get(FIELD_NAME)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.get(FIELD_DISPLAY_NAME)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Placeholder used when a projection asks for a field a port lacks.
pub fn field_placeholder(key: &str) -> &'static str {
    if key == FIELD_DISPLAY_NAME { "?" } else { "" }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
