//! Parsing of POST payloads into a flat field map

use serde_json::map::Entry;
use serde_json::{Map, Value};

use crate::error::{DeskError, Result};

/// Fields of a form or JSON object sent by the browser
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Fields(Map<String, Value>);

impl Fields {
    /// Parse a request body according to its content type
    ///
    /// JSON bodies must be objects. Any other content type is treated as
    /// `application/x-www-form-urlencoded`, where a repeated key becomes an
    /// array of its values and bracket syntax (`a[]=1`) is kept verbatim in
    /// the key. An empty body yields no fields.
    pub fn parse(content_type: Option<&str>, body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }

        let is_json = content_type
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"));

        if is_json {
            match serde_json::from_str(body) {
                Ok(Value::Object(map)) => Ok(Self(map)),
                Ok(_) => Err(DeskError::BadRequest("expected a JSON object".into())),
                Err(e) => Err(DeskError::BadRequest(e.to_string())),
            }
        } else {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)
                .map_err(|e| DeskError::BadRequest(e.to_string()))?;
            // Repeated keys collect their values into an array
            let mut map = Map::new();
            for (key, value) in pairs {
                match map.entry(key) {
                    Entry::Vacant(entry) => {
                        entry.insert(Value::String(value));
                    }
                    Entry::Occupied(mut entry) => match entry.get_mut() {
                        Value::Array(values) => values.push(Value::String(value)),
                        first => {
                            let previous = first.take();
                            *first = Value::Array(vec![previous, Value::String(value)]);
                        }
                    },
                }
            }
            Ok(Self(map))
        }
    }

    /// Get the raw value of a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a field as text if it is present and truthy
    pub fn required(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| truthy(v)).map(as_text)
    }

    /// Get a field as text, absent and `null` fields become empty strings
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(as_text).unwrap_or_default()
    }

    /// Whether a field is present and truthy
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(truthy)
    }
}

impl<const N: usize> From<[(&str, Value); N]> for Fields {
    fn from(pairs: [(&str, Value); N]) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
    }
}

/// Truthiness as browsers' scripts understand it
///
/// `null`, `false`, `0`, `NaN` and `""` are falsy. Everything else,
/// including the string `"false"` and empty arrays, is truthy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
