// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loosely-typed option bag as produced by a form or the command line, plus
// lenient field deserializers used by the per-tool configuration records.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{FolioError, Result};

/// Flat key/value option map with camelCase keys.
///
/// The bag is immutable from the caller's point of view: [`OptionsBag::with`]
/// returns a patched copy instead of mutating in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsBag {
    values: Map<String, Value>,
}

impl OptionsBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bag from a JSON object. Anything else is a validation error.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            other => Err(FolioError::Validation(format!(
                "options must be a JSON object, got {other}"
            ))),
        }
    }

    /// Parse a JSON document into a bag.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(text)?)
    }

    /// Return a copy of the bag with `key` set to `value`.
    pub fn with(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut values = self.values.clone();
        values.insert(key.to_owned(), value.into());
        Self { values }
    }

    /// Return a copy with a command-line style `key=value` assignment applied.
    ///
    /// The value is read as JSON when it parses (`90`, `true`, `[3,1,2]`) and
    /// as a plain string otherwise (`2,4`, `a4`).
    pub fn with_assignment(&self, assignment: &str) -> Result<Self> {
        let (key, raw) = assignment.split_once('=').ok_or_else(|| {
            FolioError::Validation(format!("expected key=value, got '{assignment}'"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(FolioError::Validation(format!(
                "empty option name in '{assignment}'"
            )));
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.into()));
        Ok(self.with(key, value))
    }

    /// Merge `other` on top of this bag; keys in `other` win.
    pub fn merged(&self, other: &OptionsBag) -> Self {
        let mut values = self.values.clone();
        for (key, value) in &other.values {
            values.insert(key.clone(), value.clone());
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Deserialize the bag into a typed per-tool configuration record.
    ///
    /// Records use `#[serde(default)]` so absent keys fall back to their
    /// defaults and unrelated keys are ignored.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|err| FolioError::Validation(format!("invalid options: {err}")))
    }
}

impl From<Map<String, Value>> for OptionsBag {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

/// Deserializers that accept the shapes a form actually sends: numbers as
/// strings, strings as numbers, `null` for "not set".
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn invalid<E: serde::de::Error>(what: &str, value: &Value) -> E {
        E::custom(format!("expected {what}, got {value}"))
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => return Err(invalid("a string", &other)),
        })
    }

    /// Empty strings and `null` become `None`.
    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let s = string(deserializer)?;
        Ok((!s.is_empty()).then_some(s))
    }

    pub fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let parsed = match &value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
            _ => None,
        };
        parsed.ok_or_else(|| invalid("an integer", &value))
    }

    pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let parsed = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .map(|f| f as f32)
            .ok_or_else(|| invalid("a number", &value))
    }

    pub fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" | "" => Ok(false),
                _ => Err(invalid("a boolean", &value)),
            },
            _ => Err(invalid("a boolean", &value)),
        }
    }

    /// Integer list from a JSON array or a comma-separated string.
    pub fn int_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let items: Vec<Value> = match value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            Value::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_owned()))
                .collect(),
            Value::Number(n) => vec![Value::Number(n)],
            other => return Err(invalid("a list of integers", &other)),
        };
        items
            .into_iter()
            .map(|item| {
                let parsed = match &item {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                parsed.ok_or_else(|| invalid("an integer", &item))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct Sample {
        #[serde(deserialize_with = "lenient::int")]
        rotation: i64,
        #[serde(deserialize_with = "lenient::string")]
        pages: String,
        #[serde(deserialize_with = "lenient::boolean")]
        remove_corrupted: bool,
        #[serde(deserialize_with = "lenient::int_list")]
        page_order: Vec<i64>,
        #[serde(deserialize_with = "lenient::opt_string")]
        password: Option<String>,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                rotation: 90,
                pages: String::new(),
                remove_corrupted: true,
                page_order: Vec::new(),
                password: None,
            }
        }
    }

    #[test]
    fn absent_keys_use_defaults() {
        let sample: Sample = OptionsBag::new().parse().unwrap();
        assert_eq!(sample.rotation, 90);
        assert!(sample.remove_corrupted);
        assert!(sample.password.is_none());
    }

    #[test]
    fn lenient_fields_accept_form_shapes() {
        let bag = OptionsBag::from_json(json!({
            "rotation": "180",
            "pages": 2,
            "removeCorrupted": "false",
            "pageOrder": "3, 1, 2",
            "password": "",
            "unrelated": {"nested": true}
        }))
        .unwrap();
        let sample: Sample = bag.parse().unwrap();
        assert_eq!(sample.rotation, 180);
        assert_eq!(sample.pages, "2");
        assert!(!sample.remove_corrupted);
        assert_eq!(sample.page_order, vec![3, 1, 2]);
        assert!(sample.password.is_none());
    }

    #[test]
    fn bad_value_is_validation_error() {
        let bag = OptionsBag::new().with("rotation", "sideways");
        let result: Result<Sample> = bag.parse();
        assert!(matches!(result, Err(FolioError::Validation(_))));
    }

    #[test]
    fn with_does_not_mutate_original() {
        let base = OptionsBag::new().with("rotation", 90);
        let patched = base.with("rotation", 270);
        assert_eq!(base.get("rotation"), Some(&json!(90)));
        assert_eq!(patched.get("rotation"), Some(&json!(270)));
    }

    #[test]
    fn assignment_parses_json_or_string() {
        let bag = OptionsBag::new()
            .with_assignment("rotation=90")
            .unwrap()
            .with_assignment("pages=2,4")
            .unwrap()
            .with_assignment("pageOrder=[2,1]")
            .unwrap();
        assert_eq!(bag.get("rotation"), Some(&json!(90)));
        assert_eq!(bag.get("pages"), Some(&json!("2,4")));
        assert_eq!(bag.get("pageOrder"), Some(&json!([2, 1])));
        assert!(OptionsBag::new().with_assignment("novalue").is_err());
    }

    #[test]
    fn non_object_json_rejected() {
        assert!(OptionsBag::from_json(json!([1, 2])).is_err());
        assert!(OptionsBag::from_json(Value::Null).unwrap().is_empty());
    }
}
