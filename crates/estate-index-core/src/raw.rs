//! Path-aware accessors over loosely-typed raw listing JSON.
//!
//! Raw records drift across exports: ids arrive as `200001` or `"200001"`,
//! prices as `85000000` or `"85,000,000"`, nested groups are sometimes
//! `null`. [`RawObject`] centralizes those coercions and tracks the dotted
//! path of every field so errors point at the exact offending value.

use serde_json::{Map, Value};

use crate::error::RecordError;

/// A borrowed JSON object plus the path it was reached through.
#[derive(Debug, Clone)]
pub struct RawObject<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> RawObject<'a> {
    /// Wrap a top-level record.
    pub fn root(value: &'a Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(map) => Ok(Self {
                map,
                path: String::new(),
            }),
            _ => Err(RecordError::NotAnObject),
        }
    }

    /// Dotted path of `key` below this object.
    pub fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    /// Whether `key` is present with a non-null value.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Non-null value at `key`.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// Nested object at `key`; `Ok(None)` if absent or null.
    pub fn object(&self, key: &str) -> Result<Option<RawObject<'a>>, RecordError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(RawObject {
                map,
                path: self.path_of(key),
            })),
            Some(_) => Err(RecordError::invalid(self.path_of(key), "object")),
        }
    }

    /// Required nested object at `key`.
    pub fn object_req(&self, key: &str) -> Result<RawObject<'a>, RecordError> {
        self.object(key)?
            .ok_or_else(|| RecordError::missing(self.path_of(key)))
    }

    /// Array of objects at `key`, each wrapped with an indexed path.
    pub fn objects(&self, key: &str) -> Result<Vec<RawObject<'a>>, RecordError> {
        let Some(value) = self.get(key) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| RecordError::invalid(self.path_of(key), "array"))?;
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(RawObject {
                    map,
                    path: format!("{}[{}]", self.path_of(key), i),
                }),
                _ => Err(RecordError::invalid(
                    format!("{}[{}]", self.path_of(key), i),
                    "object",
                )),
            })
            .collect()
    }

    /// Optional string; numbers are rendered, blank strings become `None`.
    pub fn str_opt(&self, key: &str) -> Result<Option<String>, RecordError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => scalar_to_string(value)
                .map(|s| Some(s).filter(|s| !s.is_empty()))
                .ok_or_else(|| RecordError::invalid(self.path_of(key), "string")),
        }
    }

    /// Required non-blank string.
    pub fn str_req(&self, key: &str) -> Result<String, RecordError> {
        self.str_opt(key)?
            .ok_or_else(|| RecordError::missing(self.path_of(key)))
    }

    /// Optional non-negative integer (accepts `"85,000,000"` and `"¥150,000"`).
    ///
    /// Integers are read exactly; the float path only handles values such
    /// as `1.2e7` and rejects anything past 2^53.
    pub fn u64_opt(&self, key: &str) -> Result<Option<u64>, RecordError> {
        let exact = match self.get(key) {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => clean_number(s).parse::<u64>().ok(),
            _ => None,
        };
        if exact.is_some() {
            return Ok(exact);
        }
        match self.f64_opt(key)? {
            None => Ok(None),
            Some(n) if n < 0.0 => Err(RecordError::out_of_range(
                self.path_of(key),
                n,
                "must be non-negative",
            )),
            Some(n) if n.fract() != 0.0 => Err(RecordError::invalid(self.path_of(key), "integer")),
            Some(n) if n > MAX_EXACT_FLOAT_INT => Err(RecordError::out_of_range(
                self.path_of(key),
                n,
                "too large for an exact integer",
            )),
            Some(n) => Ok(Some(n as u64)),
        }
    }

    /// Required non-negative integer.
    pub fn u64_req(&self, key: &str) -> Result<u64, RecordError> {
        self.u64_opt(key)?
            .ok_or_else(|| RecordError::missing(self.path_of(key)))
    }

    /// Optional float (numbers or numeric strings).
    pub fn f64_opt(&self, key: &str) -> Result<Option<f64>, RecordError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| RecordError::invalid(self.path_of(key), "number")),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => parse_number(s)
                .map(Some)
                .ok_or_else(|| RecordError::invalid(self.path_of(key), "number")),
            Some(_) => Err(RecordError::invalid(self.path_of(key), "number")),
        }
    }

    /// Optional boolean; accepts `"yes"/"no"` and `"true"/"false"` strings.
    pub fn bool_opt(&self, key: &str) -> Result<Option<bool>, RecordError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "required" => Ok(Some(true)),
                "false" | "no" | "n" | "not required" => Ok(Some(false)),
                "" => Ok(None),
                _ => Err(RecordError::invalid(self.path_of(key), "boolean")),
            },
            Some(_) => Err(RecordError::invalid(self.path_of(key), "boolean")),
        }
    }

    /// List of strings at `key`. Absent → empty; a lone string → one item;
    /// blank items are dropped.
    pub fn str_list(&self, key: &str) -> Result<Vec<String>, RecordError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    if item.is_null() {
                        continue;
                    }
                    let s = scalar_to_string(item).ok_or_else(|| {
                        RecordError::invalid(format!("{}[{}]", self.path_of(key), i), "string")
                    })?;
                    if !s.is_empty() {
                        out.push(s);
                    }
                }
                Ok(out)
            }
            Some(value) => scalar_to_string(value)
                .map(|s| if s.is_empty() { Vec::new() } else { vec![s] })
                .ok_or_else(|| RecordError::invalid(self.path_of(key), "array of strings")),
        }
    }
}

/// Render a JSON scalar as a trimmed string. Objects and arrays yield `None`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a human-formatted number: thousands separators and a leading
/// yen sign are tolerated, units are not.
pub fn parse_number(s: &str) -> Option<f64> {
    clean_number(s).parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Largest integer an `f64` holds without rounding (2^53).
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

fn clean_number(s: &str) -> String {
    let cleaned: String = s
        .trim()
        .trim_start_matches('¥')
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths_nest() {
        let v = json!({"address": {"latitude": "north"}});
        let root = RawObject::root(&v).unwrap();
        let addr = root.object_req("address").unwrap();
        let err = addr.f64_opt("latitude").unwrap_err();
        assert_eq!(err.path(), "address.latitude");
    }

    #[test]
    fn test_numeric_strings_coerce() {
        let v = json!({"id": "200001", "total": "85,000,000", "rent": "¥150,000", "blank": " "});
        let root = RawObject::root(&v).unwrap();
        assert_eq!(root.u64_req("id").unwrap(), 200001);
        assert_eq!(root.u64_opt("total").unwrap(), Some(85_000_000));
        assert_eq!(root.u64_opt("rent").unwrap(), Some(150_000));
        assert_eq!(root.u64_opt("blank").unwrap(), None);
    }

    #[test]
    fn test_large_integers_are_exact() {
        let v = json!({
            "id": 9_007_199_254_740_993_u64,
            "max": u64::MAX,
            "text": "9,007,199,254,740,993",
            "sci": 1.2e7,
            "huge": 1e20
        });
        let root = RawObject::root(&v).unwrap();
        assert_eq!(root.u64_req("id").unwrap(), 9_007_199_254_740_993);
        assert_eq!(root.u64_req("max").unwrap(), u64::MAX);
        assert_eq!(root.u64_opt("text").unwrap(), Some(9_007_199_254_740_993));
        assert_eq!(root.u64_opt("sci").unwrap(), Some(12_000_000));
        assert!(matches!(
            root.u64_opt("huge"),
            Err(RecordError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_units_are_rejected() {
        let v = json!({"m2": "35.2 m²"});
        let root = RawObject::root(&v).unwrap();
        assert!(matches!(
            root.f64_opt("m2"),
            Err(RecordError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_negative_integer_out_of_range() {
        let v = json!({"fee": -5});
        let root = RawObject::root(&v).unwrap();
        assert!(matches!(
            root.u64_opt("fee"),
            Err(RecordError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_null_is_absent() {
        let v = json!({"contract": null, "name": null});
        let root = RawObject::root(&v).unwrap();
        assert!(root.object("contract").unwrap().is_none());
        assert_eq!(
            root.str_req("name").unwrap_err(),
            RecordError::missing("name")
        );
    }

    #[test]
    fn test_str_list_shapes() {
        let v = json!({"a": ["x", " ", null, 3], "b": "solo", "c": {"k": 1}});
        let root = RawObject::root(&v).unwrap();
        assert_eq!(root.str_list("a").unwrap(), vec!["x", "3"]);
        assert_eq!(root.str_list("b").unwrap(), vec!["solo"]);
        assert_eq!(root.str_list("missing").unwrap(), Vec::<String>::new());
        assert!(root.str_list("c").is_err());
    }

    #[test]
    fn test_objects_are_indexed() {
        let v = json!({"stations": [{"a": 1}, "oops"]});
        let root = RawObject::root(&v).unwrap();
        let err = root.objects("stations").unwrap_err();
        assert_eq!(err.path(), "stations[1]");
    }

    #[test]
    fn test_bool_strings() {
        let v = json!({"a": "Yes", "b": false, "c": "maybe"});
        let root = RawObject::root(&v).unwrap();
        assert_eq!(root.bool_opt("a").unwrap(), Some(true));
        assert_eq!(root.bool_opt("b").unwrap(), Some(false));
        assert!(root.bool_opt("c").is_err());
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(
            RawObject::root(&json!([1, 2])).unwrap_err(),
            RecordError::NotAnObject
        );
    }
}
