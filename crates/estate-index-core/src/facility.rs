//! Nearby-facility normalization.
//!
//! Facilities arrive in three shapes across exports:
//!
//! ```text
//! ["Lawson (3 min walk)", "Yoyogi Park"]            list of free text
//! {"Supermarket": ["200m", "450m"], "Park": []}     key → list of distances
//! {"Convenience store": "1 min", "Hospital": 2}     key → scalar
//! ```
//!
//! All three become [`Facility`] values with a category drawn from the
//! keyword table in [`FacilityCategory::classify`].

use serde_json::Value;

use crate::error::RecordError;
use crate::models::Facility;
use crate::raw::scalar_to_string;
use crate::vocab::FacilityCategory;

/// Normalize one raw facilities value found at `path`.
pub fn normalize_facilities(value: &Value, path: &str) -> Result<Vec<Facility>, RecordError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Null => {}
                    Value::Object(obj) => {
                        out.push(from_structured(obj, &format!("{}[{}]", path, i))?);
                    }
                    other => {
                        let text = scalar_to_string(other).ok_or_else(|| {
                            RecordError::invalid(format!("{}[{}]", path, i), "string")
                        })?;
                        if !text.is_empty() {
                            out.push(from_free_text(&text));
                        }
                    }
                }
            }
            Ok(out)
        }
        Value::Object(map) => {
            let mut out = Vec::new();
            for (key, entry) in map {
                let name = key.trim();
                if name.is_empty() {
                    continue;
                }
                let entry_path = format!("{}.{}", path, key);
                match entry {
                    Value::Array(distances) => {
                        let distances: Vec<String> = distances
                            .iter()
                            .filter_map(scalar_to_string)
                            .filter(|d| !d.is_empty())
                            .collect();
                        if distances.is_empty() {
                            out.push(facility(name, None, None));
                        }
                        for distance in distances {
                            out.push(facility(name, Some(distance), None));
                        }
                    }
                    Value::Null => out.push(facility(name, None, None)),
                    Value::Object(_) => return Err(RecordError::invalid(entry_path, "list or scalar")),
                    scalar => {
                        let text = scalar_to_string(scalar).unwrap_or_default();
                        let text = Some(text).filter(|t| !t.is_empty());
                        if text.as_deref().is_some_and(looks_like_distance) {
                            out.push(facility(name, text, None));
                        } else {
                            out.push(facility(name, None, text));
                        }
                    }
                }
            }
            Ok(out)
        }
        _ => Err(RecordError::invalid(path, "list or mapping")),
    }
}

/// Already-structured facility objects (`{"name", "category", "distance"}`)
/// from newer exports. A provided category is re-derived from the keyword
/// table so that the closed vocabulary stays authoritative.
fn from_structured(
    obj: &serde_json::Map<String, Value>,
    path: &str,
) -> Result<Facility, RecordError> {
    let field = |k: &str| obj.get(k).and_then(scalar_to_string).filter(|s| !s.is_empty());
    let name = field("name").ok_or_else(|| RecordError::missing(format!("{}.name", path)))?;
    let hint = field("category").unwrap_or_default();
    let category = match FacilityCategory::classify(&hint) {
        FacilityCategory::Other => FacilityCategory::classify(&name),
        known => known,
    };
    Ok(Facility {
        category,
        name,
        distance_description: field("distance_description").or_else(|| field("distance")),
        additional_info: field("additional_info"),
    })
}

fn from_free_text(text: &str) -> Facility {
    let (name, distance) = split_trailing_distance(text);
    Facility {
        category: FacilityCategory::classify(name),
        name: name.to_string(),
        distance_description: distance.map(str::to_string),
        additional_info: None,
    }
}

fn facility(name: &str, distance: Option<String>, info: Option<String>) -> Facility {
    Facility {
        category: FacilityCategory::classify(name),
        name: name.to_string(),
        distance_description: distance,
        additional_info: info,
    }
}

/// `"Lawson (3 min walk)"` → `("Lawson", Some("3 min walk"))`.
///
/// Only a trailing parenthesized segment containing a digit counts as a
/// distance; `"Cafe (Open 24h)"`-style notes stay part of the name unless
/// they carry a number, which is accepted as a known imprecision.
fn split_trailing_distance(text: &str) -> (&str, Option<&str>) {
    let trimmed = text.trim();
    if let Some(inner) = trimmed.strip_suffix(')') {
        if let Some(open) = inner.rfind('(') {
            let candidate = inner[open + 1..].trim();
            let name = inner[..open].trim();
            if !name.is_empty() && looks_like_distance(candidate) {
                return (name, Some(candidate));
            }
        }
    }
    (trimmed, None)
}

fn looks_like_distance(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Unique category labels of `facilities`, in first-seen order.
pub fn category_labels(facilities: &[Facility]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for f in facilities {
        let label = f.category.as_str();
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    labels
}
