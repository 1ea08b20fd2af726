//! Vector-store payloads and the payload index schema.
//!
//! A point's payload is the canonical record serialized as-is, merged
//! with flat top-level fields that the filter builder targets. Nested
//! record fields are awkward to index (`price.total` vs `total` depending
//! on property type), so every filterable value is lifted to one stable
//! key regardless of listing kind.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::derive::{is_pet_friendly, normalize_ward, parse_floor, DerivedFields};
use crate::models::PropertyRecord;
use crate::vocab::PropertyType;

/// One record ready for embedding and upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    pub id: u64,
    /// Text submitted to the embedding provider.
    pub text: String,
    pub payload: Value,
}

/// Payload index kinds supported by the vector store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadIndexKind {
    Keyword,
    Integer,
    Float,
    Bool,
    Geo,
}

impl PayloadIndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadIndexKind::Keyword => "keyword",
            PayloadIndexKind::Integer => "integer",
            PayloadIndexKind::Float => "float",
            PayloadIndexKind::Bool => "bool",
            PayloadIndexKind::Geo => "geo",
        }
    }
}

/// Fields indexed for filtering, with their kinds.
pub const PAYLOAD_INDEXES: &[(&str, PayloadIndexKind)] = &[
    ("property_type", PayloadIndexKind::Keyword),
    ("category", PayloadIndexKind::Keyword),
    ("total", PayloadIndexKind::Integer),
    ("monthly_total", PayloadIndexKind::Integer),
    ("short_term_monthly_total", PayloadIndexKind::Integer),
    ("management_fee", PayloadIndexKind::Integer),
    ("guarantor_service", PayloadIndexKind::Integer),
    ("fire_insurance", PayloadIndexKind::Integer),
    ("area_m2", PayloadIndexKind::Float),
    ("ward", PayloadIndexKind::Keyword),
    ("pet_friendly", PayloadIndexKind::Bool),
    ("floor_number", PayloadIndexKind::Integer),
    ("year_built", PayloadIndexKind::Integer),
    ("layout", PayloadIndexKind::Keyword),
    ("land_rights", PayloadIndexKind::Keyword),
    ("status", PayloadIndexKind::Keyword),
    ("building_id", PayloadIndexKind::Keyword),
    ("contract_length", PayloadIndexKind::Keyword),
    ("short_term_duration", PayloadIndexKind::Keyword),
    ("japanese_required", PayloadIndexKind::Bool),
    ("min_walk_time", PayloadIndexKind::Integer),
    ("nearest_stations[].name", PayloadIndexKind::Keyword),
    ("nearest_stations[].lines", PayloadIndexKind::Keyword),
    ("amenities", PayloadIndexKind::Keyword),
    ("location", PayloadIndexKind::Geo),
];

impl IndexDocument {
    /// Build the embedding text and payload for `record`.
    pub fn from_record(record: &PropertyRecord) -> serde_json::Result<Self> {
        let derived = DerivedFields::compute(record);
        let text = if derived.search_keywords.is_empty() {
            derived.semantic_description.clone()
        } else {
            format!(
                "{} Keywords: {}",
                derived.semantic_description,
                derived.search_keywords.join(", ")
            )
        };
        let mut payload = match serde_json::to_value(record)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in filter_fields(record) {
            payload.insert(key.to_string(), value);
        }
        payload.insert(
            "semantic_description".into(),
            Value::String(derived.semantic_description),
        );
        payload.insert("search_keywords".into(), json!(derived.search_keywords));
        payload.insert("highlights".into(), serde_json::to_value(&derived.highlights)?);
        payload.insert(
            "accessibility".into(),
            serde_json::to_value(&derived.accessibility)?,
        );
        Ok(Self {
            id: record.id,
            text,
            payload: Value::Object(payload),
        })
    }
}

/// Flat filter fields. Absent values are omitted rather than written as
/// `null`, so range clauses simply do not match them.
pub fn filter_fields(record: &PropertyRecord) -> Vec<(&'static str, Value)> {
    let terms = &record.price.terms;
    let property_type = record.property_type();
    let initial = record.initial_cost.as_ref();
    let contract_length = record.contract.as_ref().and_then(|c| c.length.clone());

    let mut fields: Vec<(&'static str, Option<Value>)> = vec![
        ("property_type", Some(json!(property_type.as_str()))),
        ("category", Some(json!(record.category.as_str()))),
        ("total", terms.total().map(|v| json!(v))),
        ("monthly_total", terms.monthly_total().map(|v| json!(v))),
        (
            "short_term_monthly_total",
            terms.short_term_monthly_total().map(|v| json!(v)),
        ),
        ("management_fee", terms.management_fee().map(|v| json!(v))),
        (
            "guarantor_service",
            initial.and_then(|c| c.guarantor_service).map(|v| json!(v)),
        ),
        (
            "fire_insurance",
            initial.and_then(|c| c.fire_insurance).map(|v| json!(v)),
        ),
        ("area_m2", Some(json!(record.area.m2))),
        (
            "ward",
            record.address.ward.as_deref().map(|w| json!(normalize_ward(w))),
        ),
        ("pet_friendly", Some(json!(is_pet_friendly(&record.amenities)))),
        (
            "floor_number",
            record.floor.as_deref().and_then(parse_floor).map(|v| json!(v)),
        ),
        ("year_built", record.year_built.map(|v| json!(v))),
        ("layout", record.layout().map(|v| json!(v))),
        (
            "land_rights",
            record
                .details
                .as_ref()
                .and_then(|d| d.land_rights.as_deref())
                .map(|v| json!(v)),
        ),
        ("status", record.status.map(|s| json!(s.as_str()))),
        ("building_id", record.building_id.as_deref().map(|v| json!(v))),
        ("contract_length", contract_length.clone().map(Value::String)),
        (
            "short_term_duration",
            contract_length
                .filter(|_| property_type == PropertyType::ShortTerm)
                .map(Value::String),
        ),
        (
            "japanese_required",
            record
                .requirements
                .as_ref()
                .and_then(|r| r.japanese_required)
                .map(|v| json!(v)),
        ),
        (
            "min_walk_time",
            record
                .stations
                .iter()
                .map(|s| s.walk_time_min)
                .min()
                .map(|v| json!(v)),
        ),
        (
            "nearest_stations",
            Some(Value::Array(
                record
                    .stations
                    .iter()
                    .map(|s| {
                        json!({
                            "name": s.station_name,
                            "walk_time_min": s.walk_time_min,
                            "lines": s.lines.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
                            "accessibility_score": s.accessibility_score(),
                        })
                    })
                    .collect(),
            )),
        ),
        ("address_full", Some(json!(record.address.full))),
    ];
    if let Some((lat, lon)) = record.coordinates() {
        fields.push(("location", Some(json!({"lat": lat, "lon": lon}))));
        fields.push(("latitude", Some(json!(lat))));
        fields.push(("longitude", Some(json!(lon))));
    }
    fields
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::preprocess;
    use serde_json::json;

    fn short_term() -> PropertyRecord {
        let raw = json!({
            "id": 300001, "url": "u", "name": "Monthly Studio", "type": "Apartment",
            "floor": "5F",
            "address": {"full": "2-1 Roppongi, Minato-ku, Tokyo", "latitude": 35.66, "longitude": 139.73},
            "area": {"m2": 22.5},
            "price": {"short_term_monthly_total": 240000, "short_term_weekly_total": 70000},
            "contract": {"length": "1 month"},
            "nearest_stations": [
                {"station_name": "Roppongi", "walk_time_min": 4, "lines": ["Hibiya Line"]},
                {"station_name": "Nogizaka", "walk_time_min": 9, "lines": []}
            ],
            "amenities": ["Furnished", "Pet Negotiable"],
            "requirements": {"japanese_required": false}
        });
        preprocess(&raw, PropertyType::ShortTerm).unwrap()
    }

    #[test]
    fn test_flat_fields() {
        let doc = IndexDocument::from_record(&short_term()).unwrap();
        let p = &doc.payload;
        assert_eq!(doc.id, 300001);
        assert_eq!(p["property_type"], "Short-Term");
        assert_eq!(p["short_term_monthly_total"], 240000);
        assert!(p.get("monthly_total").is_none());
        assert!(p.get("total").is_none());
        assert_eq!(p["ward"], "Minato");
        assert_eq!(p["pet_friendly"], true);
        assert_eq!(p["floor_number"], 5);
        assert_eq!(p["min_walk_time"], 4);
        assert_eq!(p["short_term_duration"], "1 month");
        assert_eq!(p["contract_length"], "1 month");
        assert_eq!(p["japanese_required"], false);
        assert_eq!(p["location"], json!({"lat": 35.66, "lon": 139.73}));
        assert_eq!(p["nearest_stations"][0]["lines"], json!(["Hibiya Line"]));
        assert_eq!(p["address_full"], "2-1 Roppongi, Minato-ku, Tokyo");
    }

    #[test]
    fn test_payload_carries_record_and_derived() {
        let record = short_term();
        let doc = IndexDocument::from_record(&record).unwrap();
        assert_eq!(doc.payload["name"], "Monthly Studio");
        assert_eq!(doc.payload["amenities"], json!(["Furnished", "Pet Negotiable"]));
        assert_eq!(doc.payload["accessibility"]["best_station_score"], 97);
        assert!(doc.payload["semantic_description"]
            .as_str()
            .unwrap()
            .starts_with("Monthly Studio - Apartment for Short-Term"));
        assert_eq!(doc.text, crate::derive::embedding_text(&record));
    }

    #[test]
    fn test_no_coordinates_no_location() {
        let mut record = short_term();
        record.address.latitude = None;
        let fields = filter_fields(&record);
        assert!(fields.iter().all(|(k, _)| *k != "location"));
    }

    #[test]
    fn test_every_index_field_is_written() {
        let record = short_term();
        let doc = IndexDocument::from_record(&record).unwrap();
        for (field, _) in PAYLOAD_INDEXES {
            let top = field.split("[]").next().unwrap_or(field);
            // Type-gated fields are legitimately absent for Short-Term.
            if matches!(
                top,
                "total" | "monthly_total" | "management_fee" | "guarantor_service"
                    | "fire_insurance" | "year_built" | "layout" | "land_rights" | "status"
                    | "building_id"
            ) {
                continue;
            }
            assert!(doc.payload.get(top).is_some(), "missing {}", field);
        }
    }
}
