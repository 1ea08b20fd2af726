//! Structured search intents and the payload filters built from them.
//!
//! A [`QueryIntent`] is what the intent extractor pulls out of a free-text
//! query. [`build_filter`] turns it into a conjunctive [`Filter`]: every
//! present intent field contributes exactly one clause, absent fields
//! contribute nothing.
//!
//! # Type gating
//!
//! | Intent field | Clause emitted only for |
//! |--------------|-------------------------|
//! | `max_total_price` | Buy |
//! | `max_monthly_price` | Rent (`monthly_total`), Short-Term (either monthly field) |
//! | `short_term_duration` | Short-Term |
//! | `contract_length` | Rent |
//! | `layout`, `land_rights`, `status` | Buy |
//!
//! Filters serialize to the vector store's REST filter JSON via
//! [`Filter::to_json`], and can be evaluated locally with
//! [`Filter::matches`] (used by the in-memory store).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::derive::{normalize_ward, parse_floor};
use crate::vocab::PropertyType;

/// Structured intent extracted from a natural-language query.
///
/// Every field is optional; unknown fields in extractor output are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryIntent {
    #[serde(deserialize_with = "null_as_empty")]
    pub keywords: Vec<String>,
    pub property_type: Option<String>,
    pub max_total_price: Option<f64>,
    pub max_monthly_price: Option<f64>,
    pub short_term_duration: Option<String>,
    pub min_area_m2: Option<f64>,
    pub max_area_m2: Option<f64>,
    pub ward: Option<String>,
    pub location: Option<String>,
    pub pet_friendly: Option<bool>,
    pub max_walk_time: Option<f64>,
    pub station_name: Option<String>,
    pub train_lines: Option<Vec<String>>,
    pub min_year_built: Option<i64>,
    pub min_floor: Option<String>,
    pub max_floor: Option<String>,
    pub contract_length: Option<String>,
    pub max_management_fee: Option<f64>,
    pub max_guarantor_service: Option<f64>,
    pub max_fire_insurance: Option<f64>,
    pub japanese_required: Option<bool>,
    pub amenities: Option<Vec<String>>,
    pub layout: Option<String>,
    pub land_rights: Option<String>,
    pub status: Option<String>,
    pub building_id: Option<String>,
}

impl QueryIntent {
    /// Intent used when no extractor is available: keywords only.
    pub fn keywords_only(query: &str) -> Self {
        Self {
            keywords: query.split_whitespace().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    /// Parsed property type; unrecognized labels count as absent.
    pub fn property_type(&self) -> Option<PropertyType> {
        self.property_type.as_deref().and_then(PropertyType::parse)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Great-circle distance in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// Value matched exactly by a [`Condition::Match`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    Keyword(String),
    Integer(i64),
    Bool(bool),
}

impl MatchValue {
    fn to_json(&self) -> Value {
        match self {
            MatchValue::Keyword(s) => json!(s),
            MatchValue::Integer(n) => json!(n),
            MatchValue::Bool(b) => json!(b),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (MatchValue::Keyword(want), Value::String(got)) => want == got,
            (MatchValue::Integer(want), Value::Number(got)) => got.as_i64() == Some(*want),
            (MatchValue::Bool(want), Value::Bool(got)) => want == got,
            _ => false,
        }
    }
}

/// Inclusive/exclusive numeric bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Range {
    pub gt: Option<f64>,
    pub gte: Option<f64>,
    pub lt: Option<f64>,
    pub lte: Option<f64>,
}

impl Range {
    pub fn at_most(v: f64) -> Self {
        Self {
            lte: Some(v),
            ..Self::default()
        }
    }

    pub fn at_least(v: f64) -> Self {
        Self {
            gte: Some(v),
            ..Self::default()
        }
    }

    fn to_json(self) -> Value {
        let mut out = serde_json::Map::new();
        for (k, v) in [("gt", self.gt), ("gte", self.gte), ("lt", self.lt), ("lte", self.lte)] {
            if let Some(v) = v {
                out.insert(k.into(), json!(v));
            }
        }
        Value::Object(out)
    }

    fn contains(&self, v: f64) -> bool {
        self.gt.map_or(true, |b| v > b)
            && self.gte.map_or(true, |b| v >= b)
            && self.lt.map_or(true, |b| v < b)
            && self.lte.map_or(true, |b| v <= b)
    }
}

/// One filter clause. `key` paths use `a.b` for nesting and `a[].b` to
/// fan out over arrays; a clause holds if any reached value satisfies it.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Match { key: String, value: MatchValue },
    Range { key: String, range: Range },
    GeoRadius { key: String, center: GeoPoint, radius_m: f64 },
    Nested(Filter),
}

impl Condition {
    pub fn keyword(key: &str, value: impl Into<String>) -> Self {
        Condition::Match {
            key: key.to_string(),
            value: MatchValue::Keyword(value.into()),
        }
    }

    pub fn flag(key: &str, value: bool) -> Self {
        Condition::Match {
            key: key.to_string(),
            value: MatchValue::Bool(value),
        }
    }

    pub fn range(key: &str, range: Range) -> Self {
        Condition::Range {
            key: key.to_string(),
            range,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Condition::Match { key, value } => json!({"key": key, "match": {"value": value.to_json()}}),
            Condition::Range { key, range } => json!({"key": key, "range": range.to_json()}),
            Condition::GeoRadius {
                key,
                center,
                radius_m,
            } => json!({
                "key": key,
                "geo_radius": {"center": {"lat": center.lat, "lon": center.lon}, "radius": radius_m}
            }),
            Condition::Nested(filter) => filter.to_json(),
        }
    }

    pub fn matches(&self, payload: &Value) -> bool {
        match self {
            Condition::Match { key, value } => {
                values_at(payload, key).iter().any(|v| value.matches(v))
            }
            Condition::Range { key, range } => values_at(payload, key)
                .iter()
                .filter_map(|v| v.as_f64())
                .any(|v| range.contains(v)),
            Condition::GeoRadius {
                key,
                center,
                radius_m,
            } => values_at(payload, key).iter().any(|v| {
                match (v.get("lat").and_then(Value::as_f64), v.get("lon").and_then(Value::as_f64)) {
                    (Some(lat), Some(lon)) => center.distance_m(&GeoPoint { lat, lon }) <= *radius_m,
                    _ => false,
                }
            }),
            Condition::Nested(filter) => filter.matches(payload),
        }
    }
}

/// All `must` clauses hold, and at least one `should` clause holds when
/// any are given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub must: Vec<Condition>,
    pub should: Vec<Condition>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let mut out = serde_json::Map::new();
        if !self.must.is_empty() {
            out.insert(
                "must".into(),
                Value::Array(self.must.iter().map(Condition::to_json).collect()),
            );
        }
        if !self.should.is_empty() {
            out.insert(
                "should".into(),
                Value::Array(self.should.iter().map(Condition::to_json).collect()),
            );
        }
        Value::Object(out)
    }

    pub fn matches(&self, payload: &Value) -> bool {
        self.must.iter().all(|c| c.matches(payload))
            && (self.should.is_empty() || self.should.iter().any(|c| c.matches(payload)))
    }
}

/// Build the payload filter for `intent`.
///
/// `geo` is the geocoded position of `intent.location`, when known.
/// Returns `None` when no intent field produced a clause.
pub fn build_filter(intent: &QueryIntent, geo: Option<GeoPoint>, radius_m: f64) -> Option<Filter> {
    let property_type = intent.property_type();
    let is = |t: PropertyType| property_type == Some(t);
    let mut must = Vec::new();

    if let Some(t) = property_type {
        must.push(Condition::keyword("property_type", t.as_str()));
    }
    if let Some(max) = intent.max_total_price.filter(|_| is(PropertyType::Buy)) {
        must.push(Condition::range("total", Range::at_most(max)));
    }
    if let Some(max) = intent.max_monthly_price {
        if is(PropertyType::Rent) {
            must.push(Condition::range("monthly_total", Range::at_most(max)));
        } else if is(PropertyType::ShortTerm) {
            must.push(Condition::Nested(Filter {
                must: Vec::new(),
                should: vec![
                    Condition::range("monthly_total", Range::at_most(max)),
                    Condition::range("short_term_monthly_total", Range::at_most(max)),
                ],
            }));
        }
    }
    if let Some(duration) = nonblank(&intent.short_term_duration).filter(|_| is(PropertyType::ShortTerm)) {
        must.push(Condition::keyword("short_term_duration", duration));
    }
    if intent.min_area_m2.is_some() || intent.max_area_m2.is_some() {
        must.push(Condition::range(
            "area_m2",
            Range {
                gte: intent.min_area_m2,
                lte: intent.max_area_m2,
                ..Range::default()
            },
        ));
    }
    if let Some(ward) = nonblank(&intent.ward) {
        must.push(Condition::keyword("ward", normalize_ward(ward)));
    }
    if let Some(location) = nonblank(&intent.location) {
        match geo {
            Some(center) => must.push(Condition::GeoRadius {
                key: "location".into(),
                center,
                radius_m,
            }),
            None if nonblank(&intent.station_name).is_none() => {
                must.push(Condition::keyword("nearest_stations[].name", location));
            }
            None => {}
        }
    }
    if let Some(pets) = intent.pet_friendly {
        must.push(Condition::flag("pet_friendly", pets));
    }
    if let Some(max) = intent.max_walk_time {
        must.push(Condition::range("min_walk_time", Range::at_most(max)));
    }
    if let Some(station) = nonblank(&intent.station_name) {
        must.push(Condition::keyword("nearest_stations[].name", station));
    }
    if let Some(lines) = all_of("nearest_stations[].lines", intent.train_lines.as_deref()) {
        must.push(lines);
    }
    if let Some(year) = intent.min_year_built {
        must.push(Condition::range("year_built", Range::at_least(year as f64)));
    }
    if let Some(floor) = nonblank(&intent.min_floor).and_then(parse_floor) {
        must.push(Condition::range("floor_number", Range::at_least(f64::from(floor))));
    }
    if let Some(floor) = nonblank(&intent.max_floor).and_then(parse_floor) {
        must.push(Condition::range("floor_number", Range::at_most(f64::from(floor))));
    }
    if let Some(length) = nonblank(&intent.contract_length).filter(|_| is(PropertyType::Rent)) {
        must.push(Condition::keyword("contract_length", length));
    }
    for (key, cap) in [
        ("management_fee", intent.max_management_fee),
        ("guarantor_service", intent.max_guarantor_service),
        ("fire_insurance", intent.max_fire_insurance),
    ] {
        if let Some(max) = cap {
            must.push(Condition::range(key, Range::at_most(max)));
        }
    }
    if let Some(required) = intent.japanese_required {
        must.push(Condition::flag("japanese_required", required));
    }
    if let Some(amenities) = all_of("amenities", intent.amenities.as_deref()) {
        must.push(amenities);
    }
    if is(PropertyType::Buy) {
        for (key, value) in [
            ("layout", &intent.layout),
            ("land_rights", &intent.land_rights),
            ("status", &intent.status),
        ] {
            if let Some(v) = nonblank(value) {
                must.push(Condition::keyword(key, v));
            }
        }
    }
    if let Some(building) = nonblank(&intent.building_id) {
        must.push(Condition::keyword("building_id", building));
    }

    if must.is_empty() {
        None
    } else {
        Some(Filter {
            must,
            should: Vec::new(),
        })
    }
}

/// One nested all-of clause matching every item on `key`.
fn all_of(key: &str, items: Option<&[String]>) -> Option<Condition> {
    let conditions: Vec<Condition> = items
        .unwrap_or_default()
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| Condition::keyword(key, s))
        .collect();
    if conditions.is_empty() {
        None
    } else {
        Some(Condition::Nested(Filter {
            must: conditions,
            should: Vec::new(),
        }))
    }
}

fn nonblank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Collect every value reached by a key path. Arrays are flattened at the
/// leaf, so `amenities` yields each amenity.
pub fn values_at<'a>(payload: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut current = vec![payload];
    for segment in key.split('.') {
        let (name, fan_out) = match segment.strip_suffix("[]") {
            Some(name) => (name, true),
            None => (segment, false),
        };
        let mut next = Vec::new();
        for value in current {
            let Some(child) = value.get(name) else {
                continue;
            };
            match child {
                Value::Array(items) if fan_out => next.extend(items.iter()),
                other => next.push(other),
            }
        }
        current = next;
    }
    current
        .into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}
