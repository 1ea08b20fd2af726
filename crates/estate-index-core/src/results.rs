//! Grouping of search hits into buildings.
//!
//! Several units of one building often rank together. Hits are grouped by
//! `building_id` when the payload carries one, otherwise by exact
//! coordinates (`"{lat}_{lon}"`). Groups keep the rank order of their best
//! hit.

use serde::Serialize;
use serde_json::Value;

use crate::store::ScoredPoint;

/// One building (or lone listing) in a result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultGroup {
    pub building_key: String,
    pub property_type: Option<String>,
    pub units: Vec<UnitSummary>,
}

impl ResultGroup {
    pub fn count(&self) -> usize {
        self.units.len()
    }
}

/// Display fields of one hit, pulled from its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSummary {
    pub id: u64,
    pub score: f32,
    pub name: Option<String>,
    pub unit_number: Option<String>,
    /// Headline price: total for Buy, otherwise the first monthly figure.
    pub price: Option<u64>,
    pub area_m2: Option<f64>,
    pub floor: Option<String>,
    pub amenities: Vec<String>,
    pub address: Option<String>,
    pub stations: Vec<String>,
    pub main_image: Option<String>,
    pub floorplan: Option<String>,
}

impl UnitSummary {
    pub fn from_hit(hit: &ScoredPoint) -> Self {
        let p = &hit.payload;
        let text = |key: &str| p.get(key).and_then(Value::as_str).map(str::to_string);
        let is_buy = p.get("property_type").and_then(Value::as_str) == Some("Buy");
        let price = if is_buy {
            p.get("total").and_then(Value::as_u64)
        } else {
            p.get("monthly_total")
                .and_then(Value::as_u64)
                .or_else(|| p.get("short_term_monthly_total").and_then(Value::as_u64))
        };
        let image = |key: &str| {
            p.get("images")
                .and_then(|i| i.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            id: hit.id,
            score: hit.score,
            name: text("name"),
            unit_number: text("unit_number"),
            price,
            area_m2: p.get("area_m2").and_then(Value::as_f64),
            floor: text("floor"),
            amenities: string_list(p.get("amenities")),
            address: text("address_full"),
            stations: p
                .get("nearest_stations")
                .and_then(Value::as_array)
                .map(|stations| {
                    stations
                        .iter()
                        .filter_map(|s| {
                            let name = s.get("name")?.as_str()?;
                            let walk = s.get("walk_time_min")?.as_u64()?;
                            Some(format!("{} ({} min)", name, walk))
                        })
                        .collect()
                })
                .unwrap_or_default(),
            main_image: image("main"),
            floorplan: image("floorplan"),
        }
    }
}

/// Group ranked hits by building, preserving first-seen order.
pub fn group_hits(hits: &[ScoredPoint]) -> Vec<ResultGroup> {
    let mut groups: Vec<ResultGroup> = Vec::new();
    for hit in hits {
        let key = building_key(hit);
        let unit = UnitSummary::from_hit(hit);
        match groups.iter_mut().find(|g| g.building_key == key) {
            Some(group) => group.units.push(unit),
            None => groups.push(ResultGroup {
                building_key: key,
                property_type: hit
                    .payload
                    .get("property_type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                units: vec![unit],
            }),
        }
    }
    groups
}

/// `building_id`, else `"{lat}_{lon}"`, else the point id.
pub fn building_key(hit: &ScoredPoint) -> String {
    let p = &hit.payload;
    if let Some(id) = p.get("building_id").and_then(Value::as_str).filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    match (
        p.get("latitude").and_then(Value::as_f64),
        p.get("longitude").and_then(Value::as_f64),
    ) {
        (Some(lat), Some(lon)) => format!("{}_{}", lat, lon),
        _ => format!("id_{}", hit.id),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(id: u64, score: f32, payload: Value) -> ScoredPoint {
        ScoredPoint { id, score, payload }
    }

    #[test]
    fn test_groups_by_building_then_coordinates() {
        let hits = vec![
            hit(1, 0.9, json!({"building_id": "B1", "property_type": "Buy", "total": 50_000_000})),
            hit(2, 0.8, json!({"latitude": 35.0, "longitude": 139.0, "property_type": "Rent", "monthly_total": 100_000})),
            hit(3, 0.7, json!({"building_id": "B1", "property_type": "Buy", "total": 60_000_000})),
            hit(4, 0.6, json!({"latitude": 35.0, "longitude": 139.0, "property_type": "Rent"})),
            hit(5, 0.5, json!({"property_type": "Rent"})),
        ];
        let groups = group_hits(&hits);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].building_key, "B1");
        assert_eq!(groups[0].count(), 2);
        assert_eq!(groups[0].units[1].price, Some(60_000_000));
        assert_eq!(groups[1].building_key, "35_139");
        assert_eq!(groups[1].units.iter().map(|u| u.id).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(groups[2].building_key, "id_5");
    }

    #[test]
    fn test_unit_summary_price_fallback() {
        let unit = UnitSummary::from_hit(&hit(
            9,
            0.4,
            json!({
                "property_type": "Short-Term",
                "short_term_monthly_total": 240_000,
                "nearest_stations": [{"name": "Roppongi", "walk_time_min": 4}],
                "images": {"main": "m.jpg"},
                "amenities": ["Furnished"]
            }),
        ));
        assert_eq!(unit.price, Some(240_000));
        assert_eq!(unit.stations, vec!["Roppongi (4 min)"]);
        assert_eq!(unit.main_image.as_deref(), Some("m.jpg"));
        assert_eq!(unit.floorplan, None);
        assert_eq!(unit.amenities, vec!["Furnished"]);
    }
}
