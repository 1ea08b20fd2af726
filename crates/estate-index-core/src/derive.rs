//! Derived fields: descriptions, keywords, highlights, accessibility.
//!
//! Every function here is a pure function of a [`PropertyRecord`] (or one
//! of its parts). Nothing is cached on the record; callers recompute when
//! they need a value, so derived text can never drift from its inputs.
//!
//! # Semantic description layout
//!
//! ```text
//! {name} - {category} for {property_type}. Location: …. Size: ….
//! Price: …. Stations: …. Building: …. Details: …. Notes: …. Amenities: …
//! ```
//!
//! Sections whose source is absent are omitted entirely.

use serde::{Deserialize, Serialize};

use crate::models::{Address, Area, Headline, Price, PropertyRecord, Station};

/// Number of keywords surfaced in [`PropertyHighlights::keywords`].
pub const HIGHLIGHT_KEYWORDS: usize = 5;

/// All derived values for one record, computed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    pub semantic_description: String,
    pub search_keywords: Vec<String>,
    pub highlights: PropertyHighlights,
    pub accessibility: AccessibilityMetrics,
}

impl DerivedFields {
    pub fn compute(record: &PropertyRecord) -> Self {
        let search_keywords = search_keywords(record);
        Self {
            semantic_description: semantic_description(record),
            highlights: highlights_with_keywords(record, &search_keywords),
            accessibility: accessibility_metrics(&record.stations),
            search_keywords,
        }
    }
}

/// Quick-summary map shown alongside search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyHighlights {
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_station: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    pub keywords: Vec<String>,
}

/// Aggregate station accessibility. With no stations only
/// `overall_score = 0` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityMetrics {
    pub overall_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_station_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_walk_time: Option<f64>,
}

/// `"{full}[ in {ward}][ in {city}]"`.
pub fn location_description(address: &Address) -> String {
    let mut out = address.full.clone();
    if let Some(ward) = &address.ward {
        out.push_str(" in ");
        out.push_str(ward);
    }
    if let Some(city) = &address.city {
        out.push_str(" in ");
        out.push_str(city);
    }
    out
}

/// `"35.2 m² (378.9 ft²)"`.
pub fn size_description(area: &Area) -> String {
    match area.ft2 {
        Some(ft2) => format!("{:.1} m² ({:.1} ft²)", area.m2, ft2),
        None => format!("{:.1} m²", area.m2),
    }
}

/// Headline price: `"85,000,000 JPY (total)"` or `"150,000 JPY/month"`.
///
/// Priority is `total`, then `monthly_total`, then `short_term_monthly_total`.
pub fn price_description(price: &Price) -> Option<String> {
    price.terms.headline().map(|headline| match headline {
        Headline::Total(v) => format!("{} {} (total)", format_thousands(v), price.currency),
        Headline::Monthly(v) => format!("{} {}/month", format_thousands(v), price.currency),
    })
}

/// `"Meiji-jingumae (5 min walk, Chiyoda Line, Fukutoshin Line)"`.
pub fn station_description(station: &Station) -> String {
    if station.lines.is_empty() {
        format!("{} ({} min walk)", station.station_name, station.walk_time_min)
    } else {
        let lines: Vec<&str> = station.lines.iter().map(|l| l.name.as_str()).collect();
        format!(
            "{} ({} min walk, {})",
            station.station_name,
            station.walk_time_min,
            lines.join(", ")
        )
    }
}

/// Year built, structure, floor count, unit count.
pub fn building_description(record: &PropertyRecord) -> Option<String> {
    let building = record.building.as_ref();
    let mut parts = Vec::new();
    if let Some(year) = record.year_built.or_else(|| building.and_then(|b| b.year_built)) {
        parts.push(format!("Built in {}", year));
    }
    if let Some(b) = building {
        if let Some(structure) = &b.structure {
            parts.push(format!("{} construction", structure));
        }
        if let Some(floors) = b.total_floors {
            parts.push(format!("{} floors", floors));
        }
        if let Some(units) = b.total_units {
            parts.push(format!("{} units", units));
        }
    }
    join_present(parts, ", ")
}

/// Layout, floor, balcony direction, land rights, transaction type.
pub fn details_description(record: &PropertyRecord) -> Option<String> {
    let details = record.details.as_ref();
    let mut parts = Vec::new();
    if let Some(layout) = record.layout() {
        parts.push(format!("Layout: {}", layout));
    }
    if let Some(floor) = &record.floor {
        parts.push(format!("Floor: {}", floor));
    }
    if let Some(d) = details {
        if let Some(balcony) = &d.balcony_direction {
            parts.push(format!("Balcony facing: {}", balcony));
        }
        if let Some(rights) = &d.land_rights {
            parts.push(format!("Land rights: {}", rights));
        }
        if let Some(tx) = &d.transaction_type {
            parts.push(format!("Transaction: {}", tx));
        }
    }
    join_present(parts, ", ")
}

/// Building notes plus a `"Nearby: …"` list of facilities.
pub fn notes_description(record: &PropertyRecord) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    if let Some(notes) = &record.building_notes {
        for text in [&notes.summary, &notes.description].into_iter().flatten() {
            let text = text.trim().trim_end_matches('.');
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
    }
    if !record.facilities.is_empty() {
        let nearby: Vec<String> = record
            .facilities
            .iter()
            .map(|f| match &f.distance_description {
                Some(d) => format!("{} ({})", f.name, d),
                None => f.name.clone(),
            })
            .collect();
        parts.push(format!("Nearby: {}", nearby.join("; ")));
    }
    join_present(parts, ". ")
}

/// The free-text blob submitted to the embedding step.
pub fn semantic_description(record: &PropertyRecord) -> String {
    let mut sections = vec![format!(
        "{} - {} for {}",
        record.name,
        record.category,
        record.property_type()
    )];
    sections.push(format!("Location: {}", location_description(&record.address)));
    sections.push(format!("Size: {}", size_description(&record.area)));
    if let Some(price) = price_description(&record.price) {
        sections.push(format!("Price: {}", price));
    }
    if !record.stations.is_empty() {
        let stations: Vec<String> = record.stations.iter().map(station_description).collect();
        sections.push(format!("Stations: {}", stations.join("; ")));
    }
    if let Some(building) = building_description(record) {
        sections.push(format!("Building: {}", building));
    }
    if let Some(details) = details_description(record) {
        sections.push(format!("Details: {}", details));
    }
    if let Some(notes) = notes_description(record) {
        sections.push(format!("Notes: {}", notes));
    }
    if !record.amenities.is_empty() {
        sections.push(format!("Amenities: {}", record.amenities.join(", ")));
    }
    sections.join(". ")
}

/// Layout tokens, then features, then amenities; unique, first-seen order.
pub fn search_keywords(record: &PropertyRecord) -> Vec<String> {
    let layout_tokens = record
        .layout()
        .map(|l| l.split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .unwrap_or_default();
    let mut out: Vec<String> = Vec::new();
    let sources = layout_tokens
        .into_iter()
        .chain(record.features.unit.iter().cloned())
        .chain(record.features.building.iter().cloned())
        .chain(record.amenities.iter().cloned());
    for keyword in sources {
        if !keyword.is_empty() && !out.contains(&keyword) {
            out.push(keyword);
        }
    }
    out
}

pub fn property_highlights(record: &PropertyRecord) -> PropertyHighlights {
    highlights_with_keywords(record, &search_keywords(record))
}

fn highlights_with_keywords(record: &PropertyRecord, keywords: &[String]) -> PropertyHighlights {
    PropertyHighlights {
        size: size_description(&record.area),
        price: price_description(&record.price),
        location: location_description(&record.address),
        nearest_station: record.stations.first().map(station_description),
        year_built: record.year_built,
        keywords: keywords.iter().take(HIGHLIGHT_KEYWORDS).cloned().collect(),
    }
}

pub fn accessibility_metrics(stations: &[Station]) -> AccessibilityMetrics {
    if stations.is_empty() {
        return AccessibilityMetrics {
            overall_score: 0.0,
            best_station_score: None,
            average_walk_time: None,
        };
    }
    let n = stations.len() as f64;
    let scores: Vec<u32> = stations.iter().map(Station::accessibility_score).collect();
    let total_score: u32 = scores.iter().sum();
    let total_walk: u32 = stations.iter().map(|s| s.walk_time_min).sum();
    AccessibilityMetrics {
        overall_score: f64::from(total_score) / n,
        best_station_score: scores.iter().copied().max(),
        average_walk_time: Some(f64::from(total_walk) / n),
    }
}

/// Text actually embedded: the semantic description plus keywords.
pub fn embedding_text(record: &PropertyRecord) -> String {
    let description = semantic_description(record);
    let keywords = search_keywords(record);
    if keywords.is_empty() {
        description
    } else {
        format!("{} Keywords: {}", description, keywords.join(", "))
    }
}

/// Ward label for filtering: `"Shibuya-ku"` → `"Shibuya"`, `"minato"` → `"Minato"`.
pub fn normalize_ward(ward: &str) -> String {
    let lower = ward.trim().to_lowercase();
    let stem = lower
        .strip_suffix("-ku")
        .or_else(|| lower.strip_suffix(" ward"))
        .unwrap_or(&lower)
        .trim();
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Leading floor number: `"12F"` → 12, `"1F (of 5F)"` → 1. Basement and
/// sentinel values (`"B1"`, `"0F"`) yield `None`.
pub fn parse_floor(floor: &str) -> Option<u32> {
    let digits: String = floor
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Whether any amenity advertises pets.
pub fn is_pet_friendly(amenities: &[String]) -> bool {
    amenities.iter().any(|a| {
        let lower = a.to_lowercase();
        lower.contains("pet friendly") || lower.contains("pet negotiable")
    })
}

/// `1234567` → `"1,234,567"`.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn join_present(parts: Vec<String>, sep: &str) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(sep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceTerms;
    use crate::preprocess::preprocess;
    use crate::vocab::PropertyType;
    use serde_json::json;

    fn record() -> PropertyRecord {
        let raw = json!({
            "id": 200001,
            "url": "https://example.test/rent/200001",
            "name": "Park Axis Shibuya",
            "type": "Apartment",
            "floor": "3F",
            "year_built": 2015,
            "address": {"full": "1-2-3 Jingumae", "ward": "Shibuya-ku", "city": "Tokyo"},
            "area": {"m2": 35.24, "ft2": 379.3},
            "price": {"monthly_total": 150000, "currency": "JPY"},
            "nearest_stations": [
                {"station_name": "Meiji-jingumae", "walk_time_min": 5, "lines": ["Chiyoda Line", "Fukutoshin Line"]},
                {"station_name": "Harajuku", "walk_time_min": 10, "lines": ["Yamanote Line"]}
            ],
            "details": {"layout": "1 LDK", "balcony_direction": "South"},
            "building": {"structure": "RC", "total_floors": 10},
            "features": {"unit": ["Balcony"], "building": ["Elevator"]},
            "amenities": ["Pet Negotiable", "Balcony"],
            "building_notes": {"summary": "Quiet street.", "facilities": ["Yoyogi Park (8 min walk)"]}
        });
        preprocess(&raw, PropertyType::Rent).unwrap()
    }

    #[test]
    fn test_location_and_size() {
        let r = record();
        assert_eq!(
            location_description(&r.address),
            "1-2-3 Jingumae in Shibuya-ku in Tokyo"
        );
        assert_eq!(size_description(&r.area), "35.2 m² (379.3 ft²)");
    }

    #[test]
    fn test_price_description_priority() {
        let r = record();
        assert_eq!(
            price_description(&r.price).as_deref(),
            Some("150,000 JPY/month")
        );
        let buy = Price {
            currency: "JPY".into(),
            terms: PriceTerms::Buy {
                total: 85_000_000,
                management_fee: None,
                repair_reserve: None,
            },
        };
        assert_eq!(
            price_description(&buy).as_deref(),
            Some("85,000,000 JPY (total)")
        );
        let short = Price {
            currency: "JPY".into(),
            terms: PriceTerms::ShortTerm {
                monthly_total: None,
                short_term_monthly_total: Some(240_000),
                short_term_weekly_total: Some(70_000),
                short_term_daily_total: None,
                cleaning_fee: None,
            },
        };
        assert_eq!(
            price_description(&short).as_deref(),
            Some("240,000 JPY/month")
        );
    }

    #[test]
    fn test_semantic_description_sections_in_order() {
        let text = semantic_description(&record());
        let order = [
            "Park Axis Shibuya - Apartment for Rent",
            "Location: ",
            "Size: ",
            "Price: 150,000 JPY/month",
            "Stations: Meiji-jingumae (5 min walk, Chiyoda Line, Fukutoshin Line); Harajuku",
            "Building: Built in 2015, RC construction, 10 floors",
            "Details: Layout: 1 LDK, Floor: 3F, Balcony facing: South",
            "Notes: Quiet street. Nearby: Yoyogi Park (8 min walk)",
            "Amenities: Balcony, Elevator, Pet Negotiable, Park",
        ];
        let mut cursor = 0;
        for part in order {
            let pos = text[cursor..]
                .find(part)
                .unwrap_or_else(|| panic!("missing {:?} in {:?}", part, text));
            cursor += pos + part.len();
        }
    }

    #[test]
    fn test_sections_omitted_when_absent() {
        let raw = json!({
            "id": 1, "url": "u", "name": "Plot", "type": "Land",
            "address": {"full": "Somewhere"},
            "area": {"m2": 100},
            "price": {"total": 1000}
        });
        let r = preprocess(&raw, PropertyType::Buy).unwrap();
        assert_eq!(
            semantic_description(&r),
            "Plot - Land for Buy. Location: Somewhere. Size: 100.0 m². Price: 1,000 JPY (total)"
        );
        assert_eq!(embedding_text(&r), semantic_description(&r));
    }

    #[test]
    fn test_keywords_dedup_and_highlights() {
        let r = record();
        let keywords = search_keywords(&r);
        assert_eq!(
            keywords,
            vec!["1", "LDK", "Balcony", "Elevator", "Pet Negotiable", "Park"]
        );
        let h = property_highlights(&r);
        assert_eq!(h.keywords.len(), HIGHLIGHT_KEYWORDS);
        assert_eq!(h.year_built, Some(2015));
        assert_eq!(
            h.nearest_station.as_deref(),
            Some("Meiji-jingumae (5 min walk, Chiyoda Line, Fukutoshin Line)")
        );
        assert!(embedding_text(&r).ends_with("Keywords: 1, LDK, Balcony, Elevator, Pet Negotiable, Park"));
    }

    #[test]
    fn test_accessibility_metrics() {
        let r = record();
        let m = accessibility_metrics(&r.stations);
        // 100 and 85
        assert_eq!(m.overall_score, 92.5);
        assert_eq!(m.best_station_score, Some(100));
        assert_eq!(m.average_walk_time, Some(7.5));

        let empty = accessibility_metrics(&[]);
        assert_eq!(empty.overall_score, 0.0);
        let v = serde_json::to_value(&empty).unwrap();
        assert_eq!(v, json!({"overall_score": 0.0}));
    }

    #[test]
    fn test_derived_fields_are_deterministic() {
        let r = record();
        assert_eq!(DerivedFields::compute(&r), DerivedFields::compute(&r));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(normalize_ward("Shibuya-ku"), "Shibuya");
        assert_eq!(normalize_ward(" minato "), "Minato");
        assert_eq!(normalize_ward("Meguro Ward"), "Meguro");
        assert_eq!(parse_floor("12F"), Some(12));
        assert_eq!(parse_floor("1F (of 5F)"), Some(1));
        assert_eq!(parse_floor("0F"), None);
        assert_eq!(parse_floor("B1"), None);
        assert!(is_pet_friendly(&["Pet Friendly(+1 mo deposit)".to_string()]));
        assert!(is_pet_friendly(&["pet negotiable".to_string()]));
        assert!(!is_pet_friendly(&["No pets".to_string()]));
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(85_000_000), "85,000,000");
    }
}
