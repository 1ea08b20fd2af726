//! End-to-end normalization scenarios over the public core API.

use std::collections::HashSet;

use estate_index_core::diagnostics::{coordinate_clusters, ClusterKind};
use estate_index_core::facility::normalize_facilities;
use estate_index_core::models::{Station, TrainLine};
use estate_index_core::payload::IndexDocument;
use estate_index_core::vocab::FacilityCategory;
use estate_index_core::{preprocess, PropertyType};
use serde_json::{json, Value};

fn base(price: Value) -> Value {
    json!({
        "id": 1,
        "url": "https://example.test/1",
        "name": "Sample",
        "type": "Apartment",
        "address": {"full": "1 Main St"},
        "area": {"m2": 40.0},
        "price": price
    })
}

#[test]
fn floor_sentinel_and_amenity_union() {
    let mut raw = base(json!({"monthly_total": 120000}));
    let obj = raw.as_object_mut().unwrap();
    obj.insert("floor".into(), json!("0F"));
    obj.insert(
        "features".into(),
        json!({"unit": ["Balcony"], "building": ["Elevator"]}),
    );
    obj.insert("amenities".into(), json!(["Pet Negotiable"]));

    let record = preprocess(&raw, PropertyType::Rent).unwrap();
    assert_eq!(record.floor, None);
    let got: HashSet<&str> = record.amenities.iter().map(String::as_str).collect();
    let want: HashSet<&str> = ["Balcony", "Elevator", "Pet Negotiable"].into_iter().collect();
    assert_eq!(got, want);
}

#[test]
fn station_with_two_lines_scores_full_marks() {
    let station = Station {
        station_name: "Shibuya".into(),
        walk_time_min: 5,
        lines: vec![
            TrainLine {
                name: "A".into(),
                company: None,
            },
            TrainLine {
                name: "B".into(),
                company: None,
            },
        ],
    };
    assert_eq!(station.accessibility_score(), 100);
}

#[test]
fn facility_shapes_converge() {
    let shapes = [
        json!(["Supermarket (200m)", "Hospital"]),
        json!({"Supermarket": ["200m"], "Hospital": []}),
        json!({"Supermarket": "200m", "Hospital": null}),
    ];
    for shape in &shapes {
        let facilities = normalize_facilities(shape, "facilities").unwrap();
        let categories: Vec<FacilityCategory> = facilities.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![FacilityCategory::Supermarket, FacilityCategory::Other],
            "shape {}",
            shape
        );
        assert_eq!(facilities[0].distance_description.as_deref(), Some("200m"));
    }
}

#[test]
fn buy_duplicates_at_one_point() {
    let at = |id: u64, full: &str| {
        let mut raw = base(json!({"total": 40_000_000}));
        raw["id"] = json!(id);
        raw["address"] = json!({"full": full, "latitude": 35.0, "longitude": 139.0});
        preprocess(&raw, PropertyType::Buy).unwrap()
    };

    let units = vec![at(1, "1 Main St, Unit A"), at(2, "1 Main St, Unit B")];
    let clusters = coordinate_clusters(&units);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].kind, ClusterKind::MultiUnit);

    let conflict = vec![at(1, "1 Main St"), at(2, "9 Other Rd")];
    assert_eq!(
        coordinate_clusters(&conflict)[0].kind,
        ClusterKind::Inconsistent
    );
}

#[test]
fn price_type_mismatch_is_rejected_with_path() {
    let raw = base(json!({"total": 40_000_000}));
    let err = preprocess(&raw, PropertyType::Rent).unwrap_err();
    assert_eq!(err.path(), "price.monthly_total");
}

#[test]
fn index_document_round_trips_record() {
    let raw = base(json!({"monthly_total": "98,000", "management_fee": 5000}));
    let record = preprocess(&raw, PropertyType::Rent).unwrap();
    let doc = IndexDocument::from_record(&record).unwrap();
    assert_eq!(doc.payload["monthly_total"], 98_000);
    assert_eq!(doc.payload["management_fee"], 5000);
    assert_eq!(doc.payload["price"]["property_type"], "Rent");
    assert!(doc.text.contains("Price: 98,000 JPY/month"));

    let back: estate_index_core::PropertyRecord = serde_json::from_value(doc.payload.clone()).unwrap();
    assert_eq!(back.price, record.price);
}
