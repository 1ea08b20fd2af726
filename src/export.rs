//! Offline inspection commands: `validate`, `export` and `vocabulary`.
//!
//! None of these touch the network. They run the same discovery and
//! normalization as `estate index`, so they are the quickest way to check
//! a new data drop before embedding it.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use estate_index_core::derive::{is_pet_friendly, normalize_ward, parse_floor, property_highlights};
use estate_index_core::diagnostics::ClusterKind;
use estate_index_core::PropertyRecord;

use crate::config::Config;
use crate::ingest::{self, FileOutcome, IngestReport};

/// Normalized record plus the convenience fields used by filters.
pub fn export_record(record: &PropertyRecord) -> Result<Value> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut value {
        let ward = record.address.ward.as_deref().map(normalize_ward);
        map.insert("ward".into(), serde_json::to_value(ward)?);
        map.insert("pet_friendly".into(), Value::Bool(is_pet_friendly(&record.amenities)));
        let floor_number = record.floor.as_deref().and_then(parse_floor);
        map.insert("floor_number".into(), serde_json::to_value(floor_number)?);
        map.insert(
            "highlights".into(),
            serde_json::to_value(property_highlights(record))?,
        );
    }
    Ok(value)
}

/// `{file stem: [record, …]}` for every file that loaded.
pub fn export_document(report: &IngestReport) -> Result<Value> {
    let mut out = Map::new();
    for file in &report.files {
        if let FileOutcome::Loaded { records, .. } = &file.outcome {
            let items = records
                .iter()
                .map(export_record)
                .collect::<Result<Vec<_>>>()?;
            out.insert(file.file.stem.clone(), Value::Array(items));
        }
    }
    Ok(Value::Object(out))
}

/// `estate export`.
///
/// With `output`, writes the document there and prints up to `sample`
/// records per file; without, prints the document to stdout.
pub fn run_export(config: &Config, output: Option<&Path>, sample: usize) -> Result<()> {
    let report = ingest::load_all(&config.input)?;
    let document = export_document(&report)?;
    let json = serde_json::to_string_pretty(&document)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Exported {} records from {} files to {}",
                report.accepted(),
                report.files.len() - report.failed_files(),
                path.display()
            );

            if sample > 0 {
                println!("Sample properties ({} per file):", sample);
                if let Value::Object(files) = &document {
                    for (stem, records) in files {
                        println!("\n{}:", stem);
                        let records = records.as_array().map(Vec::as_slice).unwrap_or_default();
                        for (i, record) in records.iter().take(sample).enumerate() {
                            println!("Property {}:", i + 1);
                            println!("{}", serde_json::to_string_pretty(record)?);
                        }
                    }
                }
            }
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}

/// Human-readable validation summary.
pub fn validation_summary(report: &IngestReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "validate");

    for file in &report.files {
        match &file.outcome {
            FileOutcome::Loaded { records, rejected } => {
                let _ = writeln!(
                    out,
                    "  {} ({}): {} accepted, {} rejected",
                    file.file.relative,
                    file.file.property_type,
                    records.len(),
                    rejected.len()
                );
                for r in rejected {
                    let _ = writeln!(out, "    rejected {} at `{}`: {}", r.label, r.error.path(), r.error);
                }
            }
            FileOutcome::Failed { error } => {
                let _ = writeln!(out, "  {}: FAILED: {:#}", file.file.relative, error);
            }
        }
    }

    let multi_unit = report
        .clusters
        .iter()
        .filter(|c| c.kind == ClusterKind::MultiUnit)
        .count();
    let inconsistent: Vec<_> = report
        .clusters
        .iter()
        .filter(|c| c.kind == ClusterKind::Inconsistent)
        .collect();
    let _ = writeln!(
        out,
        "  shared coordinates (buy): {} multi-unit, {} inconsistent",
        multi_unit,
        inconsistent.len()
    );
    for c in inconsistent {
        let ids: Vec<String> = c.ids.iter().map(u64::to_string).collect();
        let _ = writeln!(
            out,
            "    ({}, {}): ids {} addresses {}",
            c.latitude,
            c.longitude,
            ids.join(", "),
            c.addresses.join(" | ")
        );
    }

    let missing_coords = report.records().filter(|r| r.coordinates().is_none()).count();
    let missing_images = report
        .records()
        .filter(|r| r.images.as_ref().and_then(|i| i.main.as_ref()).is_none())
        .count();
    let _ = writeln!(out, "  missing coordinates: {}", missing_coords);
    let _ = writeln!(out, "  missing main image: {}", missing_images);
    let _ = writeln!(
        out,
        "  total: {} accepted, {} rejected, {} files failed",
        report.accepted(),
        report.rejected(),
        report.failed_files()
    );
    out
}

/// `estate validate`.
pub fn run_validate(config: &Config) -> Result<()> {
    let report = ingest::load_all(&config.input)?;
    print!("{}", validation_summary(&report));
    Ok(())
}

/// Distinct values seen in the inputs, sorted.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct Vocabulary {
    pub unit_features: BTreeSet<String>,
    pub building_features: BTreeSet<String>,
    pub amenities: BTreeSet<String>,
    pub train_lines: BTreeSet<String>,
    pub categories: BTreeSet<String>,
}

pub fn collect_vocabulary<'a>(records: impl IntoIterator<Item = &'a PropertyRecord>) -> Vocabulary {
    let mut vocab = Vocabulary::default();
    for record in records {
        vocab.unit_features.extend(record.features.unit.iter().cloned());
        vocab.building_features.extend(record.features.building.iter().cloned());
        vocab.amenities.extend(record.amenities.iter().cloned());
        vocab.train_lines.extend(
            record
                .stations
                .iter()
                .flat_map(|s| s.lines.iter().map(|l| l.name.clone())),
        );
        vocab.categories.insert(record.category.as_str().to_string());
    }
    vocab
}

/// `estate vocabulary`.
pub fn run_vocabulary(config: &Config) -> Result<()> {
    let report = ingest::load_all(&config.input)?;
    let vocab = collect_vocabulary(report.records());
    println!("{}", serde_json::to_string_pretty(&vocab)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_inputs(dir: &TempDir) {
        let rent = json!({"properties": [{
            "id": 10, "url": "u", "name": "Maison Ebisu", "type": "mansion",
            "address": {"full": "1-1 Ebisu, Shibuya-ku, Tokyo", "latitude": 35.64, "longitude": 139.71},
            "area": {"m2": 30.0},
            "price": {"monthly_total": 150000},
            "floor": "3F",
            "features": {"unit": ["Balcony", "Air Conditioning"], "building": ["Autolock"]},
            "amenities": ["Pet Negotiable"],
            "nearest_stations": [{"station_name": "Ebisu", "walk_time_min": 4, "lines": ["JR Yamanote", "Hibiya"]}],
            "images": {"main": "main.jpg"}
        }, {
            "id": 11, "url": "u", "name": "Broken", "type": "Apartment",
            "address": {"full": "x"}, "area": {"m2": 0}, "price": {"monthly_total": 1}
        }]});
        let buy = |id: u64, full: &str| json!({
            "id": id, "url": "u", "name": format!("Buy {}", id), "type": "Apartment",
            "address": {"full": full, "latitude": 35.0, "longitude": 139.0},
            "area": {"m2": 60.0},
            "price": {"total": 50_000_000}
        });
        let buys = json!({"properties": [buy(20, "1 Main St"), buy(21, "9 Other Rd")]});
        std::fs::write(dir.path().join("rent_details_1.json"), rent.to_string()).unwrap();
        std::fs::write(dir.path().join("buy_details_1.json"), buys.to_string()).unwrap();
    }

    fn load(dir: &TempDir) -> IngestReport {
        ingest::load_all(&InputConfig {
            root: dir.path().to_path_buf(),
            ..InputConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_export_adds_filter_fields() {
        let dir = TempDir::new().unwrap();
        write_inputs(&dir);
        let doc = export_document(&load(&dir)).unwrap();
        let rent = &doc["rent_details_1"][0];
        assert_eq!(rent["ward"], "Shibuya");
        assert_eq!(rent["pet_friendly"], true);
        assert_eq!(rent["floor_number"], 3);
        assert_eq!(rent["category"], "Apartment");
        assert!(rent["highlights"]["size"].as_str().unwrap().starts_with("30.0"));
        assert_eq!(doc["buy_details_1"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_validation_summary_reports_problems() {
        let dir = TempDir::new().unwrap();
        write_inputs(&dir);
        let summary = validation_summary(&load(&dir));
        assert!(summary.contains("rent_details_1.json (Rent): 1 accepted, 1 rejected"));
        assert!(summary.contains("rejected 11 (Broken) at `area.m2`"));
        assert!(summary.contains("0 multi-unit, 1 inconsistent"));
        assert!(summary.contains("ids 20, 21"));
        assert!(summary.contains("missing main image: 2"));
        assert!(summary.contains("total: 3 accepted, 1 rejected, 0 files failed"));
    }

    #[test]
    fn test_vocabulary_is_sorted_and_unique() {
        let dir = TempDir::new().unwrap();
        write_inputs(&dir);
        let report = load(&dir);
        let vocab = collect_vocabulary(report.records());
        assert_eq!(
            vocab.unit_features.iter().collect::<Vec<_>>(),
            vec!["Air Conditioning", "Balcony"]
        );
        assert_eq!(
            vocab.train_lines.iter().collect::<Vec<_>>(),
            vec!["Hibiya", "JR Yamanote"]
        );
        assert_eq!(vocab.categories.iter().collect::<Vec<_>>(), vec!["Apartment"]);
        assert!(vocab.amenities.contains("Pet Negotiable"));
    }
}
