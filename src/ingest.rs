//! Input discovery and loading.
//!
//! Walks `input.root`, selects listing exports with include/exclude globs,
//! infers each file's [`PropertyType`] from its stem (`rent_details_*`,
//! `buy_details_*`, `short_term_details_*`) and runs every item through
//! [`estate_index_core::preprocess`].
//!
//! Failures are contained at the narrowest level:
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Unreadable or unparseable file | File skipped, [`FileOutcome::Failed`] |
//! | Invalid record | Record skipped, listed as a [`Rejection`] |
//! | Unknown file stem | File not discovered, warning logged |

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use estate_index_core::diagnostics::{coordinate_clusters, ClusterKind, CoordinateCluster};
use estate_index_core::preprocess::raw_label;
use estate_index_core::{preprocess, PropertyRecord, PropertyType, RecordError};

use crate::config::InputConfig;

/// A discovered listing export.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub path: PathBuf,
    /// Path relative to the input root, `/`-separated.
    pub relative: String,
    pub stem: String,
    pub property_type: PropertyType,
}

/// A raw record that failed normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// `"{id} ({name})"`, best effort.
    pub label: String,
    pub error: RecordError,
}

#[derive(Debug)]
pub enum FileOutcome {
    Loaded {
        records: Vec<PropertyRecord>,
        rejected: Vec<Rejection>,
    },
    Failed {
        error: anyhow::Error,
    },
}

#[derive(Debug)]
pub struct FileReport {
    pub file: InputFile,
    pub outcome: FileOutcome,
}

/// Aggregated result of loading every discovered file.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub files: Vec<FileReport>,
    /// Buy listings sharing exact coordinates.
    pub clusters: Vec<CoordinateCluster>,
}

impl IngestReport {
    /// Accepted records across all files, in discovery order.
    pub fn records(&self) -> impl Iterator<Item = &PropertyRecord> {
        self.files.iter().flat_map(|f| match &f.outcome {
            FileOutcome::Loaded { records, .. } => records.as_slice(),
            FileOutcome::Failed { .. } => &[][..],
        })
    }

    pub fn into_records(self) -> Vec<PropertyRecord> {
        self.files
            .into_iter()
            .flat_map(|f| match f.outcome {
                FileOutcome::Loaded { records, .. } => records,
                FileOutcome::Failed { .. } => Vec::new(),
            })
            .collect()
    }

    pub fn accepted(&self) -> usize {
        self.records().count()
    }

    pub fn rejected(&self) -> usize {
        self.files
            .iter()
            .map(|f| match &f.outcome {
                FileOutcome::Loaded { rejected, .. } => rejected.len(),
                FileOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn failed_files(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed { .. }))
            .count()
    }
}

/// Find listing exports under `input.root`, sorted by relative path.
pub fn discover(input: &InputConfig) -> Result<Vec<InputFile>> {
    let root = &input.root;
    if !root.exists() {
        bail!("Input root does not exist: {}", root.display());
    }

    let include_set = build_globset(&input.include_globs)?;

    let mut excludes = vec!["**/.git/**".to_string()];
    excludes.extend(input.exclude_globs.clone());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(input.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some(property_type) = PropertyType::from_file_stem(&stem) else {
            warn!(file = %rel_str, "cannot infer property type from file name, skipping");
            continue;
        };

        files.push(InputFile {
            path: path.to_path_buf(),
            relative: rel_str,
            stem,
            property_type,
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

/// Parse one export's text into records and rejections.
///
/// The document must be an object with a `properties` array. An error here
/// means the whole file is unusable.
pub fn parse_export(
    content: &str,
    property_type: PropertyType,
) -> Result<(Vec<PropertyRecord>, Vec<Rejection>)> {
    let doc: Value = serde_json::from_str(content).context("invalid JSON")?;
    let items = doc
        .get("properties")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("missing top-level 'properties' array"))?;

    let mut records = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for item in items {
        match preprocess(item, property_type) {
            Ok(record) => records.push(record),
            Err(error) => rejected.push(Rejection {
                label: raw_label(item),
                error,
            }),
        }
    }
    Ok((records, rejected))
}

/// Load one file. Never fails; problems are captured in the outcome.
pub fn load_file(file: &InputFile) -> FileOutcome {
    let parsed = std::fs::read_to_string(&file.path)
        .with_context(|| format!("Failed to read {}", file.path.display()))
        .and_then(|content| parse_export(&content, file.property_type));

    match parsed {
        Ok((records, rejected)) => {
            for r in &rejected {
                warn!(file = %file.relative, record = %r.label, "skipping record: {}", r.error);
            }
            info!(
                file = %file.relative,
                property_type = %file.property_type,
                accepted = records.len(),
                rejected = rejected.len(),
                "loaded"
            );
            FileOutcome::Loaded { records, rejected }
        }
        Err(error) => {
            error!(file = %file.relative, "skipping file: {:#}", error);
            FileOutcome::Failed { error }
        }
    }
}

/// Discover and load every input, then run the duplicate-coordinate check.
pub fn load_all(input: &InputConfig) -> Result<IngestReport> {
    let files = discover(input)?;
    if files.is_empty() {
        warn!(root = %input.root.display(), "no listing exports found");
    }

    let mut report = IngestReport::default();
    for file in files {
        let outcome = load_file(&file);
        report.files.push(FileReport { file, outcome });
    }

    // Only accepted records take part; rejected items never reach the check.
    report.clusters = coordinate_clusters(report.records());
    log_clusters(&report.clusters);

    Ok(report)
}

fn log_clusters(clusters: &[CoordinateCluster]) {
    for c in clusters {
        match c.kind {
            ClusterKind::Inconsistent => warn!(
                lat = c.latitude,
                lon = c.longitude,
                ids = ?c.ids,
                addresses = ?c.addresses,
                "buy listings share coordinates but not addresses"
            ),
            ClusterKind::MultiUnit => debug!(
                lat = c.latitude,
                lon = c.longitude,
                ids = ?c.ids,
                "multi-unit building"
            ),
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn listing(id: u64, monthly: Value) -> Value {
        json!({
            "id": id,
            "url": format!("https://example.test/{}", id),
            "name": format!("Listing {}", id),
            "type": "Apartment",
            "address": {"full": "1-2-3 Jingumae, Shibuya-ku, Tokyo"},
            "area": {"m2": 25.5},
            "price": {"monthly_total": monthly}
        })
    }

    fn input_for(dir: &TempDir) -> InputConfig {
        InputConfig {
            root: dir.path().to_path_buf(),
            ..InputConfig::default()
        }
    }

    #[test]
    fn test_parse_export_splits_accepted_and_rejected() {
        let doc = json!({"properties": [
            listing(1, json!(98000)),
            {"property": listing(2, json!("120,000"))},
            listing(3, Value::Null),
        ]});
        let (records, rejected) = parse_export(&doc.to_string(), PropertyType::Rent).unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].label, "3 (Listing 3)");
        assert_eq!(rejected[0].error.path(), "price.monthly_total");
    }

    #[test]
    fn test_parse_export_requires_properties_array() {
        assert!(parse_export("[]", PropertyType::Rent).is_err());
        assert!(parse_export("{not json", PropertyType::Rent).is_err());
    }

    #[test]
    fn test_discover_infers_type_and_filters() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        for name in [
            "rent_details_20250519.json",
            "nested/short_term_details_1.json",
            "buy_details_x.json",
            "notes_details_1.json",
            "rent_summary.json",
        ] {
            std::fs::write(dir.path().join(name), "{\"properties\": []}").unwrap();
        }

        let files = discover(&input_for(&dir)).unwrap();
        let got: Vec<(&str, PropertyType)> = files
            .iter()
            .map(|f| (f.relative.as_str(), f.property_type))
            .collect();
        assert_eq!(
            got,
            vec![
                ("buy_details_x.json", PropertyType::Buy),
                ("nested/short_term_details_1.json", PropertyType::ShortTerm),
                ("rent_details_20250519.json", PropertyType::Rent),
            ]
        );
    }

    #[test]
    fn test_load_all_contains_bad_file() {
        let dir = TempDir::new().unwrap();
        let good = json!({"properties": [listing(1, json!(98000)), listing(2, json!("x"))]});
        std::fs::write(dir.path().join("rent_details_a.json"), good.to_string()).unwrap();
        std::fs::write(dir.path().join("rent_details_b.json"), "{ broken").unwrap();

        let report = load_all(&input_for(&dir)).unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.accepted(), 1);
        assert_eq!(report.rejected(), 1);
        assert_eq!(report.failed_files(), 1);
        assert_eq!(report.into_records()[0].id, 1);
    }

    #[test]
    fn test_clusters_use_accepted_buy_records_only() {
        let dir = TempDir::new().unwrap();
        let buy = |id: u64, full: &str, total: Value| {
            json!({
                "id": id, "url": "u", "name": format!("Buy {}", id), "type": "Apartment",
                "address": {"full": full, "latitude": 35.0, "longitude": 139.0},
                "area": {"m2": 60.0},
                "price": {"total": total}
            })
        };
        let doc = json!({"properties": [
            buy(1, "1 Main St", json!(50_000_000)),
            buy(2, "9 Other Rd", Value::Null),
        ]});
        std::fs::write(dir.path().join("buy_details_a.json"), doc.to_string()).unwrap();

        let report = load_all(&input_for(&dir)).unwrap();
        assert_eq!(report.rejected(), 1);
        assert!(report.clusters.is_empty());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let input = InputConfig {
            root: PathBuf::from("/definitely/not/here"),
            ..InputConfig::default()
        };
        assert!(discover(&input).is_err());
    }
}
