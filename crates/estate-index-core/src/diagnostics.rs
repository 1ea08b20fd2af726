//! Duplicate-coordinate diagnostic for Buy listings.
//!
//! Buy exports occasionally geocode unrelated listings to the same point.
//! Listings that share exact coordinates are grouped; a group whose
//! addresses disagree is flagged [`ClusterKind::Inconsistent`], otherwise it
//! is treated as a legitimate multi-unit building. This never rejects a
//! record; the caller decides how loudly to log.

use std::collections::HashMap;

use crate::models::PropertyRecord;
use crate::vocab::PropertyType;

/// How a group of co-located listings should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterKind {
    /// Same base address: several units of one building.
    MultiUnit,
    /// Different addresses at one point: probably a data error.
    Inconsistent,
}

/// Two or more Buy listings at exactly the same coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateCluster {
    pub latitude: f64,
    pub longitude: f64,
    pub ids: Vec<u64>,
    /// Distinct `address.full` values, first-seen order.
    pub addresses: Vec<String>,
    pub kind: ClusterKind,
}

/// Group Buy records by exact `(latitude, longitude)`.
///
/// Non-Buy records and records without coordinates are ignored. Clusters
/// come back in the order their first member appears in `records`.
pub fn coordinate_clusters<'a>(
    records: impl IntoIterator<Item = &'a PropertyRecord>,
) -> Vec<CoordinateCluster> {
    let mut order: Vec<(u64, u64)> = Vec::new();
    let mut groups: HashMap<(u64, u64), Vec<&PropertyRecord>> = HashMap::new();

    for record in records {
        if record.property_type() != PropertyType::Buy {
            continue;
        }
        let Some((lat, lon)) = record.coordinates() else {
            continue;
        };
        let key = (lat.to_bits(), lon.to_bits());
        let members = groups.entry(key).or_default();
        if members.is_empty() {
            order.push(key);
        }
        members.push(record);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let members = groups.remove(&key)?;
            if members.len() < 2 {
                return None;
            }
            let mut addresses: Vec<String> = Vec::new();
            for m in &members {
                if !addresses.contains(&m.address.full) {
                    addresses.push(m.address.full.clone());
                }
            }
            let first_base = base_address(&addresses[0]);
            let kind = if addresses.iter().all(|a| base_address(a) == first_base) {
                ClusterKind::MultiUnit
            } else {
                ClusterKind::Inconsistent
            };
            Some(CoordinateCluster {
                latitude: f64::from_bits(key.0),
                longitude: f64::from_bits(key.1),
                ids: members.iter().map(|m| m.id).collect(),
                addresses,
                kind,
            })
        })
        .collect()
}

const UNIT_MARKERS: &[&str] = &["unit ", "room ", "apt ", "apt. ", "#", "no. "];

/// `address.full` with trailing unit segments removed:
/// `"1 Main St, Unit A"` → `"1 Main St"`. Unit markers match in any case;
/// the remaining text is compared as written.
pub fn base_address(full: &str) -> String {
    let mut segments: Vec<&str> = full.split(',').map(str::trim).collect();
    while segments.len() > 1 {
        let last = segments[segments.len() - 1].to_lowercase();
        if UNIT_MARKERS.iter().any(|m| last.starts_with(m)) {
            segments.pop();
        } else {
            break;
        }
    }
    segments.join(", ")
}
