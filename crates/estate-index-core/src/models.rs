//! Canonical listing types.
//!
//! A [`PropertyRecord`] is only ever built by [`crate::preprocess`]; once
//! built it is never mutated. Derived values (station accessibility,
//! descriptions, keywords) are computed from it on demand and never stored
//! alongside their inputs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::vocab::{Category, FacilityCategory, ListingStatus, PropertyType};

/// Fully normalized, validated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: u64,
    pub url: String,
    pub name: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    /// `None` when the source floor was absent, blank, or the `"0F"` sentinel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    pub address: Address,
    pub area: Area,
    pub price: Price,
    pub stations: Vec<Station>,
    pub features: Features,
    /// Unified amenities: unique, first-seen order.
    pub amenities: Vec<String>,
    pub facilities: Vec<Facility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<Contract>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_cost: Option<InitialCostEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<BuildingInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Images>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_notes: Option<BuildingNotes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Requirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_notes: Option<String>,
}

impl PropertyRecord {
    /// Listing kind, implied by the price variant.
    pub fn property_type(&self) -> PropertyType {
        self.price.terms.property_type()
    }

    /// Layout from `details.layout`.
    pub fn layout(&self) -> Option<&str> {
        self.details.as_ref().and_then(|d| d.layout.as_deref())
    }

    /// Coordinates, when both halves are known.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.address.latitude, self.address.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub full: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub m2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ft2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_m2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_ft2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub currency: String,
    #[serde(flatten)]
    pub terms: PriceTerms,
}

/// Price fields, one variant per property type.
///
/// Each variant's headline field is non-optional (Short-Term requires at
/// least one of its two monthly fields), so a record that reaches this type
/// is always usable for price filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "property_type")]
pub enum PriceTerms {
    Buy {
        total: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        management_fee: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        repair_reserve: Option<u64>,
    },
    Rent {
        monthly_total: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        rent: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        management_fee: Option<u64>,
    },
    #[serde(rename = "Short-Term")]
    ShortTerm {
        #[serde(skip_serializing_if = "Option::is_none")]
        monthly_total: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        short_term_monthly_total: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        short_term_weekly_total: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        short_term_daily_total: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cleaning_fee: Option<u64>,
    },
}

impl PriceTerms {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PriceTerms::Buy { .. } => PropertyType::Buy,
            PriceTerms::Rent { .. } => PropertyType::Rent,
            PriceTerms::ShortTerm { .. } => PropertyType::ShortTerm,
        }
    }

    pub fn total(&self) -> Option<u64> {
        match self {
            PriceTerms::Buy { total, .. } => Some(*total),
            _ => None,
        }
    }

    pub fn monthly_total(&self) -> Option<u64> {
        match self {
            PriceTerms::Rent { monthly_total, .. } => Some(*monthly_total),
            PriceTerms::ShortTerm { monthly_total, .. } => *monthly_total,
            PriceTerms::Buy { .. } => None,
        }
    }

    pub fn short_term_monthly_total(&self) -> Option<u64> {
        match self {
            PriceTerms::ShortTerm {
                short_term_monthly_total,
                ..
            } => *short_term_monthly_total,
            _ => None,
        }
    }

    pub fn management_fee(&self) -> Option<u64> {
        match self {
            PriceTerms::Buy { management_fee, .. } | PriceTerms::Rent { management_fee, .. } => {
                *management_fee
            }
            PriceTerms::ShortTerm { .. } => None,
        }
    }

    /// The value a search result shows as "the price": total for Buy,
    /// otherwise the first known monthly figure.
    pub fn headline(&self) -> Option<Headline> {
        self.total().map(Headline::Total).or_else(|| {
            self.monthly_total()
                .or(self.short_term_monthly_total())
                .map(Headline::Monthly)
        })
    }
}

/// Headline price with its period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Headline {
    Total(u64),
    Monthly(u64),
}

impl Headline {
    pub fn value(&self) -> u64 {
        match self {
            Headline::Total(v) | Headline::Monthly(v) => *v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub station_name: String,
    pub walk_time_min: u32,
    pub lines: Vec<TrainLine>,
}

impl Station {
    /// Synthetic 0–100 score: two points lost per walking minute, five
    /// gained per line served.
    pub fn accessibility_score(&self) -> u32 {
        let raw = 100 - 2 * i64::from(self.walk_time_min) + 5 * self.lines.len() as i64;
        raw.clamp(0, 100) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainLine {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub unit: Vec<String>,
    pub building: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub category: FacilityCategory,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialCostEstimate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_month_rent: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarantor_service: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire_insurance: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_fee: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_floors: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_units: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Details {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balcony_direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_rights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Images {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floorplan: Option<String>,
    pub thumbnails: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingNotes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub japanese_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarantor_required: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(walk: u32, lines: usize) -> Station {
        Station {
            station_name: "Shibuya".into(),
            walk_time_min: walk,
            lines: (0..lines)
                .map(|i| TrainLine {
                    name: format!("Line {}", i),
                    company: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_accessibility_example() {
        assert_eq!(station(5, 2).accessibility_score(), 100);
        assert_eq!(station(10, 1).accessibility_score(), 85);
    }

    #[test]
    fn test_accessibility_clamped() {
        assert_eq!(station(0, 12).accessibility_score(), 100);
        assert_eq!(station(60, 0).accessibility_score(), 0);
    }

    #[test]
    fn test_accessibility_monotonic() {
        for lines in 0..6 {
            let mut prev = u32::MAX;
            for walk in 0..=60 {
                let score = station(walk, lines).accessibility_score();
                assert!(score <= prev, "walk {} lines {}", walk, lines);
                assert!(score <= 100);
                prev = score;
            }
        }
        for walk in 0..=60 {
            let mut prev = 0;
            for lines in 0..10 {
                let score = station(walk, lines).accessibility_score();
                assert!(score >= prev, "walk {} lines {}", walk, lines);
                prev = score;
            }
        }
    }

    #[test]
    fn test_headline_priority() {
        let buy = PriceTerms::Buy {
            total: 85_000_000,
            management_fee: Some(12_000),
            repair_reserve: None,
        };
        assert_eq!(buy.headline(), Some(Headline::Total(85_000_000)));

        let short = PriceTerms::ShortTerm {
            monthly_total: None,
            short_term_monthly_total: Some(240_000),
            short_term_weekly_total: None,
            short_term_daily_total: None,
            cleaning_fee: None,
        };
        assert_eq!(short.headline(), Some(Headline::Monthly(240_000)));

        let short_both = PriceTerms::ShortTerm {
            monthly_total: Some(200_000),
            short_term_monthly_total: Some(240_000),
            short_term_weekly_total: None,
            short_term_daily_total: None,
            cleaning_fee: None,
        };
        assert_eq!(short_both.headline(), Some(Headline::Monthly(200_000)));
    }

    #[test]
    fn test_price_serializes_flat_with_tag() {
        let price = Price {
            currency: "JPY".into(),
            terms: PriceTerms::Rent {
                monthly_total: 150_000,
                rent: Some(140_000),
                management_fee: Some(10_000),
            },
        };
        let v = serde_json::to_value(&price).unwrap();
        assert_eq!(v["property_type"], "Rent");
        assert_eq!(v["monthly_total"], 150_000);
        assert_eq!(v["currency"], "JPY");
    }
}
