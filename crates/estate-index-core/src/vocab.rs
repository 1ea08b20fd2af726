//! Closed vocabularies for listing classification.
//!
//! Raw listings spell these values inconsistently ("short_term",
//! "Short-Term", "mansion", "Office / Store"). Coercion from raw strings
//! happens here and only here; everything downstream sees the enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing kind. Stamped from the input batch, never read from the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Rent,
    Buy,
    #[serde(rename = "Short-Term")]
    ShortTerm,
}

impl PropertyType {
    pub const ALL: [PropertyType; 3] = [PropertyType::Rent, PropertyType::Buy, PropertyType::ShortTerm];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Rent => "Rent",
            PropertyType::Buy => "Buy",
            PropertyType::ShortTerm => "Short-Term",
        }
    }

    /// Parse a user- or LLM-supplied label (`"rent"`, `"Short-Term"`, `"short_term"`, `"purchase"`).
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "rent" | "rental" => Some(PropertyType::Rent),
            "buy" | "purchase" | "sale" => Some(PropertyType::Buy),
            "shortterm" | "shortstay" | "monthly" => Some(PropertyType::ShortTerm),
            _ => None,
        }
    }

    /// Infer the batch type from an input file stem such as `buy_details_20250519`.
    ///
    /// `short_term` is checked before `rent` so that `short_term_rent_*`
    /// style names resolve to [`PropertyType::ShortTerm`].
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let stem = stem.to_ascii_lowercase();
        if stem.starts_with("short_term") || stem.starts_with("short-term") {
            Some(PropertyType::ShortTerm)
        } else if stem.starts_with("buy") {
            Some(PropertyType::Buy)
        } else if stem.starts_with("rent") {
            Some(PropertyType::Rent)
        } else {
            None
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Building/listing category (the raw `type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Apartment,
    House,
    #[serde(rename = "Office/Store")]
    OfficeStore,
    Land,
    Building,
    Parking,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Apartment => "Apartment",
            Category::House => "House",
            Category::OfficeStore => "Office/Store",
            Category::Land => "Land",
            Category::Building => "Building",
            Category::Parking => "Parking",
            Category::Other => "Other",
        }
    }

    /// Coerce a raw category string. Unknown values become [`Category::Other`].
    pub fn coerce(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        if lower.is_empty() {
            return Category::Other;
        }
        if lower.contains("office") || lower.contains("store") || lower.contains("shop") {
            Category::OfficeStore
        } else if lower.contains("apartment") || lower.contains("mansion") || lower.contains("condo") {
            Category::Apartment
        } else if lower.contains("house") {
            Category::House
        } else if lower.contains("land") {
            Category::Land
        } else if lower.contains("parking") {
            Category::Parking
        } else if lower.contains("building") {
            Category::Building
        } else {
            Category::Other
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sale status of a Buy listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingStatus {
    Available,
    #[serde(rename = "Under Contract")]
    UnderContract,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Available => "Available",
            ListingStatus::UnderContract => "Under Contract",
            ListingStatus::Sold => "Sold",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "available" | "for sale" => Some(ListingStatus::Available),
            "under contract" | "under_contract" | "pending" => Some(ListingStatus::UnderContract),
            "sold" => Some(ListingStatus::Sold),
            _ => None,
        }
    }
}

/// Category of a nearby facility, derived by keyword matching on free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityCategory {
    Supermarket,
    #[serde(rename = "Convenience Store")]
    ConvenienceStore,
    Park,
    #[serde(rename = "Drug Store")]
    DrugStore,
    #[serde(rename = "Cafe/Restaurant")]
    CafeRestaurant,
    #[serde(rename = "Other Facility")]
    Other,
}

/// Keyword table, checked in order. Matches are case-insensitive and on
/// word boundaries.
const FACILITY_KEYWORDS: &[(&str, FacilityCategory)] = &[
    ("supermarket", FacilityCategory::Supermarket),
    ("convenience store", FacilityCategory::ConvenienceStore),
    ("konbini", FacilityCategory::ConvenienceStore),
    ("park", FacilityCategory::Park),
    ("drug store", FacilityCategory::DrugStore),
    ("drugstore", FacilityCategory::DrugStore),
    ("pharmacy", FacilityCategory::DrugStore),
    ("cafe", FacilityCategory::CafeRestaurant),
    ("café", FacilityCategory::CafeRestaurant),
    ("coffee", FacilityCategory::CafeRestaurant),
    ("restaurant", FacilityCategory::CafeRestaurant),
];

impl FacilityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityCategory::Supermarket => "Supermarket",
            FacilityCategory::ConvenienceStore => "Convenience Store",
            FacilityCategory::Park => "Park",
            FacilityCategory::DrugStore => "Drug Store",
            FacilityCategory::CafeRestaurant => "Cafe/Restaurant",
            FacilityCategory::Other => "Other Facility",
        }
    }

    /// Classify free text (a facility name or mapping key).
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase().replace('_', " ");
        FACILITY_KEYWORDS
            .iter()
            .find(|(keyword, _)| contains_word(&lower, keyword))
            .map(|(_, category)| *category)
            .unwrap_or(FacilityCategory::Other)
    }
}

impl fmt::Display for FacilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True if `needle` occurs in `haystack` bounded by non-alphanumerics.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let begin = start + pos;
        let end = begin + needle.len();
        let before_ok = haystack[..begin]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        // Plural "s" is allowed ("Parks", "Supermarkets").
        let mut rest = haystack[end..].chars();
        let after_ok = match rest.next() {
            None => true,
            Some('s') => rest.next().map_or(true, |c| !c.is_alphanumeric()),
            Some(c) => !c.is_alphanumeric(),
        };
        if before_ok && after_ok {
            return true;
        }
        start = begin + needle.chars().next().map_or(1, char::len_utf8);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_labels() {
        assert_eq!(PropertyType::parse("Short-Term"), Some(PropertyType::ShortTerm));
        assert_eq!(PropertyType::parse("short_term"), Some(PropertyType::ShortTerm));
        assert_eq!(PropertyType::parse(" rent "), Some(PropertyType::Rent));
        assert_eq!(PropertyType::parse("Purchase"), Some(PropertyType::Buy));
        assert_eq!(PropertyType::parse("lease-to-own"), None);
    }

    #[test]
    fn test_property_type_serializes_with_hyphen() {
        let json = serde_json::to_string(&PropertyType::ShortTerm).unwrap();
        assert_eq!(json, "\"Short-Term\"");
    }

    #[test]
    fn test_property_type_from_file_stem() {
        assert_eq!(
            PropertyType::from_file_stem("rent_details_20250519"),
            Some(PropertyType::Rent)
        );
        assert_eq!(
            PropertyType::from_file_stem("buy_details_20250519"),
            Some(PropertyType::Buy)
        );
        assert_eq!(
            PropertyType::from_file_stem("short_term_details_20250519"),
            Some(PropertyType::ShortTerm)
        );
        assert_eq!(PropertyType::from_file_stem("schema"), None);
    }

    #[test]
    fn test_category_coercion() {
        assert_eq!(Category::coerce("Apartment"), Category::Apartment);
        assert_eq!(Category::coerce("mansion"), Category::Apartment);
        assert_eq!(Category::coerce("Office / Store"), Category::OfficeStore);
        assert_eq!(Category::coerce("Detached House"), Category::House);
        assert_eq!(Category::coerce("Land"), Category::Land);
        assert_eq!(Category::coerce("Castle"), Category::Other);
    }

    #[test]
    fn test_facility_keywords() {
        assert_eq!(FacilityCategory::classify("Maruetsu Supermarket"), FacilityCategory::Supermarket);
        assert_eq!(FacilityCategory::classify("CONVENIENCE STORE"), FacilityCategory::ConvenienceStore);
        assert_eq!(FacilityCategory::classify("Yoyogi Park"), FacilityCategory::Park);
        assert_eq!(FacilityCategory::classify("Matsumoto Drugstore"), FacilityCategory::DrugStore);
        assert_eq!(FacilityCategory::classify("drug store"), FacilityCategory::DrugStore);
        assert_eq!(FacilityCategory::classify("Starbucks Cafe"), FacilityCategory::CafeRestaurant);
        assert_eq!(FacilityCategory::classify("Family restaurant"), FacilityCategory::CafeRestaurant);
        assert_eq!(FacilityCategory::classify("City Hospital"), FacilityCategory::Other);
    }

    #[test]
    fn test_parking_is_not_a_park() {
        assert_eq!(FacilityCategory::classify("Parking lot"), FacilityCategory::Other);
        assert_eq!(FacilityCategory::classify("Two parks nearby"), FacilityCategory::Park);
    }

    #[test]
    fn test_snake_case_keys_classify() {
        assert_eq!(FacilityCategory::classify("drug_store"), FacilityCategory::DrugStore);
        assert_eq!(
            FacilityCategory::classify("convenience_store"),
            FacilityCategory::ConvenienceStore
        );
    }

    #[test]
    fn test_facility_category_label() {
        let json = serde_json::to_string(&FacilityCategory::Other).unwrap();
        assert_eq!(json, "\"Other Facility\"");
        assert_eq!(FacilityCategory::CafeRestaurant.as_str(), "Cafe/Restaurant");
    }
}
