//! Raw listing → [`PropertyRecord`] normalization.
//!
//! This is the only place raw, loosely-typed JSON is accepted. Everything
//! past [`preprocess`] works with the canonical types in [`crate::models`].
//!
//! # Steps
//!
//! 1. Structural validation of required fields and numeric ranges.
//! 2. Facility normalization (see [`crate::facility`]).
//! 3. Amenity unification from up to four sources, deduplicated in
//!    first-seen order.
//! 4. Floor sentinel fix: `"0F"` and blank floors become absent.
//! 5. Property-type tagging: the price variant is chosen by the batch's
//!    declared [`PropertyType`], never by a field inside the record.
//!
//! # Amenity sources (in order)
//!
//! | Source | Raw path |
//! |--------|----------|
//! | Structured features | `features.unit`, `features.building` |
//! | Flat list | `amenities` |
//! | Unit notes | `unit_notes_amenities` |
//! | Facility categories | derived from `building_notes.facilities` / `facilities` |

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::RecordError;
use crate::facility::{category_labels, normalize_facilities};
use crate::models::{
    Address, Area, BuildingInfo, BuildingNotes, Contract, Details, Facility, Features, Images,
    InitialCostEstimate, Price, PriceTerms, PropertyRecord, Requirements, Station, TrainLine,
};
use crate::raw::{scalar_to_string, RawObject};
use crate::vocab::{Category, ListingStatus, PropertyType};

/// Currency assumed when a record omits `price.currency`.
pub const DEFAULT_CURRENCY: &str = "JPY";

/// Floor value some exports use for "unknown".
pub const FLOOR_SENTINEL: &str = "0F";

const MAX_WALK_MINUTES: f64 = 60.0;
const YEAR_BUILT_RANGE: std::ops::RangeInclusive<i64> = 1800..=2100;

/// Normalize one raw record declared as `property_type`.
///
/// Older exports wrap each item as `{"property": {...}}`; both shapes are
/// accepted.
pub fn preprocess(raw: &Value, property_type: PropertyType) -> Result<PropertyRecord, RecordError> {
    let root = RawObject::root(unwrap_item(raw))?;

    let id = root.u64_req("id")?;
    let url = root.str_req("url")?;
    let name = root.str_req("name")?;
    let category = Category::coerce(&root.str_req("type")?);

    let address = parse_address(&root.object_req("address")?)?;
    let area = parse_area(&root.object_req("area")?)?;
    let price = parse_price(&root.object_req("price")?, property_type)?;
    let stations = parse_stations(&root)?;

    let building = root.object("building")?.map(|b| parse_building(&b)).transpose()?;
    let raw_details = root.object("details")?;
    let details = parse_details(&root, raw_details.as_ref())?;

    let year_built = match year_in_range(&root, "year_built")? {
        Some(year) => Some(year),
        None => building.as_ref().and_then(|b| b.year_built),
    };

    let floor = match root.str_opt("floor")? {
        Some(floor) => normalize_floor(&floor),
        None => match &raw_details {
            Some(d) => d.str_opt("floor")?.and_then(|f| normalize_floor(&f)),
            None => None,
        },
    };

    let status = match root.str_opt("status")? {
        Some(s) => Some(
            ListingStatus::parse(&s)
                .ok_or_else(|| RecordError::invalid(root.path_of("status"), "listing status"))?,
        ),
        None => None,
    };

    let last_updated = match root.str_opt("last_updated")? {
        Some(s) => Some(parse_date(&s).ok_or_else(|| {
            RecordError::invalid(root.path_of("last_updated"), "date (YYYY-MM-DD)")
        })?),
        None => None,
    };

    let features = match root.object("features")? {
        Some(f) => Features {
            unit: f.str_list("unit")?,
            building: f.str_list("building")?,
        },
        None => Features::default(),
    };

    let raw_notes = root.object("building_notes")?;
    let mut facilities: Vec<Facility> = Vec::new();
    if let Some(notes) = &raw_notes {
        if let Some(value) = notes.get("facilities") {
            facilities.extend(normalize_facilities(value, &notes.path_of("facilities"))?);
        }
    }
    if let Some(value) = root.get("facilities") {
        facilities.extend(normalize_facilities(value, &root.path_of("facilities"))?);
    }

    let amenities = unify_amenities(
        features
            .unit
            .iter()
            .chain(&features.building)
            .cloned()
            .chain(root.str_list("amenities")?)
            .chain(root.str_list("unit_notes_amenities")?)
            .chain(category_labels(&facilities)),
    );

    let building_notes = match &raw_notes {
        Some(n) => {
            let notes = BuildingNotes {
                summary: n.str_opt("summary")?,
                description: n.str_opt("description")?,
            };
            (notes.summary.is_some() || notes.description.is_some()).then_some(notes)
        }
        None => None,
    };

    let contract = match root.object("contract")? {
        Some(c) => {
            let contract = Contract {
                length: c.str_opt("length")?,
                contract_type: c.str_opt("type")?,
            };
            (contract.length.is_some() || contract.contract_type.is_some()).then_some(contract)
        }
        None => None,
    };

    let initial_cost = match root.object("initial_cost_estimate")? {
        Some(c) => Some(parse_initial_cost(&c)?),
        None => root
            .object("initial_cost")?
            .map(|c| parse_initial_cost(&c))
            .transpose()?,
    };

    let images = match root.object("images")? {
        Some(i) => Some(Images {
            main: i.str_opt("main")?,
            floorplan: i.str_opt("floorplan")?,
            thumbnails: i.str_list("thumbnails")?,
        }),
        None => None,
    };

    let requirements = match root.object("requirements")? {
        Some(r) => Some(Requirements {
            japanese_required: r.bool_opt("japanese_required")?,
            guarantor_required: r.bool_opt("guarantor_required")?,
        }),
        None => None,
    };

    Ok(PropertyRecord {
        id,
        url,
        name,
        category,
        unit_number: root.str_opt("unit_number")?,
        building_id: root.str_opt("building_id")?,
        listing_id: root.str_opt("listing_id")?,
        last_updated,
        status,
        year_built,
        floor,
        address,
        area,
        price,
        stations,
        features,
        amenities,
        facilities,
        contract,
        initial_cost,
        building,
        details,
        images,
        building_notes,
        requirements,
        unit_notes: root.str_opt("unit_notes")?,
    })
}

/// Strip the legacy `{"property": {...}}` wrapper if present.
pub fn unwrap_item(raw: &Value) -> &Value {
    match raw.get("property") {
        Some(inner @ Value::Object(_)) => inner,
        _ => raw,
    }
}

/// Identifying label for logs: `"{id} ({name})"`, best effort on raw input.
pub fn raw_label(raw: &Value) -> String {
    let item = unwrap_item(raw);
    let id = item.get("id").and_then(scalar_to_string);
    let name = item.get("name").and_then(scalar_to_string);
    match (id, name) {
        (Some(id), Some(name)) => format!("{} ({})", id, name),
        (Some(id), None) => id,
        (None, Some(name)) => name,
        (None, None) => "<unidentified>".to_string(),
    }
}

/// Floor sentinel fix: `"0F"` and blank values mean "unknown".
pub fn normalize_floor(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == FLOOR_SENTINEL {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Trim, drop empties, and deduplicate preserving first-seen order.
///
/// Applying this to its own output returns the same list.
pub fn unify_amenities<I>(sources: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for item in sources {
        let item = item.trim();
        if item.is_empty() || out.iter().any(|seen| seen == item) {
            continue;
        }
        out.push(item.to_string());
    }
    out
}

fn parse_address(obj: &RawObject<'_>) -> Result<Address, RecordError> {
    let full = obj.str_req("full")?;
    let latitude = bounded(obj, "latitude", -90.0, 90.0, "latitude must be within [-90, 90]")?;
    let longitude = bounded(
        obj,
        "longitude",
        -180.0,
        180.0,
        "longitude must be within [-180, 180]",
    )?;
    let ward = match obj.str_opt("ward")? {
        Some(ward) => Some(ward),
        None => ward_from_full(&full),
    };
    Ok(Address {
        full,
        latitude,
        longitude,
        ward,
        city: obj.str_opt("city")?,
        postal_code: obj.str_opt("postal_code")?,
    })
}

/// `"1-2-3 Jingumae, Shibuya-ku, Tokyo"` → `Some("Shibuya-ku")`.
fn ward_from_full(full: &str) -> Option<String> {
    full.split(',')
        .nth(1)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_area(obj: &RawObject<'_>) -> Result<Area, RecordError> {
    let m2 = obj
        .f64_opt("m2")?
        .ok_or_else(|| RecordError::missing(obj.path_of("m2")))?;
    if m2 <= 0.0 {
        return Err(RecordError::out_of_range(obj.path_of("m2"), m2, "must be > 0"));
    }
    let ft2 = obj.f64_opt("ft2")?;
    if let Some(ft2) = ft2 {
        if ft2 <= 0.0 {
            return Err(RecordError::out_of_range(obj.path_of("ft2"), ft2, "must be > 0"));
        }
    }
    Ok(Area {
        m2,
        ft2,
        price_per_m2: obj.f64_opt("price_per_m2")?,
        price_per_ft2: obj.f64_opt("price_per_ft2")?,
    })
}

fn parse_price(obj: &RawObject<'_>, property_type: PropertyType) -> Result<Price, RecordError> {
    let currency = obj
        .str_opt("currency")?
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let terms = match property_type {
        PropertyType::Buy => PriceTerms::Buy {
            total: obj.u64_req("total")?,
            management_fee: obj.u64_opt("management_fee")?,
            repair_reserve: match obj.u64_opt("repair_reserve")? {
                Some(v) => Some(v),
                None => obj.u64_opt("repair_reserve_fund")?,
            },
        },
        PropertyType::Rent => PriceTerms::Rent {
            monthly_total: obj.u64_req("monthly_total")?,
            rent: obj.u64_opt("rent")?,
            management_fee: obj.u64_opt("management_fee")?,
        },
        PropertyType::ShortTerm => {
            let monthly_total = obj.u64_opt("monthly_total")?;
            let short_term_monthly_total = obj.u64_opt("short_term_monthly_total")?;
            if monthly_total.is_none() && short_term_monthly_total.is_none() {
                return Err(RecordError::missing(obj.path_of("monthly_total")));
            }
            PriceTerms::ShortTerm {
                monthly_total,
                short_term_monthly_total,
                short_term_weekly_total: obj.u64_opt("short_term_weekly_total")?,
                short_term_daily_total: obj.u64_opt("short_term_daily_total")?,
                cleaning_fee: obj.u64_opt("cleaning_fee")?,
            }
        }
    };
    Ok(Price { currency, terms })
}

fn parse_stations(root: &RawObject<'_>) -> Result<Vec<Station>, RecordError> {
    let key = if root.has("nearest_stations") {
        "nearest_stations"
    } else {
        "stations"
    };
    root.objects(key)?
        .iter()
        .map(parse_station)
        .collect()
}

fn parse_station(obj: &RawObject<'_>) -> Result<Station, RecordError> {
    let station_name = match obj.str_opt("station_name")? {
        Some(name) => name,
        None => obj.str_req("name").map_err(|_| RecordError::missing(obj.path_of("station_name")))?,
    };
    let walk = obj.u64_req("walk_time_min")?;
    if walk as f64 > MAX_WALK_MINUTES {
        return Err(RecordError::out_of_range(
            obj.path_of("walk_time_min"),
            walk as f64,
            "must be within [0, 60]",
        ));
    }
    Ok(Station {
        station_name,
        walk_time_min: walk as u32,
        lines: parse_lines(obj)?,
    })
}

/// Lines arrive as plain strings or as `{name, company}` objects.
fn parse_lines(obj: &RawObject<'_>) -> Result<Vec<TrainLine>, RecordError> {
    let Some(value) = obj.get("lines") else {
        return Ok(Vec::new());
    };
    let path = obj.path_of("lines");
    let items = match value {
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    let mut lines = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        match item {
            Value::Null => {}
            Value::Object(map) => {
                let field = |k: &str| map.get(k).and_then(scalar_to_string).filter(|s| !s.is_empty());
                let name = field("name")
                    .or_else(|| field("line_name"))
                    .ok_or_else(|| RecordError::missing(format!("{}.name", item_path)))?;
                lines.push(TrainLine {
                    name,
                    company: field("company"),
                });
            }
            other => {
                let name = scalar_to_string(other)
                    .ok_or_else(|| RecordError::invalid(item_path, "string or line object"))?;
                if !name.is_empty() {
                    lines.push(TrainLine {
                        name,
                        company: None,
                    });
                }
            }
        }
    }
    Ok(lines)
}

fn parse_building(obj: &RawObject<'_>) -> Result<BuildingInfo, RecordError> {
    Ok(BuildingInfo {
        structure: obj.str_opt("structure")?,
        year_built: year_in_range(obj, "year_built")?,
        total_floors: small_count(obj, "total_floors")?,
        total_units: small_count(obj, "total_units")?,
    })
}

fn parse_details(
    root: &RawObject<'_>,
    details: Option<&RawObject<'_>>,
) -> Result<Option<Details>, RecordError> {
    let from_details = |key: &str| -> Result<Option<String>, RecordError> {
        match details {
            Some(d) => d.str_opt(key),
            None => Ok(None),
        }
    };
    let layout = match from_details("layout")? {
        Some(layout) => Some(layout),
        None => root.str_opt("layout")?,
    };
    let balcony_direction = match from_details("balcony_direction")? {
        Some(b) => Some(b),
        None => root.str_opt("balcony")?,
    };
    let out = Details {
        layout,
        balcony_direction,
        land_rights: from_details("land_rights")?,
        transaction_type: from_details("transaction_type")?,
    };
    let empty = out.layout.is_none()
        && out.balcony_direction.is_none()
        && out.land_rights.is_none()
        && out.transaction_type.is_none();
    Ok((!empty).then_some(out))
}

fn parse_initial_cost(obj: &RawObject<'_>) -> Result<InitialCostEstimate, RecordError> {
    Ok(InitialCostEstimate {
        first_month_rent: obj.u64_opt("first_month_rent")?,
        guarantor_service: obj.u64_opt("guarantor_service")?,
        fire_insurance: obj.u64_opt("fire_insurance")?,
        agency_fee: obj.u64_opt("agency_fee")?,
        estimated_total: obj.u64_opt("estimated_total")?,
    })
}

fn bounded(
    obj: &RawObject<'_>,
    key: &str,
    min: f64,
    max: f64,
    reason: &'static str,
) -> Result<Option<f64>, RecordError> {
    match obj.f64_opt(key)? {
        Some(v) if !(min..=max).contains(&v) => {
            Err(RecordError::out_of_range(obj.path_of(key), v, reason))
        }
        other => Ok(other),
    }
}

fn year_in_range(obj: &RawObject<'_>, key: &str) -> Result<Option<i32>, RecordError> {
    match obj.u64_opt(key)? {
        None => Ok(None),
        Some(year) if YEAR_BUILT_RANGE.contains(&(year as i64)) => Ok(Some(year as i32)),
        Some(year) => Err(RecordError::out_of_range(
            obj.path_of(key),
            year as f64,
            "must be within 1800..=2100",
        )),
    }
}

fn small_count(obj: &RawObject<'_>, key: &str) -> Result<Option<u32>, RecordError> {
    match obj.u64_opt(key)? {
        None => Ok(None),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| RecordError::out_of_range(obj.path_of(key), n as f64, "too large")),
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
