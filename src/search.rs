//! Natural-language search over the indexed collection.
//!
//! ```text
//! query ──▶ intent extractor ──▶ QueryIntent ──┬──▶ build_filter ──┐
//!   │                               (location)─▶ geocoder ─────────┤
//!   └──▶ embedding provider ──▶ query vector ──────────────────────┴──▶ VectorStore::query
//!                                                                           │
//!                                                         group_hits ◀──────┘
//! ```
//!
//! An extractor or geocoder failure degrades the search (fewer filters);
//! an embedding or store failure aborts it.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fmt::Write as _;
use tracing::{debug, info, warn};

use estate_index_core::derive::format_thousands;
use estate_index_core::embedding::EmbeddingProvider;
use estate_index_core::filter::{build_filter, Filter, GeoPoint, QueryIntent};
use estate_index_core::results::{group_hits, ResultGroup};
use estate_index_core::store::VectorStore;

use crate::config::{Config, Stage};
use crate::embedding::{create_provider, embed_query};
use crate::geocode::{create_geocoder, Geocoder};
use crate::intent::{create_extractor, extract_or_default, IntentExtractor};
use crate::qdrant::QdrantStore;

/// Everything a search produced, for rendering.
#[derive(Debug)]
pub struct SearchOutcome {
    pub intent: QueryIntent,
    pub geo: Option<GeoPoint>,
    pub filter: Option<Filter>,
    pub groups: Vec<ResultGroup>,
}

/// Collaborators of one search.
pub struct Searcher<'a> {
    pub store: &'a dyn VectorStore,
    pub embedder: &'a dyn EmbeddingProvider,
    pub extractor: &'a dyn IntentExtractor,
    pub geocoder: &'a dyn Geocoder,
    pub collection: &'a str,
    pub radius_m: f64,
}

impl Searcher<'_> {
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchOutcome> {
        let intent = extract_or_default(self.extractor, query).await;

        let geo = match intent.location.as_deref() {
            Some(place) if !place.trim().is_empty() => match self.geocoder.locate(place).await {
                Ok(point) => point,
                Err(e) => {
                    warn!(place, "geocoding failed, falling back to station match: {:#}", e);
                    None
                }
            },
            _ => None,
        };

        let filter = build_filter(&intent, geo, self.radius_m);
        debug!(filter = ?filter.as_ref().map(Filter::to_json), "search filter");

        let vector = embed_query(self.embedder, query)
            .await
            .context("Failed to embed query")?;
        let hits = self
            .store
            .query(self.collection, &vector, filter.as_ref(), limit)
            .await
            .context("Vector search failed")?;
        info!(hits = hits.len(), filtered = filter.is_some(), "search complete");

        Ok(SearchOutcome {
            intent,
            geo,
            filter,
            groups: group_hits(&hits),
        })
    }
}

/// Console rendering, one block per building.
pub fn render_groups(groups: &[ResultGroup]) -> String {
    if groups.is_empty() {
        return "No results found.\n".to_string();
    }

    let mut out = String::new();
    for group in groups {
        let property_type = group.property_type.as_deref().unwrap_or("Unknown");
        let is_buy = property_type == "Buy";
        let _ = writeln!(
            out,
            "\nBuilding: {} ({} unit{}, Type: {})",
            group.building_key,
            group.count(),
            if group.count() > 1 { "s" } else { "" },
            property_type
        );
        for unit in &group.units {
            let price = match unit.price {
                Some(p) if is_buy => format!("¥{} (Purchase)", format_thousands(p)),
                Some(p) => format!("¥{}/month", format_thousands(p)),
                None => "N/A".to_string(),
            };
            let _ = writeln!(
                out,
                "- Unit: {} (ID: {}) [score {:.3}]",
                unit.name.as_deref().unwrap_or("(unnamed)"),
                unit.id,
                unit.score
            );
            if let Some(n) = &unit.unit_number {
                let _ = writeln!(out, "  Unit Number: {}", n);
            }
            let _ = writeln!(out, "  Price: {}", price);
            match unit.area_m2 {
                Some(a) => {
                    let _ = writeln!(out, "  Area: {} m2", a);
                }
                None => {
                    let _ = writeln!(out, "  Area: N/A");
                }
            }
            let _ = writeln!(out, "  Floor: {}", unit.floor.as_deref().unwrap_or("N/A"));
            let _ = writeln!(
                out,
                "  Amenities: {}",
                if unit.amenities.is_empty() {
                    "None".to_string()
                } else {
                    unit.amenities.join(", ")
                }
            );
            if !unit.stations.is_empty() {
                let _ = writeln!(out, "  Stations: {}", unit.stations.join("; "));
            }
            let _ = writeln!(out, "  Address: {}", unit.address.as_deref().unwrap_or("N/A"));
            let _ = writeln!(out, "  Main Image: {}", unit.main_image.as_deref().unwrap_or("N/A"));
            let _ = writeln!(out, "  Floorplan: {}", unit.floorplan.as_deref().unwrap_or("N/A"));
        }
    }
    out
}

/// Machine-readable rendering for `--json`.
pub fn outcome_json(query: &str, outcome: &SearchOutcome) -> Value {
    json!({
        "query": query,
        "intent": outcome.intent,
        "geo": outcome.geo,
        "filter": outcome.filter.as_ref().map(Filter::to_json),
        "results": outcome.groups,
    })
}

/// `estate search`.
pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    as_json: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results found.");
        return Ok(());
    }
    config.require_credentials(Stage::Search)?;

    let embedder = create_provider(&config.embedding)?;
    let extractor = create_extractor(&config.intent)?;
    let geocoder = create_geocoder(&config.geocoding)?;
    let store = QdrantStore::from_env(&config.vector_store)?;
    let limit = limit.unwrap_or(config.search.limit).max(1);

    info!(query, limit, "executing search");
    let searcher = Searcher {
        store: &store,
        embedder: embedder.as_ref(),
        extractor: extractor.as_ref(),
        geocoder: geocoder.as_ref(),
        collection: &config.vector_store.collection,
        radius_m: config.geocoding.radius_m,
    };
    let outcome = searcher.search(query, limit).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome_json(query, &outcome))?);
    } else {
        print!("{}", render_groups(&outcome.groups));
    }
    Ok(())
}
