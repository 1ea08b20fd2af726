//! # estate-index
//!
//! Semantic search over scraped Tokyo real-estate listings.
//!
//! Listing exports (one JSON file per scrape, `buy_…`, `rent_…` or
//! `short_term_…`) are normalized by [`estate_index_core`], embedded, and
//! stored in a Qdrant collection together with a flat payload that the
//! search side filters on.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐   ┌─────────┐
//! │ JSON files │──▶│ ingest       │──▶│ index_cmd    │──▶│ Qdrant  │
//! │ *_details_*│   │ (core norm.) │   │ embed+upsert │   │ (REST)  │
//! └────────────┘   └──────────────┘   └──────────────┘   └────┬────┘
//!                                                              │
//!   query ──▶ intent ──▶ filter ─┬──▶ search ◀─────────────────┘
//!             geocode ───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credential checks |
//! | [`ingest`] | Input discovery and per-file loading |
//! | [`export`] | `validate`, `export` and `vocabulary` commands |
//! | [`embedding`] | Embedding providers (OpenAI, local) |
//! | [`qdrant`] | Qdrant REST implementation of `VectorStore` |
//! | [`index_cmd`] | Batch indexing |
//! | [`intent`] | Query intent extraction |
//! | [`geocode`] | Place-name geocoding |
//! | [`search`] | Search orchestration and rendering |
//! | [`collections`] | Collection maintenance |

pub mod collections;
pub mod config;
pub mod embedding;
pub mod export;
pub mod geocode;
pub mod index_cmd;
pub mod ingest;
pub mod intent;
pub mod qdrant;
pub mod search;
