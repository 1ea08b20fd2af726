//! Vector-store abstraction.
//!
//! The [`VectorStore`] trait covers every operation the indexer, the
//! search flow and the collection maintenance commands need, so that the
//! remote store (Qdrant over REST, in the app crate) and the
//! [`memory::InMemoryStore`] used in tests are interchangeable.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`create_collection`](VectorStore::create_collection) | Create a collection for `dims`-sized vectors |
//! | [`delete_collection`](VectorStore::delete_collection) | Drop a collection and its points |
//! | [`collection_exists`](VectorStore::collection_exists) | Existence check |
//! | [`list_collections`](VectorStore::list_collections) | Names of all collections |
//! | [`create_payload_index`](VectorStore::create_payload_index) | Declare a filterable payload field |
//! | [`payload_indexes`](VectorStore::payload_indexes) | Declared payload indexes |
//! | [`upsert`](VectorStore::upsert) | Insert-or-overwrite points by id |
//! | [`query`](VectorStore::query) | Filtered nearest-neighbor search |
//! | [`delete_points`](VectorStore::delete_points) | Delete points by id |
//! | [`clear`](VectorStore::clear) | Delete every point, keep the collection |
//! | [`count`](VectorStore::count) | Number of points |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::filter::Filter;
use crate::payload::PayloadIndexKind;

/// Similarity metric of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Dot => "Dot",
            Distance::Euclid => "Euclid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Some(Distance::Cosine),
            "dot" => Some(Distance::Dot),
            "euclid" | "euclidean" => Some(Distance::Euclid),
            _ => None,
        }
    }
}

/// A point to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// A query hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: u64,
    pub score: f32,
    pub payload: Value,
}

/// Abstract vector store.
///
/// Operations on a missing collection return an error, except
/// [`collection_exists`](VectorStore::collection_exists) and
/// [`delete_collection`](VectorStore::delete_collection), which report
/// `false` instead.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn create_collection(&self, name: &str, dims: usize, distance: Distance) -> Result<()>;

    /// Returns whether a collection was actually removed.
    async fn delete_collection(&self, name: &str) -> Result<bool>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    async fn create_payload_index(
        &self,
        collection: &str,
        field: &str,
        kind: PayloadIndexKind,
    ) -> Result<()>;

    async fn payload_indexes(&self, collection: &str) -> Result<Vec<(String, PayloadIndexKind)>>;

    /// Insert or overwrite points keyed by id.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;

    /// Nearest neighbors of `vector` among points matching `filter`,
    /// best first.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>>;

    async fn delete_points(&self, collection: &str, ids: &[u64]) -> Result<()>;

    async fn clear(&self, collection: &str) -> Result<()>;

    async fn count(&self, collection: &str) -> Result<u64>;
}
