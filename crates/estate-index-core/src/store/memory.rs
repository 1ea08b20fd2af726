//! In-memory [`VectorStore`] implementation for tests and dry runs.
//!
//! Collections live in a `HashMap` behind `std::sync::RwLock`. Queries
//! evaluate the filter against each payload with [`Filter::matches`] and
//! rank by brute-force cosine similarity, regardless of the collection's
//! declared distance.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::filter::Filter;
use crate::payload::PayloadIndexKind;

use super::{Distance, Point, ScoredPoint, VectorStore};

struct Collection {
    dims: usize,
    _distance: Distance,
    points: BTreeMap<u64, Point>,
    indexes: Vec<(String, PayloadIndexKind)>,
}

/// In-memory vector store.
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(name: &str) -> anyhow::Error {
    anyhow!("collection '{}' does not exist", name)
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn create_collection(&self, name: &str, dims: usize, distance: Distance) -> Result<()> {
        let mut collections = self.write()?;
        if collections.contains_key(name) {
            bail!("collection '{}' already exists", name);
        }
        collections.insert(
            name.to_string(),
            Collection {
                dims,
                _distance: distance,
                points: BTreeMap::new(),
                indexes: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        Ok(self.write()?.remove(name).is_some())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        field: &str,
        kind: PayloadIndexKind,
    ) -> Result<()> {
        let mut collections = self.write()?;
        let c = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        c.indexes.retain(|(f, _)| f != field);
        c.indexes.push((field.to_string(), kind));
        Ok(())
    }

    async fn payload_indexes(&self, collection: &str) -> Result<Vec<(String, PayloadIndexKind)>> {
        let collections = self.read()?;
        let c = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(c.indexes.clone())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let mut collections = self.write()?;
        let c = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        if let Some(bad) = points.iter().find(|p| p.vector.len() != c.dims) {
            bail!(
                "point {} has {} dims, collection '{}' expects {}",
                bad.id,
                bad.vector.len(),
                collection,
                c.dims
            );
        }
        for point in points {
            c.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.read()?;
        let c = collections.get(collection).ok_or_else(|| missing(collection))?;
        let mut hits: Vec<ScoredPoint> = c
            .points
            .values()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.payload)))
            .map(|p| ScoredPoint {
                id: p.id,
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_points(&self, collection: &str, ids: &[u64]) -> Result<()> {
        let mut collections = self.write()?;
        let c = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        for id in ids {
            c.points.remove(id);
        }
        Ok(())
    }

    async fn clear(&self, collection: &str) -> Result<()> {
        let mut collections = self.write()?;
        let c = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        c.points.clear();
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let collections = self.read()?;
        let c = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(c.points.len() as u64)
    }
}
