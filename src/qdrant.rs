//! Qdrant vector store over its REST API.
//!
//! Implements [`VectorStore`] with plain `reqwest` calls. Every request is
//! made once; non-2xx responses become errors carrying the response body.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | create collection | `PUT /collections/{c}` |
//! | delete collection | `DELETE /collections/{c}` |
//! | list collections | `GET /collections` |
//! | exists | `GET /collections/{c}/exists` |
//! | payload indexes | `GET /collections/{c}` (`payload_schema`) |
//! | create payload index | `PUT /collections/{c}/index` |
//! | upsert | `PUT /collections/{c}/points?wait=true` |
//! | query | `POST /collections/{c}/points/query` |
//! | delete / clear | `POST /collections/{c}/points/delete?wait=true` |
//! | count | `POST /collections/{c}/points/count` |

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use estate_index_core::filter::Filter;
use estate_index_core::payload::PayloadIndexKind;
use estate_index_core::store::{Distance, Point, ScoredPoint, VectorStore};

use crate::config::VectorStoreConfig;

/// REST client for one Qdrant instance.
#[derive(Clone)]
pub struct QdrantStore {
    client: Client,
    base_url: String,
}

impl QdrantStore {
    /// Build a client for `config.url`, sending `api_key` as the `api-key`
    /// header when given.
    pub fn new(config: &VectorStoreConfig, api_key: Option<&str>) -> Result<Self> {
        let url = config.url.trim();
        anyhow::ensure!(
            url.starts_with("http://") || url.starts_with("https://"),
            "Qdrant URL must be an http(s) URL, got '{}'",
            url
        );

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key).context("invalid Qdrant API key")?,
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build Qdrant HTTP client")?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    /// Build from config, reading `QDRANT_API_KEY` from the environment.
    pub fn from_env(config: &VectorStoreConfig) -> Result<Self> {
        let api_key = std::env::var("QDRANT_API_KEY").ok();
        Self::new(config, api_key.as_deref())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Send and return the `result` member of the response envelope.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Qdrant {} request failed", what))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("Qdrant {} failed ({}): {}", what, status, body);
        }
        let mut body: Value = response
            .json()
            .await
            .with_context(|| format!("invalid Qdrant {} response", what))?;
        Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }
}

fn collection_path(name: &str) -> String {
    format!("/collections/{}", name)
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn create_collection(&self, name: &str, dims: usize, distance: Distance) -> Result<()> {
        let body = json!({
            "vectors": {"size": dims, "distance": distance.as_str()}
        });
        self.send(
            self.request(Method::PUT, &collection_path(name)).json(&body),
            "create collection",
        )
        .await?;
        debug!(collection = name, dims, "created collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        if !self.collection_exists(name).await? {
            return Ok(false);
        }
        let result = self
            .send(
                self.request(Method::DELETE, &collection_path(name)),
                "delete collection",
            )
            .await?;
        Ok(result.as_bool().unwrap_or(true))
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let result = self
            .send(
                self.request(Method::GET, &format!("{}/exists", collection_path(name))),
                "collection exists",
            )
            .await?;
        result
            .get("exists")
            .and_then(Value::as_bool)
            .ok_or_else(|| anyhow!("Qdrant exists response missing 'exists'"))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let result = self
            .send(self.request(Method::GET, "/collections"), "list collections")
            .await?;
        let mut names: Vec<String> = result
            .get("collections")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Qdrant list response missing 'collections'"))?
            .iter()
            .filter_map(|c| c.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        field: &str,
        kind: PayloadIndexKind,
    ) -> Result<()> {
        let body = json!({"field_name": field, "field_schema": kind.as_str()});
        self.send(
            self.request(
                Method::PUT,
                &format!("{}/index?wait=true", collection_path(collection)),
            )
            .json(&body),
            "create payload index",
        )
        .await?;
        Ok(())
    }

    async fn payload_indexes(&self, collection: &str) -> Result<Vec<(String, PayloadIndexKind)>> {
        let result = self
            .send(
                self.request(Method::GET, &collection_path(collection)),
                "collection info",
            )
            .await?;
        Ok(parse_payload_schema(&result))
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let points: Vec<Value> = points
            .into_iter()
            .map(|p| json!({"id": p.id, "vector": p.vector, "payload": p.payload}))
            .collect();
        self.send(
            self.request(
                Method::PUT,
                &format!("{}/points?wait=true", collection_path(collection)),
            )
            .json(&json!({ "points": points })),
            "upsert",
        )
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let mut body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            body["filter"] = filter.to_json();
        }
        let result = self
            .send(
                self.request(
                    Method::POST,
                    &format!("{}/points/query", collection_path(collection)),
                )
                .json(&body),
                "query",
            )
            .await?;
        parse_query_points(&result)
    }

    async fn delete_points(&self, collection: &str, ids: &[u64]) -> Result<()> {
        self.send(
            self.request(
                Method::POST,
                &format!("{}/points/delete?wait=true", collection_path(collection)),
            )
            .json(&json!({ "points": ids })),
            "delete points",
        )
        .await?;
        Ok(())
    }

    async fn clear(&self, collection: &str) -> Result<()> {
        // An empty `must` matches every point.
        self.send(
            self.request(
                Method::POST,
                &format!("{}/points/delete?wait=true", collection_path(collection)),
            )
            .json(&json!({"filter": {"must": []}})),
            "clear",
        )
        .await?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let result = self
            .send(
                self.request(
                    Method::POST,
                    &format!("{}/points/count", collection_path(collection)),
                )
                .json(&json!({"exact": true})),
                "count",
            )
            .await?;
        result
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("Qdrant count response missing 'count'"))
    }
}

/// Read `payload_schema` from a collection-info result, sorted by field.
/// Unknown index types are skipped.
fn parse_payload_schema(info: &Value) -> Vec<(String, PayloadIndexKind)> {
    let mut out: Vec<(String, PayloadIndexKind)> = info
        .get("payload_schema")
        .and_then(Value::as_object)
        .map(|schema| {
            schema
                .iter()
                .filter_map(|(field, entry)| {
                    let data_type = entry.get("data_type")?.clone();
                    let kind: PayloadIndexKind = serde_json::from_value(data_type).ok()?;
                    Some((field.clone(), kind))
                })
                .collect()
        })
        .unwrap_or_default();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn parse_query_points(result: &Value) -> Result<Vec<ScoredPoint>> {
    let points = result
        .get("points")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Qdrant query response missing 'points'"))?;
    points
        .iter()
        .map(|p| {
            let id = p
                .get("id")
                .and_then(Value::as_u64)
                .ok_or_else(|| anyhow!("Qdrant point without integer id: {}", p))?;
            Ok(ScoredPoint {
                id,
                score: p.get("score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
                payload: p.get("payload").cloned().unwrap_or(Value::Null),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_url() {
        let config = VectorStoreConfig {
            url: "localhost:6333".to_string(),
            ..VectorStoreConfig::default()
        };
        assert!(QdrantStore::new(&config, None).is_err());
        assert!(QdrantStore::new(&VectorStoreConfig::default(), Some("secret")).is_ok());
    }

    #[test]
    fn test_parse_payload_schema() {
        let info = json!({
            "status": "green",
            "payload_schema": {
                "ward": {"data_type": "keyword", "points": 10},
                "location": {"data_type": "geo", "points": 8},
                "description": {"data_type": "text", "points": 10},
                "area_m2": {"data_type": "float", "points": 10}
            }
        });
        assert_eq!(
            parse_payload_schema(&info),
            vec![
                ("area_m2".to_string(), PayloadIndexKind::Float),
                ("location".to_string(), PayloadIndexKind::Geo),
                ("ward".to_string(), PayloadIndexKind::Keyword),
            ]
        );
    }

    #[test]
    fn test_parse_query_points() {
        let result = json!({"points": [
            {"id": 7, "version": 1, "score": 0.91, "payload": {"name": "A"}},
            {"id": 3, "version": 1, "score": 0.5}
        ]});
        let hits = parse_query_points(&result).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 7);
        assert!((hits[0].score - 0.91).abs() < 1e-6);
        assert_eq!(hits[0].payload["name"], "A");
        assert_eq!(hits[1].payload, Value::Null);

        let bad = json!({"points": [{"id": "uuid-here", "score": 0.1}]});
        assert!(parse_query_points(&bad).is_err());
    }
}
