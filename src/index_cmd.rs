//! Embedding and upserting normalized listings.
//!
//! [`index_documents`] is the batch driver: it only talks to the
//! [`EmbeddingProvider`] and [`VectorStore`] traits, one batch at a time.
//! A batch whose embedding or upsert fails is logged and skipped; the
//! remaining batches still run. Nothing is retried.
//!
//! [`run_index`] wires it to the configured input, provider and Qdrant
//! collection for the `estate index` command.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use estate_index_core::embedding::EmbeddingProvider;
use estate_index_core::payload::{IndexDocument, PAYLOAD_INDEXES};
use estate_index_core::store::{Distance, Point, VectorStore};

use crate::config::{Config, Stage};
use crate::embedding::create_provider;
use crate::ingest;
use crate::qdrant::QdrantStore;

/// Outcome of one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub batches: usize,
    pub indexed: usize,
    pub failed_batches: usize,
    pub failed_points: usize,
}

/// Command-line options for `estate index`.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Drop and recreate the collection first.
    pub recreate: bool,
    pub dry_run: bool,
    pub batch_size: Option<usize>,
    pub limit: Option<usize>,
}

/// Embed and upsert `docs` in batches of `batch_size`.
pub async fn index_documents(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    collection: &str,
    docs: &[IndexDocument],
    batch_size: usize,
) -> IndexReport {
    let mut report = IndexReport::default();

    for (n, batch) in docs.chunks(batch_size.max(1)).enumerate() {
        report.batches += 1;
        let first_id = batch.first().map(|d| d.id).unwrap_or_default();

        match index_batch(store, embedder, collection, batch).await {
            Ok(()) => {
                report.indexed += batch.len();
                info!(batch = n + 1, size = batch.len(), "indexed batch");
            }
            Err(e) => {
                report.failed_batches += 1;
                report.failed_points += batch.len();
                error!(
                    batch = n + 1,
                    size = batch.len(),
                    first_id,
                    "skipping batch: {:#}",
                    e
                );
            }
        }
    }

    report
}

async fn index_batch(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    collection: &str,
    batch: &[IndexDocument],
) -> Result<()> {
    let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
    let vectors = embedder
        .embed_texts(&texts)
        .await
        .context("embedding failed")?;
    if vectors.len() != batch.len() {
        return Err(anyhow!(
            "embedder returned {} vectors for {} texts",
            vectors.len(),
            batch.len()
        ));
    }

    let points: Vec<Point> = batch
        .iter()
        .zip(vectors)
        .map(|(doc, vector)| Point {
            id: doc.id,
            vector,
            payload: doc.payload.clone(),
        })
        .collect();

    store
        .upsert(collection, points)
        .await
        .context("upsert failed")
}

/// Make sure `collection` exists with every payload index declared.
///
/// With `recreate`, an existing collection is dropped first. Payload index
/// failures are logged and do not abort.
pub async fn ensure_collection(
    store: &dyn VectorStore,
    collection: &str,
    dims: usize,
    distance: Distance,
    recreate: bool,
) -> Result<()> {
    let exists = store.collection_exists(collection).await?;
    if exists && recreate {
        store.delete_collection(collection).await?;
        info!(collection, "dropped collection");
    }
    if !exists || recreate {
        store
            .create_collection(collection, dims, distance)
            .await
            .with_context(|| format!("Failed to create collection '{}'", collection))?;
        info!(collection, dims, distance = distance.as_str(), "created collection");
    }

    for (field, kind) in PAYLOAD_INDEXES {
        if let Err(e) = store.create_payload_index(collection, field, *kind).await {
            warn!(collection, field, "payload index not created: {:#}", e);
        }
    }
    Ok(())
}

/// `estate index`.
pub async fn run_index(config: &Config, options: &IndexOptions) -> Result<()> {
    if !options.dry_run {
        config.require_credentials(Stage::Index)?;
    }

    let report = ingest::load_all(&config.input)?;
    let files = report.files.len();
    let rejected = report.rejected();
    let failed_files = report.failed_files();

    let mut records = report.into_records();
    if let Some(limit) = options.limit {
        records.truncate(limit);
    }

    let docs = records
        .iter()
        .map(IndexDocument::from_record)
        .collect::<serde_json::Result<Vec<_>>>()
        .context("Failed to build index payloads")?;

    let batch_size = options.batch_size.unwrap_or(config.indexing.batch_size).max(1);
    let collection = &config.vector_store.collection;

    if options.dry_run {
        println!("index {} (dry-run)", collection);
        println!("  files: {} ({} failed)", files, failed_files);
        println!("  records rejected: {}", rejected);
        println!("  documents: {}", docs.len());
        println!("  batches: {}", docs.len().div_ceil(batch_size));
        return Ok(());
    }

    let provider = create_provider(&config.embedding)?;
    let store = QdrantStore::from_env(&config.vector_store)?;
    let distance = Distance::parse(&config.vector_store.distance)
        .ok_or_else(|| anyhow!("Unknown distance: {}", config.vector_store.distance))?;

    ensure_collection(&store, collection, provider.dims(), distance, options.recreate).await?;

    let outcome = index_documents(&store, provider.as_ref(), collection, &docs, batch_size).await;

    println!("index {}", collection);
    println!("  files: {} ({} failed)", files, failed_files);
    println!("  records rejected: {}", rejected);
    println!("  batches: {}", outcome.batches);
    println!("  indexed: {}", outcome.indexed);
    println!("  failed batches: {}", outcome.failed_batches);
    println!("  failed points: {}", outcome.failed_points);
    println!("  points in collection: {}", store.count(collection).await?);
    Ok(())
}
