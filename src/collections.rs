//! Collection maintenance: `estate collections …`.
//!
//! | Action | Effect | Confirmation |
//! |--------|--------|--------------|
//! | `list` | Collection names with point counts | no |
//! | `indexes [NAME]` | Declared payload indexes | no |
//! | `clear NAME` | Delete every point, keep the collection | yes |
//! | `delete-ids NAME ID…` | Delete the given point ids | yes |
//! | `drop NAME` | Delete the collection | yes |
//! | `clear-all` | Clear every collection | yes |
//!
//! Destructive actions ask `(y/n)` unless `--yes` is given. A missing
//! collection is reported with a warning and nothing happens.

use anyhow::Result;
use clap::Subcommand;
use std::io::{BufRead, Write};
use tracing::{info, warn};

use estate_index_core::store::VectorStore;

use crate::config::{Config, Stage};
use crate::qdrant::QdrantStore;

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CollectionsAction {
    /// List collections and their point counts.
    List,
    /// Show the payload indexes of a collection (default: the configured one).
    Indexes { name: Option<String> },
    /// Delete every point in a collection.
    Clear { name: String },
    /// Delete points by id.
    DeleteIds {
        name: String,
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Delete a collection entirely.
    Drop { name: String },
    /// Delete every point in every collection.
    ClearAll,
}

/// Ask `question` and read a `y`/`n` answer. Anything but `y`/`yes` is no.
pub fn confirm(question: &str, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<bool> {
    write!(out, "{} (y/n): ", question)?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Run `action` against `store`.
///
/// `assume_yes` skips confirmation; otherwise answers are read from `input`
/// and prompts written to `out`, which also receives the listing output.
pub async fn execute(
    store: &dyn VectorStore,
    action: &CollectionsAction,
    default_collection: &str,
    assume_yes: bool,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<()> {
    let mut approved = |question: String, out: &mut dyn Write| -> Result<bool> {
        if assume_yes || confirm(&question, &mut *input, out)? {
            Ok(true)
        } else {
            info!("Deletion cancelled");
            Ok(false)
        }
    };

    match action {
        CollectionsAction::List => {
            let names = store.list_collections().await?;
            if names.is_empty() {
                writeln!(out, "No collections found.")?;
            }
            for name in names {
                let count = store.count(&name).await?;
                writeln!(out, "{}\t{} points", name, count)?;
            }
        }
        CollectionsAction::Indexes { name } => {
            let name = name.as_deref().unwrap_or(default_collection);
            if !exists_or_warn(store, name).await? {
                return Ok(());
            }
            let indexes = store.payload_indexes(name).await?;
            writeln!(out, "{}: {} payload indexes", name, indexes.len())?;
            for (field, kind) in indexes {
                writeln!(out, "  {}\t{}", field, kind.as_str())?;
            }
        }
        CollectionsAction::Clear { name } => {
            if !exists_or_warn(store, name).await? {
                return Ok(());
            }
            if approved(format!("Are you sure you want to delete all records in {}?", name), &mut *out)? {
                store.clear(name).await?;
                info!(collection = %name, "deleted all records");
            }
        }
        CollectionsAction::DeleteIds { name, ids } => {
            if ids.is_empty() {
                warn!("No IDs provided for deletion");
                return Ok(());
            }
            if !exists_or_warn(store, name).await? {
                return Ok(());
            }
            let question = format!(
                "Are you sure you want to delete {} records from {}?",
                ids.len(),
                name
            );
            if approved(question, &mut *out)? {
                store.delete_points(name, ids).await?;
                info!(collection = %name, count = ids.len(), "deleted records");
            }
        }
        CollectionsAction::Drop { name } => {
            if !exists_or_warn(store, name).await? {
                return Ok(());
            }
            if approved(format!("Are you sure you want to drop collection {}?", name), &mut *out)? {
                store.delete_collection(name).await?;
                info!(collection = %name, "dropped collection");
            }
        }
        CollectionsAction::ClearAll => {
            let names = store.list_collections().await?;
            if names.is_empty() {
                info!("No collections to clear");
                return Ok(());
            }
            if approved(
                "Are you sure you want to delete all records in all collections?".to_string(),
                &mut *out,
            )? {
                for name in names {
                    store.clear(&name).await?;
                    info!(collection = %name, "deleted all records");
                }
            }
        }
    }
    Ok(())
}

async fn exists_or_warn(store: &dyn VectorStore, name: &str) -> Result<bool> {
    let exists = store.collection_exists(name).await?;
    if !exists {
        warn!(collection = name, "collection does not exist");
    }
    Ok(exists)
}

/// `estate collections`.
pub async fn run_collections(config: &Config, action: &CollectionsAction, assume_yes: bool) -> Result<()> {
    config.require_credentials(Stage::Maintenance)?;
    let store = QdrantStore::from_env(&config.vector_store)?;
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();
    execute(
        &store,
        action,
        &config.vector_store.collection,
        assume_yes,
        &mut input,
        &mut out,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_index_core::payload::PayloadIndexKind;
    use estate_index_core::store::memory::InMemoryStore;
    use estate_index_core::store::{Distance, Point};
    use serde_json::json;

    async fn store_with(ids: &[u64]) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.create_collection("real_estate", 1, Distance::Cosine).await.unwrap();
        let points = ids
            .iter()
            .map(|&id| Point {
                id,
                vector: vec![1.0],
                payload: json!({}),
            })
            .collect();
        store.upsert("real_estate", points).await.unwrap();
        store
    }

    async fn run(store: &InMemoryStore, action: CollectionsAction, answer: &str, yes: bool) -> String {
        let mut input = answer.as_bytes();
        let mut out = Vec::new();
        execute(store, &action, "real_estate", yes, &mut input, &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_list_shows_counts() {
        let store = store_with(&[1, 2]).await;
        let out = run(&store, CollectionsAction::List, "", false).await;
        assert_eq!(out, "real_estate\t2 points\n");
    }

    #[tokio::test]
    async fn test_declined_prompt_keeps_points() {
        let store = store_with(&[1, 2]).await;
        let out = run(
            &store,
            CollectionsAction::Clear {
                name: "real_estate".into(),
            },
            "n\n",
            false,
        )
        .await;
        assert!(out.contains("Are you sure you want to delete all records in real_estate? (y/n): "));
        assert_eq!(store.count("real_estate").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_confirmed_delete_ids() {
        let store = store_with(&[1, 2, 3]).await;
        run(
            &store,
            CollectionsAction::DeleteIds {
                name: "real_estate".into(),
                ids: vec![1, 3],
            },
            "y\n",
            false,
        )
        .await;
        assert_eq!(store.count("real_estate").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_yes_flag_skips_prompt() {
        let store = store_with(&[1]).await;
        let out = run(&store, CollectionsAction::ClearAll, "", true).await;
        assert!(out.is_empty());
        assert_eq!(store.count("real_estate").await.unwrap(), 0);

        run(
            &store,
            CollectionsAction::Drop {
                name: "real_estate".into(),
            },
            "",
            true,
        )
        .await;
        assert!(!store.collection_exists("real_estate").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_collection_is_a_no_op() {
        let store = store_with(&[1]).await;
        let out = run(
            &store,
            CollectionsAction::Clear {
                name: "nope".into(),
            },
            "y\n",
            false,
        )
        .await;
        assert!(out.is_empty());
        assert_eq!(store.count("real_estate").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_indexes_default_collection() {
        let store = store_with(&[]).await;
        store
            .create_payload_index("real_estate", "ward", PayloadIndexKind::Keyword)
            .await
            .unwrap();
        let out = run(&store, CollectionsAction::Indexes { name: None }, "", false).await;
        assert_eq!(out, "real_estate: 1 payload indexes\n  ward\tkeyword\n");
    }
}
