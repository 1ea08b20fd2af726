//! # estate-index CLI (`estate`)
//!
//! Normalizes scraped Tokyo real-estate listings, indexes them into a
//! Qdrant collection, and answers natural-language searches against it.
//!
//! ## Usage
//!
//! ```bash
//! estate --config ./config/estate.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `estate validate` | Load every input file and report rejected records |
//! | `estate export` | Write normalized records as JSON |
//! | `estate vocabulary` | Print distinct features, amenities and train lines |
//! | `estate index` | Embed and upsert listings into the collection |
//! | `estate search "<query>"` | Natural-language search |
//! | `estate collections <action>` | List, inspect, clear or drop collections |
//!
//! ## Examples
//!
//! ```bash
//! # Check a new data drop
//! estate validate
//!
//! # Count what would be indexed
//! estate index --dry-run
//!
//! # Rebuild the collection from scratch
//! estate index --recreate
//!
//! estate search "pet friendly 2LDK near Shibuya under 250k"
//! estate collections clear real_estate --yes
//! ```
//!
//! Secrets come from the environment (`OPENAI_API_KEY`, `QDRANT_API_KEY`,
//! `QDRANT_URL`); a `.env` file in the working directory is loaded first.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use estate_index::collections::{self, CollectionsAction};
use estate_index::config;
use estate_index::export;
use estate_index::index_cmd::{self, IndexOptions};
use estate_index::search;

/// estate-index: normalize, index and search real-estate listings.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/estate.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "estate",
    about = "Normalize, index and search real-estate listings",
    version,
    long_about = "estate-index reads scraped listing exports (Buy, Rent, Short-Term), \
    normalizes and validates them, embeds a semantic description of each listing, and \
    stores it in a Qdrant collection with filterable payload fields. Searches are parsed \
    into structured filters by an intent extractor and grouped by building."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/estate.toml")]
    config: PathBuf,

    /// Debug-level logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every input file and report accepted and rejected records.
    ///
    /// Also reports Buy listings that share coordinates with a different
    /// address, and records missing coordinates or a main image.
    Validate,

    /// Export normalized records as JSON, keyed by input file.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Records per file to print after writing `--output`.
        #[arg(long, default_value_t = 5)]
        sample: usize,
    },

    /// Print the distinct unit features, building features, amenities,
    /// train lines and categories found in the inputs.
    Vocabulary,

    /// Embed listings and upsert them into the vector store.
    Index {
        /// Drop and recreate the collection first.
        #[arg(long)]
        recreate: bool,

        /// Load and count only; no embedding or store calls.
        #[arg(long)]
        dry_run: bool,

        /// Override `indexing.batch_size`.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Index at most this many records.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Search listings with a natural-language query.
    Search {
        query: String,

        /// Maximum number of units (default: `search.limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Print the parsed intent, filter and results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Vector-store maintenance.
    Collections {
        #[command(subcommand)]
        action: CollectionsAction,

        /// Skip confirmation prompts.
        #[arg(long, short, global = true)]
        yes: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Validate => {
            export::run_validate(&cfg)?;
        }
        Commands::Export { output, sample } => {
            export::run_export(&cfg, output.as_deref(), sample)?;
        }
        Commands::Vocabulary => {
            export::run_vocabulary(&cfg)?;
        }
        Commands::Index {
            recreate,
            dry_run,
            batch_size,
            limit,
        } => {
            let options = IndexOptions {
                recreate,
                dry_run,
                batch_size,
                limit,
            };
            index_cmd::run_index(&cfg, &options).await?;
        }
        Commands::Search { query, limit, json } => {
            search::run_search(&cfg, &query, limit, json).await?;
        }
        Commands::Collections { action, yes } => {
            collections::run_collections(&cfg, &action, yes).await?;
        }
    }

    Ok(())
}
