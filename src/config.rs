//! Configuration parsing and validation.
//!
//! estate-index is configured via a TOML file (default: `config/estate.toml`).
//! Every section is optional; omitted sections take the defaults below.
//!
//! # Example Configuration
//!
//! ```toml
//! [input]
//! root = "data/json"
//! include_globs = ["**/*_details_*.json"]
//!
//! [embedding]
//! provider = "openai"        # "disabled" | "openai" | "local"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [indexing]
//! batch_size = 32
//!
//! [vector_store]
//! url = "http://localhost:6333"
//! collection = "real_estate"
//!
//! [intent]
//! provider = "openai"        # "disabled" | "openai"
//! model = "gpt-4o"
//!
//! [geocoding]
//! provider = "disabled"      # "disabled" | "nominatim"
//! radius_m = 2000
//!
//! [search]
//! limit = 10
//! ```
//!
//! # Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `QDRANT_URL` | Overrides `vector_store.url` |
//! | `QDRANT_API_KEY` | Sent as the `api-key` header |
//! | `OPENAI_API_KEY` | Required by the `openai` embedding and intent providers |
//!
//! Secrets are never read from the TOML file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub intent: IntentConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Where listing exports are discovered.
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_input_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root: default_input_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_input_root() -> PathBuf {
    PathBuf::from("data/json")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*_details_*.json".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    32
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_distance")]
    pub distance: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            collection: default_collection(),
            distance: default_distance(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_collection() -> String {
    "real_estate".to_string()
}
fn default_distance() -> String {
    "Cosine".to_string()
}

/// Natural-language query → structured intent.
#[derive(Debug, Deserialize, Clone)]
pub struct IntentConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_intent_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_intent_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_intent_model() -> String {
    "gpt-4o".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_geocoding_url")]
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: default_geocoding_url(),
            user_agent: default_user_agent(),
            radius_m: default_radius_m(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_geocoding_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}
fn default_user_agent() -> String {
    concat!("estate-index/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_radius_m() -> f64 {
    2000.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

fn default_limit() -> usize {
    10
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Which command is about to run; decides which credentials are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Index,
    Search,
    Maintenance,
}

impl Config {
    /// Check fatal preconditions before any processing starts.
    ///
    /// `OPENAI_API_KEY` is required when an OpenAI-backed provider will be
    /// called in this stage; a vector-store URL is required by every stage
    /// that talks to the store.
    pub fn require_credentials(&self, stage: Stage) -> Result<()> {
        let needs_openai = match stage {
            Stage::Index => self.embedding.provider == "openai",
            Stage::Search => self.embedding.provider == "openai" || self.intent.provider == "openai",
            Stage::Maintenance => false,
        };
        if needs_openai && !env_set("OPENAI_API_KEY") {
            bail!("OPENAI_API_KEY environment variable not set");
        }
        if matches!(stage, Stage::Index | Stage::Search) && !self.embedding.is_enabled() {
            bail!("embedding.provider is 'disabled'; set it to 'openai' or 'local' to index or search");
        }
        if self.vector_store.url.trim().is_empty() {
            bail!("vector store URL not set (vector_store.url or QDRANT_URL)");
        }
        Ok(())
    }
}

fn env_set(name: &str) -> bool {
    std::env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Read, parse and validate a config file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if let Ok(url) = std::env::var("QDRANT_URL") {
        if !url.trim().is_empty() {
            config.vector_store.url = url;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.input.include_globs.is_empty() {
        bail!("input.include_globs must not be empty");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or local.",
            other
        ),
    }
    if config.embedding.provider == "openai" {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0 when provider is 'openai'");
        }
        if config.embedding.model.is_none() {
            bail!("embedding.model must be specified when provider is 'openai'");
        }
    }

    if config.indexing.batch_size == 0 {
        bail!("indexing.batch_size must be > 0");
    }

    if config.vector_store.collection.trim().is_empty() {
        bail!("vector_store.collection must not be empty");
    }
    if estate_index_core::store::Distance::parse(&config.vector_store.distance).is_none() {
        bail!(
            "Unknown vector_store.distance: '{}'. Must be Cosine, Dot, or Euclid.",
            config.vector_store.distance
        );
    }

    match config.intent.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown intent provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    match config.geocoding.provider.as_str() {
        "disabled" | "nominatim" => {}
        other => bail!(
            "Unknown geocoding provider: '{}'. Must be disabled or nominatim.",
            other
        ),
    }
    if config.geocoding.radius_m.is_nan() || config.geocoding.radius_m <= 0.0 {
        bail!("geocoding.radius_m must be > 0");
    }

    if config.search.limit == 0 {
        bail!("search.limit must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(toml_text: &str) -> Result<Config> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml_text.as_bytes()).unwrap();
        load_config(file.path())
    }

    #[test]
    fn test_empty_file_takes_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.input.root, PathBuf::from("data/json"));
        assert_eq!(config.indexing.batch_size, 32);
        assert_eq!(config.vector_store.collection, "real_estate");
        assert_eq!(config.intent.model, "gpt-4o");
        assert_eq!(config.search.limit, 10);
        assert!(!config.embedding.is_enabled());
    }

    #[test]
    fn test_openai_embedding_requires_model_and_dims() {
        let err = parse("[embedding]\nprovider = \"openai\"\n").unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));

        let ok = parse(
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536\n",
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_rejects_unknown_values() {
        assert!(parse("[embedding]\nprovider = \"ollama\"\n").is_err());
        assert!(parse("[intent]\nprovider = \"anthropic\"\n").is_err());
        assert!(parse("[geocoding]\nprovider = \"google\"\n").is_err());
        assert!(parse("[vector_store]\ndistance = \"Manhattan\"\n").is_err());
        assert!(parse("[indexing]\nbatch_size = 0\n").is_err());
        assert!(parse("[geocoding]\nradius_m = 0\n").is_err());
    }

    #[test]
    fn test_disabled_embedding_cannot_index() {
        let config = Config::default();
        let err = config.require_credentials(Stage::Index).unwrap_err();
        assert!(err.to_string().contains("disabled"));
        assert!(config.require_credentials(Stage::Maintenance).is_ok());
    }
}
