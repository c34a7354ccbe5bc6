//! Configuration management for vetrag
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Secrets never live in the file: each section names the environment
//! variable that holds its API key.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Upper bound for `embedding.max_retries` and `generation.max_retries`
pub const MAX_REQUEST_RETRIES: u32 = 10;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the corpus lives
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Answer generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Corpus location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Folder scanned (non-recursively) for documents
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    /// Additional individual files to ingest
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_max_chars")]
    pub max_chars: usize,

    /// Overlap characters between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap_chars: usize,
}

/// Embedding configuration (OpenAI-compatible `/v1/embeddings`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// API base URL
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    /// Texts per embedding request
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Retries per request for transient failures
    #[serde(default = "default_embedding_retries")]
    pub max_retries: usize,
}

/// Which vector index implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// In-process index rebuilt on every start
    #[default]
    Local,
    /// Durable named Qdrant collection
    Qdrant,
}

impl std::fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexBackend::Local => write!(f, "local"),
            IndexBackend::Qdrant => write!(f, "qdrant"),
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Backend selection
    #[serde(default)]
    pub backend: IndexBackend,

    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Environment variable name for Qdrant API key
    #[serde(default = "default_qdrant_api_key_env")]
    pub qdrant_api_key_env: String,

    /// Qdrant collection name
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Chunks per remote write batch
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,

    /// Upper bound on waiting for a freshly created collection
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,

    /// First readiness poll interval; doubles up to 8x
    #[serde(default = "default_ready_poll_interval")]
    pub ready_poll_interval_ms: u64,

    /// Timeout for individual index requests
    #[serde(default = "default_index_request_timeout")]
    pub request_timeout_secs: u64,

    /// Re-ingest the corpus into the remote index at startup
    #[serde(default = "default_ingest_on_startup")]
    pub ingest_on_startup: bool,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Passages retrieved per question
    #[serde(default = "default_query_k")]
    pub default_k: usize,

    /// Passages scoring below this are not used as context (0.0 - 1.0)
    #[serde(default = "default_query_min_score")]
    pub min_score: f32,
}

/// Generation configuration (OpenAI-compatible `/v1/chat/completions`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// API base URL
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Chat model
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_generation_temperature")]
    pub temperature: f32,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Retries for rate limits and server errors
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,

    /// Language the answer is written in
    #[serde(default = "default_answer_language")]
    pub language: String,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for vetrag data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            files: Vec::new(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_max_chars(),
            overlap_chars: default_chunk_overlap(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_key_env: default_openai_api_key_env(),
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            qdrant_url: default_qdrant_url(),
            qdrant_api_key_env: default_qdrant_api_key_env(),
            collection_name: default_collection_name(),
            batch_size: default_index_batch_size(),
            ready_timeout_secs: default_ready_timeout(),
            ready_poll_interval_ms: default_ready_poll_interval(),
            request_timeout_secs: default_index_request_timeout(),
            ingest_on_startup: default_ingest_on_startup(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_k: default_query_k(),
            min_score: default_query_min_score(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_generation_model(),
            temperature: default_generation_temperature(),
            api_key_env: default_openai_api_key_env(),
            timeout_secs: default_generation_timeout(),
            max_retries: default_generation_retries(),
            language: default_answer_language(),
        }
    }
}

impl IndexConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Get the default base directory for vetrag (~/.vetrag)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vetrag")
    }

    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Fresh default config rooted at `base_dir`, ready to be saved
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        let mut config = Config::default();
        config.init_paths(Some(base_dir));
        config
    }

    /// Get the Qdrant API key from environment
    pub fn qdrant_api_key(&self) -> Option<String> {
        read_env(&self.index.qdrant_api_key_env)
    }

    /// Get the embedding API key; required
    pub fn embedding_api_key(&self) -> Result<String> {
        require_env(&self.embedding.api_key_env, "embedding")
    }

    /// Get the generation API key; required
    pub fn generation_api_key(&self) -> Result<String> {
        require_env(&self.generation.api_key_env, "generation")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.max_chars == 0 {
            return Err(Error::Config("chunk.max_chars must be positive".to_string()));
        }

        if self.chunk.overlap_chars >= self.chunk.max_chars {
            return Err(Error::Config(
                "chunk.overlap_chars must be < chunk.max_chars".to_string(),
            ));
        }

        // Windows end no earlier than max/2 past their start, so the overlap
        // must stay below that to guarantee forward progress.
        if self.chunk.overlap_chars > self.chunk.max_chars / 2 {
            return Err(Error::Config(
                "chunk.overlap_chars must be <= chunk.max_chars / 2".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be positive".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 || self.index.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size and index.batch_size must be positive".to_string(),
            ));
        }

        if self.query.default_k == 0 {
            return Err(Error::Config("query.default_k must be positive".to_string()));
        }

        if self.query.min_score < 0.0 || self.query.min_score > 1.0 {
            return Err(Error::Config(
                "query.min_score must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.generation.temperature < 0.0 || self.generation.temperature > 2.0 {
            return Err(Error::Config(
                "generation.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.embedding.max_retries > MAX_REQUEST_RETRIES as usize
            || self.generation.max_retries > MAX_REQUEST_RETRIES
        {
            return Err(Error::Config(format!(
                "embedding.max_retries and generation.max_retries must be <= {}",
                MAX_REQUEST_RETRIES
            )));
        }

        if self.index.backend == IndexBackend::Qdrant && self.index.collection_name.is_empty() {
            return Err(Error::Config(
                "index.collection_name must be set for the qdrant backend".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse an API base URL so that relative endpoint paths join under it
///
/// `https://gw.example/openai` and `https://gw.example/openai/` both resolve
/// `v1/embeddings` to `https://gw.example/openai/v1/embeddings`.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn read_env(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn require_env(name: &str, section: &str) -> Result<String> {
    read_env(name).ok_or_else(|| {
        Error::Config(format!(
            "Missing {} API key: environment variable '{}' is not set",
            section, name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunk.max_chars, 1000);
        assert_eq!(config.chunk.overlap_chars, 150);
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.index.batch_size, 100);
        assert_eq!(config.index.backend, IndexBackend::Local);
        assert_eq!(config.query.default_k, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::with_base_dir(tmp.path().to_path_buf());
        config.index.backend = IndexBackend::Qdrant;
        config.index.collection_name = "test_collection".to_string();

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(loaded.index.backend, IndexBackend::Qdrant);
        assert_eq!(loaded.index.collection_name, "test_collection");

        let direct = Config::load(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(direct.paths.base_dir, tmp.path());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[chunk]\nmax_chars = 400\n\n[index]\nbackend = \"qdrant\"\n")
            .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.chunk.max_chars, 400);
        assert_eq!(config.chunk.overlap_chars, 150);
        assert_eq!(config.index.backend, IndexBackend::Qdrant);
        assert_eq!(config.generation.model, "gpt-4o");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        // Invalid: overlap >= max
        config.chunk.overlap_chars = config.chunk.max_chars;
        assert!(config.validate().is_err());

        // Invalid: overlap beyond half a window
        config.chunk.overlap_chars = config.chunk.max_chars / 2 + 1;
        assert!(config.validate().is_err());

        config.chunk.overlap_chars = 100;
        assert!(config.validate().is_ok());

        config.index.batch_size = 0;
        assert!(config.validate().is_err());
        config.index.batch_size = 100;

        config.query.min_score = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_counts_are_bounded() {
        let mut config = Config::default();
        config.generation.max_retries = MAX_REQUEST_RETRIES;
        assert!(config.validate().is_ok());

        config.generation.max_retries = 32;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_retries"));

        config.generation.max_retries = 2;
        config.embedding.max_retries = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let url = parse_base_url("https://gw.example/openai").unwrap();
        assert_eq!(
            url.join("v1/embeddings").unwrap().as_str(),
            "https://gw.example/openai/v1/embeddings"
        );

        let url = parse_base_url("https://api.openai.com").unwrap();
        assert_eq!(
            url.join("v1/chat/completions").unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );

        let url = parse_base_url("http://localhost:8080/proxy/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/proxy/");
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let mut config = Config::default();
        config.generation.api_key_env = "VETRAG_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let err = config.generation_api_key().unwrap_err();
        assert!(err.to_string().contains("VETRAG_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
