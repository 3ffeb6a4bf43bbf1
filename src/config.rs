use crate::storage::{BackendLocal, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Posts per embedding request (batched for cost efficiency)
const DEFAULT_BATCH_SIZE: usize = 100;
/// Character budget for a batched text (title prefix included)
const DEFAULT_BATCH_CHAR_LIMIT: usize = 6000;
/// Character budget for a single-post retry call
const DEFAULT_SINGLE_CHAR_LIMIT: usize = 8000;
/// Pause between batch submissions, to respect provider rate limits
const DEFAULT_BATCH_PAUSE_MS: u64 = 500;

/// Neighbors kept per post in the persisted similarity matrix
const DEFAULT_TOP_K: usize = 10;
/// Minimum score for `similar` query results
const DEFAULT_MIN_SCORE: f32 = 0.4;
/// Minimum score for an edge in the network graph
const DEFAULT_GRAPH_THRESHOLD: f32 = 0.5;
/// Most recent N posts visualized (rendering performance cap)
const DEFAULT_GRAPH_NODE_CAP: usize = 1000;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CORPUS_PATH: &str = "posts.json";

/// Configuration for the embedding provider and build pipeline
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible embeddings API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Posts per batched embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Max characters of post body submitted in a batched request
    #[serde(default = "default_batch_char_limit")]
    pub batch_char_limit: usize,

    /// Max characters of post body submitted in a single-post retry
    #[serde(default = "default_single_char_limit")]
    pub single_char_limit: usize,

    /// Milliseconds to wait between batch submissions
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_char_limit: DEFAULT_BATCH_CHAR_LIMIT,
            single_char_limit: DEFAULT_SINGLE_CHAR_LIMIT,
            batch_pause_ms: DEFAULT_BATCH_PAUSE_MS,
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_batch_char_limit() -> usize {
    DEFAULT_BATCH_CHAR_LIMIT
}

fn default_single_char_limit() -> usize {
    DEFAULT_SINGLE_CHAR_LIMIT
}

fn default_batch_pause_ms() -> u64 {
    DEFAULT_BATCH_PAUSE_MS
}

/// Configuration for similarity computation and the query layer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Neighbors kept per post in the similarity matrix (also the
    /// default result limit for `similar` queries)
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Default minimum score for `similar` query results [0.0, 1.0]
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Minimum score for a network graph edge [0.0, 1.0], inclusive
    #[serde(default = "default_graph_threshold")]
    pub graph_threshold: f32,

    /// Most recent N posts included in the network graph
    #[serde(default = "default_graph_node_cap")]
    pub graph_node_cap: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            graph_threshold: DEFAULT_GRAPH_THRESHOLD,
            graph_node_cap: DEFAULT_GRAPH_NODE_CAP,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_min_score() -> f32 {
    DEFAULT_MIN_SCORE
}

fn default_graph_threshold() -> f32 {
    DEFAULT_GRAPH_THRESHOLD
}

fn default_graph_node_cap() -> usize {
    DEFAULT_GRAPH_NODE_CAP
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Path to the corpus JSON export, relative paths resolve against
    /// the base directory
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub similarity: SimilarityConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            listen_addr: default_listen_addr(),
            embedding: EmbeddingConfig::default(),
            similarity: SimilarityConfig::default(),
            base_path: String::new(),
        }
    }
}

fn default_corpus_path() -> String {
    DEFAULT_CORPUS_PATH.to_string()
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        let emb = &self.embedding;
        if emb.batch_size == 0 {
            bail!("embedding.batch_size must be greater than 0");
        }
        if emb.batch_char_limit == 0 || emb.single_char_limit == 0 {
            bail!("embedding char limits must be greater than 0");
        }

        let sim = &self.similarity;
        if sim.top_k == 0 {
            bail!("similarity.top_k must be greater than 0");
        }
        if !(0.0..=1.0).contains(&sim.min_score) {
            bail!(
                "similarity.min_score must be between 0.0 and 1.0, got {}",
                sim.min_score
            );
        }
        if !(0.0..=1.0).contains(&sim.graph_threshold) {
            bail!(
                "similarity.graph_threshold must be between 0.0 and 1.0, got {}",
                sim.graph_threshold
            );
        }
        if sim.graph_node_cap == 0 {
            bail!("similarity.graph_node_cap must be greater than 0");
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = BackendLocal::new(Path::new(base_path))?;

        // create new if does not exist
        if !store.exists("config.yaml") {
            store.write(
                "config.yaml",
                serde_yml::to_string(&Self::default())?.as_bytes(),
            )?;
        }

        let config_str = String::from_utf8(store.read("config.yaml")?)
            .context("config file is not valid utf8")?;
        let mut config: Self =
            serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = BackendLocal::new(Path::new(&self.base_path))?;

        let config_str = serde_yml::to_string(&self)?;
        store.write("config.yaml", config_str.as_bytes())?;
        Ok(())
    }

    /// Directory holding the persisted artifacts.
    pub fn data_dir(&self) -> PathBuf {
        Path::new(&self.base_path).join("data")
    }

    pub fn corpus_path(&self) -> PathBuf {
        let path = Path::new(&self.corpus_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.base_path).join(path)
        }
    }
}

/// Resolve the base directory: `BX_BASE_PATH` if set, `~/.bx` otherwise.
pub fn base_path() -> anyhow::Result<String> {
    if let Ok(path) = std::env::var("BX_BASE_PATH") {
        return Ok(path);
    }

    let home = homedir::my_home()?
        .ok_or_else(|| anyhow::anyhow!("could not resolve home directory"))?;
    Ok(home.join(".bx").to_string_lossy().to_string())
}
