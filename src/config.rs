use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::storage::{self, StorageManager};

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_COLLECTION_URL: &str = "http://127.0.0.1:8000";
/// Distinct name for the model/config combination the pipeline last ran with.
const DEFAULT_COLLECTION_NAME: &str = "youtube_videos_gemini_std_v2";
const DEFAULT_COLLECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EMBEDDING_API_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_EMBEDDING_MODEL: &str = "models/text-embedding-004";
const DEFAULT_SEARCH_RESULTS: usize = 20;
const DEFAULT_MAX_RESULTS: usize = 50;
const DEFAULT_RERANK_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_RERANK_CANDIDATES: usize = 30;
const DEFAULT_RERANK_TEMPERATURE: f32 = 0.2;
const DEFAULT_RERANK_MAX_TAGS: usize = 8;
const DEFAULT_RERANK_MAX_DESCRIPTION_CHARS: usize = 400;
const DEFAULT_TOPIC_SNAPSHOT_PATH: &str = "data/topic_clusters.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Where the vector collection lives. The collection service is external;
/// only its REST API is spoken here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default = "default_collection_url")]
    pub url: String,

    #[serde(default = "default_collection_name")]
    pub name: String,

    #[serde(default = "default_collection_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            url: default_collection_url(),
            name: default_collection_name(),
            timeout_secs: default_collection_timeout_secs(),
        }
    }
}

/// Query-embedding service. The API key never lives in this file; it comes
/// from the `GEMINI_API_KEY` environment variable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_api_url")]
    pub api_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: default_embedding_api_url(),
            model: default_embedding_model(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// How many results a search returns when the request doesn't say.
    #[serde(default = "default_search_results")]
    pub default_results: usize,

    /// Upper bound offered by the UI's result-count slider.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_results: default_search_results(),
            max_results: default_max_results(),
        }
    }
}

/// Optional LLM reranking of the displayed order. Always fail-open: a broken
/// rerank call must never break a search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RerankConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_rerank_model")]
    pub model: String,

    /// How many candidates to retrieve and hand to the model.
    #[serde(default = "default_rerank_candidates")]
    pub candidates: usize,

    #[serde(default = "default_rerank_temperature")]
    pub temperature: f32,

    /// Caps on the candidate payload sent to the model.
    #[serde(default = "default_rerank_max_tags")]
    pub max_tags: usize,

    #[serde(default = "default_rerank_max_description_chars")]
    pub max_description_chars: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_rerank_model(),
            candidates: default_rerank_candidates(),
            temperature: default_rerank_temperature(),
            max_tags: default_rerank_max_tags(),
            max_description_chars: default_rerank_max_description_chars(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopicsConfig {
    /// Snapshot written by the external clustering job. Relative paths are
    /// resolved against the base directory.
    #[serde(default = "default_topic_snapshot_path")]
    pub snapshot_path: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_topic_snapshot_path(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub topics: TopicsConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_collection_url() -> String {
    DEFAULT_COLLECTION_URL.to_string()
}

fn default_collection_name() -> String {
    DEFAULT_COLLECTION_NAME.to_string()
}

fn default_collection_timeout_secs() -> u64 {
    DEFAULT_COLLECTION_TIMEOUT_SECS
}

fn default_embedding_api_url() -> String {
    DEFAULT_EMBEDDING_API_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_search_results() -> usize {
    DEFAULT_SEARCH_RESULTS
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_rerank_model() -> String {
    DEFAULT_RERANK_MODEL.to_string()
}

fn default_rerank_candidates() -> usize {
    DEFAULT_RERANK_CANDIDATES
}

fn default_rerank_temperature() -> f32 {
    DEFAULT_RERANK_TEMPERATURE
}

fn default_rerank_max_tags() -> usize {
    DEFAULT_RERANK_MAX_TAGS
}

fn default_rerank_max_description_chars() -> usize {
    DEFAULT_RERANK_MAX_DESCRIPTION_CHARS
}

fn default_topic_snapshot_path() -> String {
    DEFAULT_TOPIC_SNAPSHOT_PATH.to_string()
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.collection.url)
            .with_context(|| format!("collection.url is not a valid url: {}", self.collection.url))?;
        url::Url::parse(&self.embedding.api_url).with_context(|| {
            format!("embedding.api_url is not a valid url: {}", self.embedding.api_url)
        })?;

        if self.collection.name.trim().is_empty() {
            anyhow::bail!("collection.name must not be empty");
        }
        if self.collection.timeout_secs == 0 {
            anyhow::bail!("collection.timeout_secs must be greater than 0");
        }
        if self.search.default_results == 0 {
            anyhow::bail!("search.default_results must be greater than 0");
        }
        if self.search.max_results < self.search.default_results {
            anyhow::bail!(
                "search.max_results ({}) must not be below search.default_results ({})",
                self.search.max_results,
                self.search.default_results
            );
        }
        if self.rerank.candidates == 0 {
            anyhow::bail!("rerank.candidates must be greater than 0");
        }
        if !(0.0..=2.0).contains(&self.rerank.temperature) {
            anyhow::bail!(
                "rerank.temperature must be between 0.0 and 2.0, got {}",
                self.rerank.temperature
            );
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists("config.yaml") {
            store.write(
                "config.yaml",
                serde_yml::to_string(&Self::default())
                    .context("serializing default config")?
                    .as_bytes(),
            )?;
        }

        let config_str =
            String::from_utf8(store.read("config.yaml")?).context("config file is not valid utf8")?;
        let mut config: Self =
            serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).context("serializing config")? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self).context("serializing config")?;
        store.write("config.yaml", config_str.as_bytes())?;
        Ok(())
    }

    /// Absolute path of the topic snapshot.
    pub fn topic_snapshot_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.topics.snapshot_path);
        if path.is_absolute() {
            path
        } else {
            PathBuf::from(&self.base_path).join(path)
        }
    }
}
