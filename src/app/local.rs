use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::channels::{ChannelDirectory, ChannelQuery, ChannelsResponse};
use crate::config::Config;
use crate::embedding::{EmbeddingClient, QueryEmbedder};
use crate::index::{ChromaIndex, SharedIndex};
use crate::rerank::RerankService;
use crate::search::{SearchResponse, SearchService};
use crate::topics::{TopicService, TopicsResponse};
use crate::videos::VideoCard;

use super::backend::*;
use super::errors::AppError;

/// The services behind every endpoint, built once and shared. All state
/// beyond the config is interior-mutexed caches inside the services.
pub struct AppLocal {
    config: Arc<RwLock<Config>>,
    index: SharedIndex,
    search: SearchService,
    channels: ChannelDirectory,
    topics: TopicService,
}

impl AppLocal {
    pub fn new(config: Arc<RwLock<Config>>) -> Result<AppLocal, AppError> {
        let cfg = config
            .read()
            .map_err(|_| anyhow::anyhow!("config lock poisoned"))?
            .clone();

        let index: SharedIndex = Arc::new(ChromaIndex::new(&cfg.collection)?);

        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        let embedder = Box::new(EmbeddingClient::new(&cfg.embedding, api_key.clone())?);

        let rerank = if cfg.rerank.enabled && !api_key.is_empty() {
            Some(RerankService::new(
                &cfg.rerank,
                &cfg.embedding.api_url,
                api_key,
            )?)
        } else {
            if cfg.rerank.enabled {
                log::warn!("rerank.enabled is set but GEMINI_API_KEY is missing; rerank disabled");
            }
            None
        };

        Ok(Self::assemble(
            config,
            index,
            embedder,
            rerank,
            cfg.topic_snapshot_path(),
            &cfg,
        ))
    }

    /// Wire an app from explicit parts. Lets tests swap the index and the
    /// embedder for in-memory fakes.
    pub fn new_with(
        config: Arc<RwLock<Config>>,
        index: SharedIndex,
        embedder: Box<dyn QueryEmbedder>,
        snapshot_path: PathBuf,
    ) -> AppLocal {
        let cfg = config.read().expect("config lock poisoned").clone();
        Self::assemble(config, index, embedder, None, snapshot_path, &cfg)
    }

    fn assemble(
        config: Arc<RwLock<Config>>,
        index: SharedIndex,
        embedder: Box<dyn QueryEmbedder>,
        rerank: Option<RerankService>,
        snapshot_path: PathBuf,
        cfg: &Config,
    ) -> AppLocal {
        let search = SearchService::new(
            embedder,
            index.clone(),
            rerank,
            cfg.search.default_results,
            cfg.rerank.candidates,
        );
        let channels = ChannelDirectory::new(index.clone());
        let topics = TopicService::new(snapshot_path, index.clone());

        AppLocal {
            config,
            index,
            search,
            channels,
            topics,
        }
    }

    pub fn config(&self) -> Arc<RwLock<Config>> {
        self.config.clone()
    }

    fn config_snapshot(&self) -> Result<Config, AppError> {
        Ok(self
            .config
            .read()
            .map_err(|_| anyhow::anyhow!("config lock poisoned"))?
            .clone())
    }
}

impl Backend for AppLocal {
    fn search(
        &self,
        query: &str,
        num_results: Option<usize>,
    ) -> Result<SearchResponse, AppError> {
        self.search.search(query, num_results)
    }

    fn channels(&self, query: ChannelQuery) -> Result<ChannelsResponse, AppError> {
        self.channels.get_channels(query)
    }

    fn channel_videos(&self, channel: &str) -> Result<ChannelVideosResponse, AppError> {
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(AppError::InvalidRequest(
                "channel parameter required".to_string(),
            ));
        }

        let videos = self.index.videos_by_channel(channel)?;
        let results: Vec<VideoCard> = videos
            .iter()
            .map(|(meta, doc)| VideoCard::from_channel_meta(meta, doc, channel))
            .collect();

        Ok(ChannelVideosResponse {
            count: results.len(),
            results,
            channel: channel.to_string(),
        })
    }

    fn topics(&self) -> Result<TopicsResponse, AppError> {
        self.topics.topics()
    }

    fn app_config(&self) -> Result<AppConfigResponse, AppError> {
        let cfg = self.config_snapshot()?;

        // The UI must still boot when the collection service is down; it
        // shows the empty-collection warning instead of a dead page.
        let db_count = match self.index.count() {
            Ok(count) => count,
            Err(err) => {
                log::warn!("collection count unavailable: {err}");
                0
            }
        };

        Ok(AppConfigResponse {
            collection: cfg.collection.name.clone(),
            db_count,
            collection_empty: db_count == 0,
            default_results: cfg.search.default_results,
            max_results: cfg.search.max_results,
            embedding_model: cfg.embedding.model.clone(),
            rerank: RerankSummary {
                enabled: cfg.rerank.enabled,
                candidates: cfg.rerank.candidates,
            },
        })
    }

    fn health(&self) -> Result<HealthResponse, AppError> {
        let cfg = self.config_snapshot()?;

        let (status, db_count) = match self.index.count() {
            Ok(count) => ("ok", count),
            Err(err) => {
                log::warn!("healthcheck: collection unreachable: {err}");
                ("degraded", 0)
            }
        };

        Ok(HealthResponse {
            status: status.to_string(),
            db_count,
            collection: cfg.collection.name.clone(),
            model: cfg.embedding.model.clone(),
        })
    }
}
