use serde::{Deserialize, Serialize};

use crate::channels::{ChannelQuery, ChannelsResponse};
use crate::search::SearchResponse;
use crate::topics::TopicsResponse;
use crate::videos::VideoCard;

use super::errors::AppError;

/// Everything a frontend (web handler, CLI, remote client) can ask for.
pub trait Backend: Send + Sync {
    fn search(
        &self,
        query: &str,
        num_results: Option<usize>,
    ) -> Result<SearchResponse, AppError>;

    fn channels(&self, query: ChannelQuery) -> Result<ChannelsResponse, AppError>;

    fn channel_videos(&self, channel: &str) -> Result<ChannelVideosResponse, AppError>;

    fn topics(&self) -> Result<TopicsResponse, AppError>;

    fn app_config(&self) -> Result<AppConfigResponse, AppError>;

    fn health(&self) -> Result<HealthResponse, AppError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelVideosResponse {
    pub results: Vec<VideoCard>,
    pub count: usize,
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankSummary {
    pub enabled: bool,
    pub candidates: usize,
}

/// Boot data for the SPA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfigResponse {
    pub collection: String,
    pub db_count: usize,
    pub collection_empty: bool,
    pub default_results: usize,
    pub max_results: usize,
    pub embedding_model: String,
    pub rerank: RerankSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub db_count: usize,
    pub collection: String,
    pub model: String,
}
