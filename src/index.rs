//! Client for the external vector-collection service (Chroma-style HTTP API).
//!
//! The collection itself — embeddings, HNSW index, ranking — is somebody
//! else's process. This module only speaks its REST API and normalizes the
//! responses into [`VideoMeta`] records.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::app::AppError;
use crate::config::CollectionConfig;
use crate::videos::VideoMeta;

/// Page size when walking the whole collection.
const METADATA_BATCH_SIZE: usize = 1000;
/// Hard cap on a single channel listing.
const CHANNEL_VIDEOS_LIMIT: usize = 500;

/// One raw nearest-neighbor answer, first-row-unwrapped and length-aligned.
#[derive(Debug, Clone, Default)]
pub struct QueryHits {
    pub ids: Vec<String>,
    pub distances: Vec<Option<f64>>,
    pub metadatas: Vec<VideoMeta>,
    pub documents: Vec<String>,
}

pub trait VideoIndex: Send + Sync {
    fn count(&self) -> Result<usize, AppError>;

    fn query(&self, embedding: &[f32], n_results: usize) -> Result<QueryHits, AppError>;

    /// Every metadata record in the collection, id backfilled from the row id.
    fn all_metadatas(&self) -> Result<Vec<VideoMeta>, AppError>;

    /// `(metadata, document)` pairs for one channel.
    fn videos_by_channel(&self, channel: &str) -> Result<Vec<(VideoMeta, String)>, AppError>;

    /// Fetch specific rows by id for display enrichment.
    fn get_documents(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, (VideoMeta, String)>, AppError>;
}

pub type SharedIndex = Arc<dyn VideoIndex>;

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<VideoMeta>>>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(default)]
    ids: Vec<String>,
    #[serde(default)]
    metadatas: Option<Vec<Option<VideoMeta>>>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
}

pub struct ChromaIndex {
    http: reqwest::blocking::Client,
    base: String,
    collection: String,
}

impl ChromaIndex {
    pub fn new(config: &CollectionConfig) -> Result<ChromaIndex, AppError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(ChromaIndex {
            http,
            base: config.url.strip_suffix('/').unwrap_or(&config.url).to_string(),
            collection: config.name.clone(),
        })
    }

    fn endpoint(&self, tail: &str) -> String {
        format!(
            "{}/api/v1/collections/{}/{tail}",
            self.base, self.collection
        )
    }

    fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        tail: &str,
        body: &serde_json::Value,
    ) -> Result<T, AppError> {
        let url = self.endpoint(tail);
        log::debug!("POST {url}");
        let resp = self.http.post(&url).json(body).send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(AppError::Collection(format!(
                "{tail} returned {status}: {body:.200}"
            )));
        }

        Ok(resp.json()?)
    }

    fn get_rows(&self, body: serde_json::Value) -> Result<Vec<(String, VideoMeta, String)>, AppError> {
        let resp: GetResponse = self.post_json("get", &body)?;

        let metadatas = resp.metadatas.unwrap_or_default();
        let documents = resp.documents.unwrap_or_default();

        let mut rows = Vec::with_capacity(resp.ids.len());
        for (idx, rid) in resp.ids.into_iter().enumerate() {
            let mut meta = metadatas
                .get(idx)
                .cloned()
                .flatten()
                .unwrap_or_default();
            if meta.id.is_none() {
                meta.id = Some(rid.clone());
            }
            let document = documents
                .get(idx)
                .cloned()
                .flatten()
                .unwrap_or_default();
            rows.push((rid, meta, document));
        }
        Ok(rows)
    }
}

impl VideoIndex for ChromaIndex {
    fn count(&self) -> Result<usize, AppError> {
        let url = self.endpoint("count");
        log::debug!("GET {url}");
        let resp = self.http.get(&url).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Collection(format!("count returned {status}")));
        }

        let text = resp.text()?;
        text.trim()
            .parse::<usize>()
            .map_err(|_| AppError::Collection(format!("count returned non-numeric body: {text:.80}")))
    }

    fn query(&self, embedding: &[f32], n_results: usize) -> Result<QueryHits, AppError> {
        let body = json!({
            "query_embeddings": [embedding],
            "n_results": n_results,
            "include": ["metadatas", "distances", "documents"],
        });
        let resp: QueryResponse = self.post_json("query", &body)?;

        // The service answers one row per query embedding; only one was sent.
        let ids = resp.ids.into_iter().next().unwrap_or_default();
        let distances = resp
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let metadatas = resp
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default();
        let documents = resp
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();

        let mut hits = QueryHits::default();
        for (idx, rid) in ids.into_iter().enumerate() {
            hits.distances.push(distances.get(idx).copied().flatten());
            hits.metadatas.push(
                metadatas
                    .get(idx)
                    .cloned()
                    .flatten()
                    .unwrap_or_default(),
            );
            hits.documents.push(
                documents
                    .get(idx)
                    .cloned()
                    .flatten()
                    .unwrap_or_default(),
            );
            hits.ids.push(rid);
        }
        Ok(hits)
    }

    fn all_metadatas(&self) -> Result<Vec<VideoMeta>, AppError> {
        let total = self.count()?;
        if total == 0 {
            return Ok(vec![]);
        }

        let mut collected = Vec::with_capacity(total);
        let mut offset = 0usize;
        while offset < total {
            let limit = METADATA_BATCH_SIZE.min(total - offset);
            let rows = self.get_rows(json!({
                "limit": limit,
                "offset": offset,
                "include": ["metadatas"],
            }))?;
            if rows.is_empty() {
                break;
            }
            offset += rows.len();
            collected.extend(rows.into_iter().map(|(_, meta, _)| meta));
        }
        Ok(collected)
    }

    fn videos_by_channel(&self, channel: &str) -> Result<Vec<(VideoMeta, String)>, AppError> {
        if channel.is_empty() {
            return Ok(vec![]);
        }

        let filtered = self.get_rows(json!({
            "where": { "channel": channel },
            "limit": CHANNEL_VIDEOS_LIMIT,
            "include": ["metadatas", "documents"],
        }));

        match filtered {
            Ok(rows) => Ok(rows.into_iter().map(|(_, meta, doc)| (meta, doc)).collect()),
            // Not every collection backend supports `where` filters; fall
            // back to walking the metadata. Documents are lost on this path.
            Err(err) => {
                log::warn!("channel filter failed, scanning metadata: {err}");
                Ok(self
                    .all_metadatas()?
                    .into_iter()
                    .filter(|meta| meta.channel.as_deref() == Some(channel))
                    .take(CHANNEL_VIDEOS_LIMIT)
                    .map(|meta| (meta, String::new()))
                    .collect())
            }
        }
    }

    fn get_documents(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, (VideoMeta, String)>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = self.get_rows(json!({
            "ids": ids,
            "include": ["metadatas", "documents"],
        }))?;

        Ok(rows
            .into_iter()
            .map(|(rid, meta, doc)| (rid, (meta, doc)))
            .collect())
    }
}
