//! Topic browser data. Clusters are computed offline by an external analysis
//! job that writes a JSON snapshot; this module loads, caches and shapes that
//! snapshot for display. Nothing here clusters anything.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::app::AppError;
use crate::index::SharedIndex;
use crate::videos::VideoCard;

/// How many sample videos per cluster get enriched into full cards.
const SAMPLE_VIDEO_LIMIT: usize = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicParams {
    #[serde(default)]
    pub min_cluster_size: Option<u64>,
    #[serde(default)]
    pub min_samples: Option<u64>,
    #[serde(default)]
    pub pca_components: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicCluster {
    pub id: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub top_keywords: Vec<String>,
    #[serde(default)]
    pub exemplar_video_id: Option<String>,
    #[serde(default)]
    pub mean_probability: Option<f64>,
    #[serde(default)]
    pub sample_video_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicBuildMeta {
    #[serde(default)]
    pub build_seconds: Option<f64>,
    #[serde(default)]
    pub validity_score: Option<f64>,
    #[serde(default)]
    pub selection_method: Option<String>,
}

/// On-disk snapshot format, as written by the clustering job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicSnapshot {
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default)]
    pub algo: Option<String>,
    #[serde(default)]
    pub params: TopicParams,
    #[serde(default)]
    pub total_videos: usize,
    #[serde(default)]
    pub cluster_count: usize,
    #[serde(default)]
    pub noise_ratio: f64,
    #[serde(default)]
    pub clusters: Vec<TopicCluster>,
    /// video id -> cluster id (-1 is noise). Kept for format fidelity.
    #[serde(default)]
    pub assignments: std::collections::HashMap<String, i64>,
    #[serde(default)]
    pub meta: TopicBuildMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicClusterView {
    pub id: i64,
    pub label: String,
    pub size: usize,
    pub percent: f64,
    pub top_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exemplar_video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_probability: Option<f64>,
    #[serde(default)]
    pub sample_videos: Vec<VideoCard>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicsResponse {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo: Option<String>,
    #[serde(default)]
    pub total_videos: usize,
    #[serde(default)]
    pub cluster_count: usize,
    #[serde(default)]
    pub noise_ratio: f64,
    #[serde(default)]
    pub stale: bool,
    #[serde(default)]
    pub clusters: Vec<TopicClusterView>,
}

impl TopicsResponse {
    fn unavailable(message: &str) -> TopicsResponse {
        TopicsResponse {
            available: false,
            message: Some(message.to_string()),
            ..Default::default()
        }
    }
}

pub struct TopicService {
    snapshot_path: PathBuf,
    index: SharedIndex,
    cache: Mutex<Option<(SystemTime, TopicSnapshot)>>,
}

impl TopicService {
    pub fn new(snapshot_path: PathBuf, index: SharedIndex) -> TopicService {
        TopicService {
            snapshot_path,
            index,
            cache: Mutex::new(None),
        }
    }

    /// Load the snapshot, reusing the cached parse until the file's mtime
    /// changes. `None` when the file is missing or unreadable.
    fn load_snapshot(&self) -> Option<TopicSnapshot> {
        let modified = std::fs::metadata(&self.snapshot_path)
            .and_then(|m| m.modified())
            .ok()?;

        let mut guard = self.cache.lock().ok()?;
        if let Some((cached_at, snapshot)) = guard.as_ref() {
            if *cached_at == modified {
                return Some(snapshot.clone());
            }
        }

        let raw = match std::fs::read(&self.snapshot_path) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("failed to read topic snapshot: {err}");
                return None;
            }
        };
        match serde_json::from_slice::<TopicSnapshot>(&raw) {
            Ok(snapshot) => {
                *guard = Some((modified, snapshot.clone()));
                Some(snapshot)
            }
            Err(err) => {
                log::warn!("topic snapshot is malformed: {err}");
                None
            }
        }
    }

    pub fn topics(&self) -> Result<TopicsResponse, AppError> {
        let Some(snapshot) = self.load_snapshot() else {
            return Ok(TopicsResponse::unavailable(
                "No topic snapshot available. Run the clustering job first.",
            ));
        };

        // Display-only staleness hint; the snapshot itself stays served.
        let stale = match self.index.count() {
            Ok(count) => count != snapshot.total_videos,
            Err(err) => {
                log::warn!("collection count unavailable for staleness check: {err}");
                false
            }
        };

        let mut clusters = snapshot.clusters.clone();
        clusters.sort_by(|a, b| b.size.cmp(&a.size));

        let sample_ids: Vec<String> = clusters
            .iter()
            .flat_map(|c| c.sample_video_ids.iter().take(SAMPLE_VIDEO_LIMIT).cloned())
            .collect();
        let samples = match self.index.get_documents(&sample_ids) {
            Ok(samples) => samples,
            Err(err) => {
                log::warn!("sample enrichment failed: {err}");
                Default::default()
            }
        };

        let views = clusters
            .into_iter()
            .map(|cluster| {
                let sample_videos = cluster
                    .sample_video_ids
                    .iter()
                    .take(SAMPLE_VIDEO_LIMIT)
                    .filter_map(|vid| samples.get(vid))
                    .map(|(meta, doc)| VideoCard::from_channel_meta(meta, doc, "N/A"))
                    .collect();
                TopicClusterView {
                    id: cluster.id,
                    label: cluster.label,
                    size: cluster.size,
                    percent: cluster.percent,
                    top_keywords: cluster.top_keywords,
                    exemplar_video_id: cluster.exemplar_video_id,
                    mean_probability: cluster.mean_probability,
                    sample_videos,
                }
            })
            .collect();

        Ok(TopicsResponse {
            available: true,
            message: None,
            generated_at: snapshot.generated_at,
            embedding_model: snapshot.embedding_model,
            algo: snapshot.algo,
            total_videos: snapshot.total_videos,
            cluster_count: snapshot.cluster_count,
            noise_ratio: snapshot.noise_ratio,
            stale,
            clusters: views,
        })
    }
}
