use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The metadata record stored next to each embedding in the collection.
///
/// Every field is optional and unknown keys are kept in `extra`: the
/// ingestion pipeline has changed shape over time and the API serves whatever
/// it finds back out verbatim as the card's `metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "publishedAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<String>,
    /// ISO 8601, e.g. `PT12M34S`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Stored as an integer by recent pipeline runs and as a digit string by
    /// older ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags_str: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl VideoMeta {
    /// Duration in seconds, from `duration_seconds` when the pipeline stored
    /// one, otherwise parsed out of the ISO 8601 `duration`.
    pub fn duration_secs(&self) -> Option<u64> {
        let stored = match self.duration_seconds.as_ref() {
            Some(Value::Number(n)) => n.as_f64().filter(|v| *v > 0.0).map(|v| v as u64),
            Some(Value::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
                s.parse().ok()
            }
            _ => None,
        };
        stored.or_else(|| {
            self.duration
                .as_deref()
                .and_then(crate::duration::parse_iso8601_duration)
        })
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags_str
            .as_deref()
            .map(|tags| {
                tags.split(", ")
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Video id, also checking the pre-rename `video_id` key old pipeline
    /// runs used.
    pub fn video_id(&self) -> Option<String> {
        if let Some(id) = &self.id {
            return Some(id.clone());
        }
        self.extra
            .get("video_id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// A shaped search/listing result as served to the UI and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoCard {
    pub id: String,
    pub title: String,
    pub channel: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    pub url: String,
    pub score: f64,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub channel_thumbnail: Option<String>,
    pub tags: String,
    pub document: String,
    pub metadata: VideoMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_rank: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_score: Option<f64>,
}

impl VideoCard {
    /// Shape one raw query hit. `index` is the zero-based retrieval rank.
    pub fn from_hit(
        index: usize,
        fallback_id: &str,
        meta: &VideoMeta,
        distance: Option<f64>,
        document: &str,
    ) -> VideoCard {
        let vid = meta
            .video_id()
            .unwrap_or_else(|| fallback_id.to_string());
        let thumbnail = (!vid.is_empty()).then(|| thumbnail_url(&vid));

        VideoCard {
            id: vid,
            title: meta.title.clone().unwrap_or_else(|| "N/A".to_string()),
            channel: meta.channel.clone().unwrap_or_else(|| "N/A".to_string()),
            channel_id: meta.channel_id.clone(),
            url: meta.url.clone().unwrap_or_else(|| "#".to_string()),
            score: cosine_distance_to_similarity(distance),
            thumbnail,
            channel_thumbnail: meta.channel_thumbnail.clone(),
            tags: meta.tags_str.clone().unwrap_or_default(),
            document: document.to_string(),
            metadata: meta.clone(),
            original_rank: Some(index + 1),
            rerank_position: None,
            llm_score: None,
        }
    }

    /// Shape a channel-listing entry. No query, no distance, score stays 0.
    pub fn from_channel_meta(
        meta: &VideoMeta,
        document: &str,
        fallback_channel: &str,
    ) -> VideoCard {
        let vid = meta.video_id().unwrap_or_default();
        let url = meta.url.clone().unwrap_or_else(|| {
            if vid.is_empty() {
                "#".to_string()
            } else {
                watch_url(&vid)
            }
        });
        let thumbnail = (!vid.is_empty()).then(|| thumbnail_url(&vid));

        VideoCard {
            id: vid,
            title: meta.title.clone().unwrap_or_else(|| "N/A".to_string()),
            channel: meta
                .channel
                .clone()
                .unwrap_or_else(|| fallback_channel.to_string()),
            channel_id: meta.channel_id.clone(),
            url,
            score: 0.0,
            thumbnail,
            channel_thumbnail: meta.channel_thumbnail.clone(),
            tags: meta.tags_str.clone().unwrap_or_default(),
            document: document.to_string(),
            metadata: meta.clone(),
            original_rank: None,
            rerank_position: None,
            llm_score: None,
        }
    }
}

/// The collection stores cosine distances; the UI shows similarities.
/// Anything outside the valid cosine range collapses to 0.
pub fn cosine_distance_to_similarity(distance: Option<f64>) -> f64 {
    match distance {
        Some(d) if (0.0..=2.0).contains(&d) => 1.0 - d,
        _ => 0.0,
    }
}

pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg")
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}
