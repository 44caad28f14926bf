//! Aggregate channel statistics over the whole collection, cached between
//! requests and rebuilt only when the collection count changes.

use std::sync::Mutex;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::app::AppError;
use crate::duration::format_watch_time;
use crate::index::SharedIndex;

pub const UNKNOWN_CHANNEL: &str = "(Unknown Channel)";

/// Clamp for the `limit` parameter.
const MAX_PAGE_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSort {
    CountDesc,
    CountAsc,
    Alpha,
    AlphaDesc,
}

impl ChannelSort {
    /// Unknown values fall back to the default ordering.
    pub fn parse(value: &str) -> ChannelSort {
        match value {
            "count_asc" => ChannelSort::CountAsc,
            "alpha" => ChannelSort::Alpha,
            "alpha_desc" => ChannelSort::AlphaDesc,
            _ => ChannelSort::CountDesc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelSort::CountDesc => "count_desc",
            ChannelSort::CountAsc => "count_asc",
            ChannelSort::Alpha => "alpha",
            ChannelSort::AlphaDesc => "alpha_desc",
        }
    }
}

impl Default for ChannelSort {
    fn default() -> Self {
        ChannelSort::CountDesc
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    pub channel: String,
    pub count: usize,
    #[serde(default)]
    pub channel_thumbnail: Option<String>,
    pub total_duration_seconds: u64,
    pub percent: f64,
    #[serde(default)]
    pub watch_time: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChannelQuery {
    pub sort: ChannelSort,
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsResponse {
    pub total_videos: usize,
    pub distinct_channels: usize,
    pub total_available: usize,
    pub returned: usize,
    pub offset: usize,
    pub limit: Option<usize>,
    pub has_more: bool,
    pub sort: String,
    pub stale: bool,
    #[serde(default)]
    pub q: Option<String>,
    pub channels: Vec<ChannelStats>,
}

struct ChannelCache {
    total_videos: usize,
    rows: Vec<ChannelStats>,
}

pub struct ChannelDirectory {
    index: SharedIndex,
    cache: Mutex<Option<ChannelCache>>,
}

impl ChannelDirectory {
    pub fn new(index: SharedIndex) -> ChannelDirectory {
        ChannelDirectory {
            index,
            cache: Mutex::new(None),
        }
    }

    fn normalize(name: Option<&str>) -> String {
        match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UNKNOWN_CHANNEL.to_string(),
        }
    }

    fn build_cache(&self, total: usize) -> Result<ChannelCache, AppError> {
        let start = Instant::now();
        let metadatas = self.index.all_metadatas()?;

        let mut channels: Vec<ChannelStats> = Vec::new();
        let mut by_name: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

        for meta in &metadatas {
            let channel = Self::normalize(meta.channel.as_deref());
            let slot = *by_name.entry(channel.clone()).or_insert_with(|| {
                channels.push(ChannelStats {
                    channel,
                    count: 0,
                    channel_thumbnail: None,
                    total_duration_seconds: 0,
                    percent: 0.0,
                    watch_time: None,
                });
                channels.len() - 1
            });

            let entry = &mut channels[slot];
            entry.count += 1;
            if let Some(seconds) = meta.duration_secs() {
                entry.total_duration_seconds += seconds;
            }
            if entry.channel_thumbnail.is_none() {
                entry.channel_thumbnail = meta
                    .channel_thumbnail
                    .clone()
                    .filter(|t| !t.is_empty());
            }
        }

        for entry in &mut channels {
            let percent = if total > 0 {
                entry.count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            entry.percent = (percent * 100.0).round() / 100.0;
            if entry.total_duration_seconds > 0 {
                entry.watch_time = Some(format_watch_time(entry.total_duration_seconds));
            }
        }

        log::info!(
            "channel directory rebuilt: {} channels over {} videos in {}ms",
            channels.len(),
            total,
            start.elapsed().as_millis()
        );

        Ok(ChannelCache {
            total_videos: total,
            rows: channels,
        })
    }

    pub fn get_channels(&self, query: ChannelQuery) -> Result<ChannelsResponse, AppError> {
        let total = self.index.count()?;

        let mut guard = self
            .cache
            .lock()
            .map_err(|_| anyhow::anyhow!("channel cache lock poisoned"))?;
        if guard.as_ref().map(|c| c.total_videos) != Some(total) {
            *guard = Some(self.build_cache(total)?);
        }
        let cache = guard.as_ref().expect("cache populated above");

        let q = query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let mut rows: Vec<ChannelStats> = match &q {
            Some(needle) => {
                let needle = needle.to_lowercase();
                cache
                    .rows
                    .iter()
                    .filter(|row| row.channel.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            }
            None => cache.rows.clone(),
        };

        match query.sort {
            ChannelSort::CountDesc => rows.sort_by(|a, b| b.count.cmp(&a.count)),
            ChannelSort::CountAsc => rows.sort_by(|a, b| a.count.cmp(&b.count)),
            ChannelSort::Alpha => {
                rows.sort_by(|a, b| a.channel.to_lowercase().cmp(&b.channel.to_lowercase()))
            }
            ChannelSort::AlphaDesc => {
                rows.sort_by(|a, b| b.channel.to_lowercase().cmp(&a.channel.to_lowercase()))
            }
        }

        let total_available = rows.len();
        let limit = query.limit.map(|l| l.min(MAX_PAGE_LIMIT));
        let offset = query.offset.min(total_available);

        let sliced: Vec<ChannelStats> = match limit {
            Some(limit) => rows.into_iter().skip(offset).take(limit).collect(),
            None => rows.into_iter().skip(offset).collect(),
        };
        let has_more = limit.is_some() && offset + sliced.len() < total_available;

        Ok(ChannelsResponse {
            total_videos: cache.total_videos,
            distinct_channels: cache.rows.len(),
            total_available,
            returned: sliced.len(),
            offset,
            limit,
            has_more,
            sort: query.sort.as_str().to_string(),
            stale: false,
            q,
            channels: sliced,
        })
    }
}
