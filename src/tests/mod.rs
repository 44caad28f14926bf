mod duration;
mod search;
mod videos;
mod web;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::app::AppError;
use crate::embedding::QueryEmbedder;
use crate::index::{QueryHits, VideoIndex};
use crate::videos::VideoMeta;

/// In-memory stand-in for the collection service: rows are
/// `(row id, metadata, document)`, returned in insertion order.
pub struct FakeIndex {
    rows: Mutex<Vec<(String, VideoMeta, String)>>,
    distances: Mutex<Vec<Option<f64>>>,
    fail: AtomicBool,
}

impl FakeIndex {
    pub fn new(rows: Vec<(String, VideoMeta, String)>) -> FakeIndex {
        let distances = rows.iter().map(|_| Some(0.25)).collect();
        FakeIndex {
            rows: Mutex::new(rows),
            distances: Mutex::new(distances),
            fail: AtomicBool::new(false),
        }
    }

    pub fn empty() -> FakeIndex {
        FakeIndex::new(vec![])
    }

    pub fn failing() -> FakeIndex {
        let index = FakeIndex::empty();
        index.fail.store(true, Ordering::SeqCst);
        index
    }

    pub fn push_row(&self, row: (String, VideoMeta, String)) {
        self.distances.lock().unwrap().push(Some(0.25));
        self.rows.lock().unwrap().push(row);
    }

    pub fn set_distances(&self, distances: Vec<Option<f64>>) {
        *self.distances.lock().unwrap() = distances;
    }

    fn check(&self) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Collection("fake index down".to_string()));
        }
        Ok(())
    }
}

impl VideoIndex for FakeIndex {
    fn count(&self) -> Result<usize, AppError> {
        self.check()?;
        Ok(self.rows.lock().unwrap().len())
    }

    fn query(&self, _embedding: &[f32], n_results: usize) -> Result<QueryHits, AppError> {
        self.check()?;
        let rows = self.rows.lock().unwrap();
        let distances = self.distances.lock().unwrap();

        let mut hits = QueryHits::default();
        for (idx, (rid, meta, doc)) in rows.iter().take(n_results).enumerate() {
            hits.ids.push(rid.clone());
            hits.distances.push(distances.get(idx).copied().flatten());
            hits.metadatas.push(meta.clone());
            hits.documents.push(doc.clone());
        }
        Ok(hits)
    }

    fn all_metadatas(&self) -> Result<Vec<VideoMeta>, AppError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|(rid, meta, _)| {
                let mut meta = meta.clone();
                if meta.id.is_none() {
                    meta.id = Some(rid.clone());
                }
                meta
            })
            .collect())
    }

    fn videos_by_channel(&self, channel: &str) -> Result<Vec<(VideoMeta, String)>, AppError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, meta, _)| meta.channel.as_deref() == Some(channel))
            .map(|(_, meta, doc)| (meta.clone(), doc.clone()))
            .collect())
    }

    fn get_documents(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, (VideoMeta, String)>, AppError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(rid, _, _)| ids.contains(rid))
            .map(|(rid, meta, doc)| (rid.clone(), (meta.clone(), doc.clone())))
            .collect())
    }
}

/// Embedder that never talks to the network.
pub struct FixedEmbedder;

impl QueryEmbedder for FixedEmbedder {
    fn embed_query(&self, query: &str) -> Result<Vec<f32>, AppError> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "No search query provided".to_string(),
            ));
        }
        Ok(vec![0.1, 0.2, 0.3])
    }
}

pub fn meta(id: &str, title: &str, channel: &str) -> VideoMeta {
    VideoMeta {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        channel: Some(channel.to_string()),
        url: Some(format!("https://www.youtube.com/watch?v={id}")),
        ..Default::default()
    }
}

pub fn row(id: &str, title: &str, channel: &str) -> (String, VideoMeta, String) {
    (
        id.to_string(),
        meta(id, title, channel),
        format!("document for {title}"),
    )
}

pub fn with_duration_seconds(mut meta: VideoMeta, value: Value) -> VideoMeta {
    meta.duration_seconds = Some(value);
    meta
}
