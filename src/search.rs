//! `/search` orchestration: embed the query, ask the collection for
//! neighbors, shape the hits, optionally let the rerank model reorder the
//! display, truncate to the requested width.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::app::AppError;
use crate::embedding::QueryEmbedder;
use crate::index::SharedIndex;
use crate::rerank::{RerankCandidate, RerankService};
use crate::videos::VideoCard;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RerankInfo {
    pub enabled: bool,
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<VideoCard>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub rerank: RerankInfo,
}

pub struct SearchService {
    embedder: Box<dyn QueryEmbedder>,
    index: SharedIndex,
    rerank: Option<RerankService>,
    default_results: usize,
    rerank_candidates: usize,
}

impl SearchService {
    pub fn new(
        embedder: Box<dyn QueryEmbedder>,
        index: SharedIndex,
        rerank: Option<RerankService>,
        default_results: usize,
        rerank_candidates: usize,
    ) -> SearchService {
        SearchService {
            embedder,
            index,
            rerank,
            default_results,
            rerank_candidates,
        }
    }

    pub fn search(
        &self,
        query: &str,
        num_results: Option<usize>,
    ) -> Result<SearchResponse, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidRequest(
                "No search query provided".to_string(),
            ));
        }

        let display_n = num_results.unwrap_or(self.default_results).max(1);
        let retrieve_n = if self.rerank.is_some() {
            display_n.max(self.rerank_candidates)
        } else {
            display_n
        };

        let embedding = self.embedder.embed_query(query)?;
        let hits = self.index.query(&embedding, retrieve_n)?;

        let mut info = RerankInfo {
            enabled: self.rerank.is_some(),
            ..Default::default()
        };

        if hits.ids.is_empty() {
            return Ok(SearchResponse {
                results: vec![],
                count: 0,
                message: Some("No matching videos found".to_string()),
                rerank: info,
            });
        }

        let mut cards: Vec<VideoCard> = hits
            .ids
            .iter()
            .enumerate()
            .map(|(idx, rid)| {
                VideoCard::from_hit(
                    idx,
                    rid,
                    &hits.metadatas[idx],
                    hits.distances[idx],
                    &hits.documents[idx],
                )
            })
            .collect();

        if let Some(rerank) = &self.rerank {
            let candidates: Vec<RerankCandidate> = cards
                .iter()
                .map(|card| RerankCandidate {
                    id: card.id.clone(),
                    title: card.title.clone(),
                    channel: card.channel.clone(),
                    published_at: card
                        .metadata
                        .published_at
                        .clone()
                        .unwrap_or_default(),
                    duration_seconds: card.metadata.duration_secs(),
                    tags: card.metadata.tags(),
                    description: card
                        .metadata
                        .description
                        .clone()
                        .unwrap_or_default(),
                })
                .collect();

            let outcome = rerank.rerank(query, &candidates);
            info.applied = outcome.applied;
            info.model = Some(outcome.model);
            info.latency_ms = Some(outcome.latency_ms);
            info.reason = Some(outcome.reason.to_string());
            info.candidate_count = Some(cards.len());

            if outcome.applied {
                let order_index: HashMap<&str, usize> = outcome
                    .ordered_ids
                    .iter()
                    .enumerate()
                    .map(|(idx, id)| (id.as_str(), idx))
                    .collect();
                cards.sort_by_key(|card| {
                    order_index
                        .get(card.id.as_str())
                        .copied()
                        .unwrap_or(usize::MAX)
                });
                for (idx, card) in cards.iter_mut().enumerate() {
                    card.rerank_position = Some(idx + 1);
                }
            } else {
                for card in cards.iter_mut() {
                    card.rerank_position = card.original_rank;
                }
            }

            if let Some(scores) = outcome.llm_scores {
                for card in cards.iter_mut() {
                    if let Some(score) = scores.get(&card.id) {
                        card.llm_score = Some(*score);
                    }
                }
            }
        } else {
            for card in cards.iter_mut() {
                card.rerank_position = card.original_rank;
            }
        }

        cards.truncate(display_n);

        Ok(SearchResponse {
            count: cards.len(),
            results: cards,
            message: None,
            rerank: info,
        })
    }
}
