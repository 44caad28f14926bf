//! Fail-open LLM reranking of the displayed result order.
//!
//! The similarity ranking itself comes from the collection service; this
//! only asks an LLM to reorder the retrieved candidates for display. Every
//! failure path keeps the original order.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::RerankConfig;

const RERANK_TIMEOUT_SECS: u64 = 60;

const RERANK_SYSTEM_PROMPT: &str = "You are a strict relevance ranking module. \
Given a user query and YouTube video metadata, rank videos by relevance to the query. \
Return only the requested JSON structure.";

/// Candidate handed over by the search layer, uncapped.
#[derive(Debug, Clone, Default)]
pub struct RerankCandidate {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub published_at: String,
    pub duration_seconds: Option<u64>,
    pub tags: Vec<String>,
    pub description: String,
}

#[derive(Serialize)]
struct RankingInput<'a> {
    query: &'a str,
    candidates: Vec<CandidatePayload>,
}

/// What the model actually sees: tags and description capped.
#[derive(Serialize)]
struct CandidatePayload {
    id: String,
    title: String,
    channel: String,
    published: String,
    duration_seconds: Option<u64>,
    tags: Vec<String>,
    description: String,
}

#[derive(Debug, Deserialize)]
pub struct RankedVideo {
    pub id: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RankingOutput {
    #[serde(default)]
    pub ranked: Vec<RankedVideo>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(default, rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(default, rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
    #[serde(default, rename = "totalTokenCount")]
    total_token_count: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RerankOutcome {
    pub applied: bool,
    pub ordered_ids: Vec<String>,
    pub model: String,
    pub latency_ms: u64,
    pub reason: &'static str,
    pub llm_scores: Option<HashMap<String, f64>>,
}

pub struct RerankService {
    http: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tags: usize,
    max_description_chars: usize,
}

impl RerankService {
    pub fn new(
        config: &RerankConfig,
        api_url: &str,
        api_key: String,
    ) -> Result<RerankService, crate::app::AppError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(RERANK_TIMEOUT_SECS))
            .build()?;

        Ok(RerankService {
            http,
            api_url: api_url.strip_suffix('/').unwrap_or(api_url).to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tags: config.max_tags,
            max_description_chars: config.max_description_chars,
        })
    }

    /// Rerank `candidates` against `query`. Never errors: the outcome's
    /// `reason` tells what happened and `ordered_ids` always covers every
    /// candidate exactly once.
    pub fn rerank(&self, query: &str, candidates: &[RerankCandidate]) -> RerankOutcome {
        let start = Instant::now();
        let query_hash = short_query_hash(query);
        let original_order: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();

        let mut outcome = RerankOutcome {
            applied: false,
            ordered_ids: original_order.clone(),
            model: self.model.clone(),
            latency_ms: 0,
            reason: "not_run",
            llm_scores: None,
        };

        match self.call_model(query, candidates) {
            Ok(parsed) => {
                if parsed.ranked.is_empty() {
                    outcome.reason = "parse_failed";
                } else {
                    let (ordered, scores) = merge_ranked_order(&original_order, &parsed.ranked);
                    outcome.ordered_ids = ordered;
                    outcome.applied = true;
                    outcome.reason = "success";
                    if !scores.is_empty() {
                        outcome.llm_scores = Some(scores);
                    }
                }
            }
            Err(err) => {
                log::warn!("reranking failed: {err}");
                outcome.reason = "llm_error";
            }
        }

        outcome.latency_ms = start.elapsed().as_millis() as u64;
        log::info!(
            "rerank query_hash={query_hash} applied={} reason={} latency_ms={} candidates={}",
            outcome.applied,
            outcome.reason,
            outcome.latency_ms,
            candidates.len()
        );
        outcome
    }

    fn call_model(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
    ) -> anyhow::Result<RankingOutput> {
        let input = RankingInput {
            query,
            candidates: candidates.iter().map(|c| self.payload_for(c)).collect(),
        };
        let ranking_json = serde_json::to_string_pretty(&input)?;
        let prompt = format!(
            "{RERANK_SYSTEM_PROMPT}\n\nQuery: {query}\n\nCandidates to rank:\n{ranking_json}\n\n\
             Rank these videos by relevance to the query."
        );

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json",
            },
        };

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            anyhow::bail!("generateContent returned {status}: {body:.200}");
        }

        let parsed: GenerateContentResponse = resp.json()?;
        if let Some(usage) = &parsed.usage_metadata {
            log::debug!(
                "rerank tokens in/out/total={}/{}/{}",
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
                usage.total_token_count.unwrap_or(0)
            );
        }

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        Ok(serde_json::from_str(&text)?)
    }

    fn payload_for(&self, candidate: &RerankCandidate) -> CandidatePayload {
        CandidatePayload {
            id: candidate.id.clone(),
            title: candidate.title.clone(),
            channel: candidate.channel.clone(),
            published: candidate.published_at.clone(),
            duration_seconds: candidate.duration_seconds,
            tags: candidate.tags.iter().take(self.max_tags).cloned().collect(),
            description: truncate_text(&candidate.description, self.max_description_chars),
        }
    }
}

/// Model order first (unknown ids dropped), then every candidate the model
/// skipped, in original order. Scores only for known ids.
pub fn merge_ranked_order(
    original: &[String],
    ranked: &[RankedVideo],
) -> (Vec<String>, HashMap<String, f64>) {
    let known: HashSet<&str> = original.iter().map(String::as_str).collect();

    let mut ordered: Vec<String> = Vec::with_capacity(original.len());
    let mut seen: HashSet<&str> = HashSet::new();
    for video in ranked {
        if known.contains(video.id.as_str()) && seen.insert(video.id.as_str()) {
            ordered.push(video.id.clone());
        }
    }
    for id in original {
        if !seen.contains(id.as_str()) {
            ordered.push(id.clone());
        }
    }

    let scores = ranked
        .iter()
        .filter(|v| known.contains(v.id.as_str()))
        .filter_map(|v| v.score.map(|s| (v.id.clone(), s)))
        .collect();

    (ordered, scores)
}

/// Char-boundary-safe truncation with an ellipsis.
pub fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}…", cut.trim_end())
}

/// Queries are personal; logs carry a short hash instead of the text.
fn short_query_hash(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}
