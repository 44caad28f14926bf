//! Query-embedding client. Embeddings are generated by an external service
//! (Gemini-style `embedContent` API); this side only sends text and reads
//! vectors back.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::AppError;
use crate::config::EmbeddingConfig;

const TASK_TYPE_RETRIEVAL_QUERY: &str = "RETRIEVAL_QUERY";
const EMBED_TIMEOUT_SECS: u64 = 30;

pub trait QueryEmbedder: Send + Sync {
    fn embed_query(&self, query: &str) -> Result<Vec<f32>, AppError>;
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    content: ContentPayload<'a>,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct ContentPayload<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    #[serde(default)]
    embedding: Option<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

pub struct EmbeddingClient {
    http: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<EmbeddingClient, AppError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(EMBED_TIMEOUT_SECS))
            .build()?;

        Ok(EmbeddingClient {
            http,
            api_url: config
                .api_url
                .strip_suffix('/')
                .unwrap_or(&config.api_url)
                .to_string(),
            api_key,
            model: qualified_model(&config.model),
        })
    }
}

/// The API path wants `models/<name>`; config may carry either form.
fn qualified_model(model: &str) -> String {
    if model.contains('/') {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

impl QueryEmbedder for EmbeddingClient {
    fn embed_query(&self, query: &str) -> Result<Vec<f32>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidRequest(
                "No search query provided".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(AppError::Embedding(
                "GEMINI_API_KEY is not set".to_string(),
            ));
        }

        let url = format!("{}/v1beta/{}:embedContent", self.api_url, self.model);
        log::debug!("POST {url}");

        let request = EmbedContentRequest {
            content: ContentPayload {
                parts: vec![TextPart { text: query }],
            },
            task_type: TASK_TYPE_RETRIEVAL_QUERY,
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
            return Err(AppError::Embedding(format!(
                "embedContent returned {status}: {body:.200}"
            )));
        }

        let parsed: EmbedContentResponse = resp.json()?;
        let values = parsed.embedding.map(|e| e.values).unwrap_or_default();
        if values.is_empty() {
            return Err(AppError::Embedding(
                "could not extract embedding vector from response".to_string(),
            ));
        }
        Ok(values)
    }
}
