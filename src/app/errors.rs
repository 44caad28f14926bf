#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("collection service error: {0}")]
    Collection(String),

    #[error("embedding service error: {0}")]
    Embedding(String),

    #[error("reqwest error: {0:?}")]
    Reqwest(#[from] reqwest::Error),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("json error: {0:?}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
