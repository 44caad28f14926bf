use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::signal;

use crate::{
    app::{AppError, AppLocal, Backend},
    channels::{ChannelQuery, ChannelSort},
};

const INDEX_HTML: &str = include_str!("assets/index.html");
const APP_JS: &str = include_str!("assets/app.js");
const STYLES_CSS: &str = include_str!("assets/styles.css");

#[derive(Clone)]
struct SharedState {
    app: Arc<AppLocal>,
}

async fn start_app(app: AppLocal, bind: &str) {
    let shared_state = Arc::new(SharedState { app: Arc::new(app) });

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {
                log::info!("shutting down");
            },
            _ = terminate => {},
        }
    }

    let app = router(shared_state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {bind}: {err}"));
    log::info!("listening on {bind}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/static/app.js", get(app_js))
        .route("/static/styles.css", get(styles_css))
        .route("/search", post(search))
        .route("/channels", get(channels))
        .route("/channel_videos", get(channel_videos))
        .route("/topics", get(topics))
        .route("/app-config", get(app_config))
        .route("/healthcheck", get(healthcheck))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

pub fn start_daemon(app: AppLocal, bind: String) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(async { start_app(app, &bind).await });
}

// Wraps `AppError` so axum can turn service failures into `{error}` bodies.
#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            AppError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            AppError::Collection(_) | AppError::Embedding(_) | AppError::Reqwest(_) => {
                log::error!("{self:?}");
                axum::http::StatusCode::BAD_GATEWAY
            }
            AppError::IO(_) | AppError::Json(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, json!({"error": self.0.to_string()}).to_string()).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn app_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], APP_JS)
}

async fn styles_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], STYLES_CSS)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,

    /// Accepted as a number or a digit string; anything else falls back to
    /// the configured default.
    #[serde(default)]
    pub num_results: Option<Value>,
}

fn lenient_count(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(|n| n.max(1) as usize),
        Value::String(s) => s.trim().parse::<i64>().ok().map(|n| n.max(1) as usize),
        _ => None,
    }
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<crate::search::SearchResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let num_results = lenient_count(payload.num_results.as_ref());
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.search(&payload.query, num_results)
            .map(Json)
            .map_err(Into::into)
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelsParams {
    pub sort: Option<String>,
    pub q: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

async fn channels(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<ChannelsParams>,
) -> Result<Json<crate::channels::ChannelsResponse>, HttpError> {
    log::debug!("params: {params:?}");

    let query = ChannelQuery {
        sort: ChannelSort::parse(params.sort.as_deref().unwrap_or_default()),
        q: params.q,
        limit: params.limit.and_then(|l| l.trim().parse().ok()),
        offset: params
            .offset
            .and_then(|o| o.trim().parse().ok())
            .unwrap_or(0),
    };

    let app = state.app.clone();
    tokio::task::block_in_place(move || app.channels(query).map(Json).map_err(Into::into))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelVideosParams {
    pub channel: Option<String>,
}

async fn channel_videos(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<ChannelVideosParams>,
) -> Result<Json<crate::app::ChannelVideosResponse>, HttpError> {
    let channel = params.channel.unwrap_or_default();

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.channel_videos(&channel).map(Json).map_err(Into::into)
    })
}

async fn topics(
    State(state): State<Arc<SharedState>>,
) -> Result<Json<crate::topics::TopicsResponse>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.topics().map(Json).map_err(Into::into))
}

async fn app_config(
    State(state): State<Arc<SharedState>>,
) -> Result<Json<crate::app::AppConfigResponse>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.app_config().map(Json).map_err(Into::into))
}

async fn healthcheck(
    State(state): State<Arc<SharedState>>,
) -> Result<Json<crate::app::HealthResponse>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.health().map(Json).map_err(Into::into))
}

/// Router over an already-built app, for tests.
#[cfg(test)]
pub fn test_router(app: AppLocal) -> Router {
    router(Arc::new(SharedState { app: Arc::new(app) }))
}
