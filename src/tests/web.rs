use std::sync::{Arc, RwLock};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::app::AppLocal;
use crate::config::Config;
use crate::tests::{row, FakeIndex, FixedEmbedder};
use crate::web::test_router;

fn router_with(index: Arc<FakeIndex>) -> (axum::Router, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let config = Arc::new(RwLock::new(Config::default()));
    let app = AppLocal::new_with(
        config,
        index,
        Box::new(FixedEmbedder),
        tmp.path().join("topic_clusters.json"),
    );
    (test_router(app), tmp)
}

fn seeded_router() -> (axum::Router, tempfile::TempDir) {
    router_with(Arc::new(FakeIndex::new(vec![
        row("v1", "borrow checker deep dive", "RustConf"),
        row("v2", "lifetimes explained", "RustConf"),
        row("v3", "weeknight pasta", "Kitchen"),
    ])))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn serves_the_spa_shell() {
    let (router, _tmp) = seeded_router();

    let response = router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("search-input"));
    assert!(html.contains("/static/app.js"));
}

#[tokio::test(flavor = "multi_thread")]
async fn search_returns_shaped_results() {
    let (router, _tmp) = seeded_router();

    let response = router
        .oneshot(post_json("/search", json!({"query": "rust", "num_results": 2})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["count"], json!(2));
    assert_eq!(body["results"][0]["id"], json!("v1"));
    assert_eq!(body["results"][0]["original_rank"], json!(1));
    assert_eq!(body["rerank"]["enabled"], json!(false));
}

#[tokio::test(flavor = "multi_thread")]
async fn search_accepts_num_results_as_string() {
    let (router, _tmp) = seeded_router();

    let response = router
        .oneshot(post_json(
            "/search",
            json!({"query": "rust", "num_results": "1"}),
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["count"], json!(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn search_without_query_is_bad_request() {
    let (router, _tmp) = seeded_router();

    let response = router
        .oneshot(post_json("/search", json!({"num_results": 5})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], json!("No search query provided"));
}

#[tokio::test(flavor = "multi_thread")]
async fn channels_listing_sorts_and_pages() {
    let (router, _tmp) = seeded_router();

    let response = router
        .oneshot(get("/channels?sort=count_desc&limit=1&offset=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["channels"][0]["channel"], json!("RustConf"));
    assert_eq!(body["channels"][0]["count"], json!(2));
    assert_eq!(body["returned"], json!(1));
    assert_eq!(body["has_more"], json!(true));
    assert_eq!(body["total_videos"], json!(3));
}

#[tokio::test(flavor = "multi_thread")]
async fn channels_tolerates_junk_params() {
    let (router, _tmp) = seeded_router();

    let response = router
        .oneshot(get("/channels?sort=bogus&limit=abc&offset=xyz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["sort"], json!("count_desc"));
    assert_eq!(body["offset"], json!(0));
    assert_eq!(body["limit"], json!(null));
}

#[tokio::test(flavor = "multi_thread")]
async fn channel_videos_requires_channel() {
    let (router, _tmp) = seeded_router();

    let response = router.oneshot(get("/channel_videos")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn channel_videos_shapes_cards() {
    let (router, _tmp) = seeded_router();

    let response = router
        .oneshot(get("/channel_videos?channel=Kitchen"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["channel"], json!("Kitchen"));
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["results"][0]["score"], json!(0.0));
    assert_eq!(body["results"][0]["title"], json!("weeknight pasta"));
}

#[tokio::test(flavor = "multi_thread")]
async fn topics_without_snapshot_reports_unavailable() {
    let (router, _tmp) = seeded_router();

    let response = router.oneshot(get("/topics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["available"], json!(false));
}

#[tokio::test(flavor = "multi_thread")]
async fn app_config_reports_collection_state() {
    let (router, _tmp) = seeded_router();

    let response = router.oneshot(get("/app-config")).await.unwrap();
    let body = body_json(response).await;

    assert_eq!(body["db_count"], json!(3));
    assert_eq!(body["collection_empty"], json!(false));
    assert_eq!(body["default_results"], json!(20));
    assert_eq!(body["max_results"], json!(50));
    assert_eq!(body["rerank"]["enabled"], json!(false));
}

#[tokio::test(flavor = "multi_thread")]
async fn app_config_degrades_when_collection_is_down() {
    let (router, _tmp) = router_with(Arc::new(FakeIndex::failing()));

    let response = router.oneshot(get("/app-config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["db_count"], json!(0));
    assert_eq!(body["collection_empty"], json!(true));
}

#[tokio::test(flavor = "multi_thread")]
async fn healthcheck_reports_status() {
    let (router, _tmp) = seeded_router();
    let body = body_json(router.oneshot(get("/healthcheck")).await.unwrap()).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["db_count"], json!(3));

    let (router, _tmp) = router_with(Arc::new(FakeIndex::failing()));
    let body = body_json(router.oneshot(get("/healthcheck")).await.unwrap()).await;
    assert_eq!(body["status"], json!("degraded"));
    assert_eq!(body["db_count"], json!(0));
}
