use std::sync::Arc;

use crate::app::AppError;
use crate::search::SearchService;
use crate::tests::{row, FakeIndex, FixedEmbedder};

fn service(index: Arc<FakeIndex>, default_results: usize) -> SearchService {
    SearchService::new(Box::new(FixedEmbedder), index, None, default_results, 30)
}

#[test]
fn blank_query_is_rejected() {
    let svc = service(Arc::new(FakeIndex::empty()), 10);
    let err = svc.search("   ", None).unwrap_err();
    assert!(matches!(err, AppError::InvalidRequest(_)));
}

#[test]
fn empty_collection_yields_message() {
    let svc = service(Arc::new(FakeIndex::empty()), 10);
    let resp = svc.search("anything", None).unwrap();

    assert_eq!(resp.count, 0);
    assert!(resp.results.is_empty());
    assert_eq!(resp.message.as_deref(), Some("No matching videos found"));
    assert!(!resp.rerank.enabled);
    assert!(!resp.rerank.applied);
}

#[test]
fn shapes_hits_with_ranks_and_scores() {
    let index = Arc::new(FakeIndex::new(vec![
        row("v1", "first", "chan"),
        row("v2", "second", "chan"),
    ]));
    index.set_distances(vec![Some(0.1), Some(0.4)]);

    let resp = service(index, 10).search("rust talks", None).unwrap();

    assert_eq!(resp.count, 2);
    let first = &resp.results[0];
    assert_eq!(first.id, "v1");
    assert!((first.score - 0.9).abs() < 1e-9);
    assert_eq!(first.original_rank, Some(1));
    // without a reranker the rerank position mirrors the retrieval order
    assert_eq!(first.rerank_position, Some(1));
    assert_eq!(resp.results[1].rerank_position, Some(2));
    assert!(resp.results[0].document.contains("first"));
}

#[test]
fn truncates_to_requested_width() {
    let index = Arc::new(FakeIndex::new(vec![
        row("v1", "a", "c"),
        row("v2", "b", "c"),
        row("v3", "c", "c"),
    ]));

    let resp = service(index, 10).search("query", Some(2)).unwrap();
    assert_eq!(resp.count, 2);
    assert_eq!(resp.results.len(), 2);
}

#[test]
fn default_width_comes_from_config() {
    let index = Arc::new(FakeIndex::new(vec![
        row("v1", "a", "c"),
        row("v2", "b", "c"),
        row("v3", "c", "c"),
    ]));

    let resp = service(index, 1).search("query", None).unwrap();
    assert_eq!(resp.count, 1);
}

#[test]
fn zero_width_floors_to_one() {
    let index = Arc::new(FakeIndex::new(vec![row("v1", "a", "c")]));
    let resp = service(index, 10).search("query", Some(0)).unwrap();
    assert_eq!(resp.count, 1);
}
