use serde_json::{json, Value};

use crate::tests::{meta, with_duration_seconds};
use crate::videos::{cosine_distance_to_similarity, VideoCard, VideoMeta};

#[test]
fn similarity_clamps_invalid_distances() {
    assert_eq!(cosine_distance_to_similarity(None), 0.0);
    assert_eq!(cosine_distance_to_similarity(Some(-0.1)), 0.0);
    assert_eq!(cosine_distance_to_similarity(Some(2.5)), 0.0);
    assert!((cosine_distance_to_similarity(Some(0.25)) - 0.75).abs() < 1e-9);
    assert_eq!(cosine_distance_to_similarity(Some(0.0)), 1.0);
}

#[test]
fn from_hit_defaults_missing_fields() {
    let card = VideoCard::from_hit(0, "row-id-123", &VideoMeta::default(), None, "");

    assert_eq!(card.id, "row-id-123");
    assert_eq!(card.title, "N/A");
    assert_eq!(card.channel, "N/A");
    assert_eq!(card.url, "#");
    assert_eq!(card.score, 0.0);
    assert_eq!(card.original_rank, Some(1));
    assert_eq!(
        card.thumbnail.as_deref(),
        Some("https://img.youtube.com/vi/row-id-123/hqdefault.jpg")
    );
}

#[test]
fn from_hit_prefers_metadata_id() {
    let card = VideoCard::from_hit(2, "row-id", &meta("abc123def45", "t", "c"), Some(0.5), "doc");

    assert_eq!(card.id, "abc123def45");
    assert_eq!(card.original_rank, Some(3));
    assert_eq!(card.document, "doc");
    assert!((card.score - 0.5).abs() < 1e-9);
}

#[test]
fn from_channel_meta_builds_watch_url() {
    let mut m = meta("abc123def45", "title", "chan");
    m.url = None;
    let card = VideoCard::from_channel_meta(&m, "", "fallback");

    assert_eq!(card.url, "https://www.youtube.com/watch?v=abc123def45");
    assert_eq!(card.score, 0.0);
    assert_eq!(card.channel, "chan");
    assert!(card.original_rank.is_none());
}

#[test]
fn from_channel_meta_uses_fallback_channel() {
    let mut m = meta("abc123def45", "title", "chan");
    m.channel = None;
    let card = VideoCard::from_channel_meta(&m, "", "The Channel");
    assert_eq!(card.channel, "The Channel");
}

#[test]
fn duration_seconds_accepts_number_and_digit_string() {
    let m = with_duration_seconds(VideoMeta::default(), json!(90));
    assert_eq!(m.duration_secs(), Some(90));

    let m = with_duration_seconds(VideoMeta::default(), json!("120"));
    assert_eq!(m.duration_secs(), Some(120));

    let m = with_duration_seconds(VideoMeta::default(), json!("12a"));
    assert_eq!(m.duration_secs(), None);

    let m = with_duration_seconds(VideoMeta::default(), json!(-5));
    assert_eq!(m.duration_secs(), None);

    assert_eq!(VideoMeta::default().duration_secs(), None);
}

#[test]
fn duration_seconds_falls_back_to_iso_duration() {
    let mut m = VideoMeta::default();
    m.duration = Some("PT2M30S".to_string());
    assert_eq!(m.duration_secs(), Some(150));

    // an explicit count wins over the ISO field
    let m = with_duration_seconds(m, json!(10));
    assert_eq!(m.duration_secs(), Some(10));
}

#[test]
fn tags_split_on_comma_space() {
    let mut m = VideoMeta::default();
    m.tags_str = Some("rust, systems programming, tutorial".to_string());
    assert_eq!(m.tags(), vec!["rust", "systems programming", "tutorial"]);

    m.tags_str = None;
    assert!(m.tags().is_empty());
}

#[test]
fn unknown_metadata_keys_round_trip() {
    let raw = json!({
        "id": "abc123def45",
        "title": "A video",
        "category_id": "27",
        "view_count": 12345,
    });
    let m: VideoMeta = serde_json::from_value(raw).unwrap();
    assert_eq!(m.extra.get("category_id"), Some(&Value::from("27")));

    let back = serde_json::to_value(&m).unwrap();
    assert_eq!(back.get("view_count"), Some(&Value::from(12345)));
    assert_eq!(back.get("title"), Some(&Value::from("A video")));
}

#[test]
fn video_id_falls_back_to_legacy_key() {
    let raw = json!({ "video_id": "legacy123ab" });
    let m: VideoMeta = serde_json::from_value(raw).unwrap();
    assert_eq!(m.video_id().as_deref(), Some("legacy123ab"));
}
