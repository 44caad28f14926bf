use crate::duration::{format_watch_time, parse_iso8601_duration};

#[test]
fn parses_full_durations() {
    assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
    assert_eq!(parse_iso8601_duration("P1DT2H"), Some(93600));
    assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
    assert_eq!(parse_iso8601_duration("PT12M"), Some(720));
}

#[test]
fn tolerates_case_and_whitespace() {
    assert_eq!(parse_iso8601_duration("  pt1m30s "), Some(90));
}

#[test]
fn degenerate_periods_are_zero() {
    assert_eq!(parse_iso8601_duration("P"), Some(0));
    assert_eq!(parse_iso8601_duration("PT"), Some(0));
}

#[test]
fn rejects_malformed_input() {
    assert_eq!(parse_iso8601_duration(""), None);
    assert_eq!(parse_iso8601_duration("12:34"), None);
    assert_eq!(parse_iso8601_duration("PT1H2"), None);
    assert_eq!(parse_iso8601_duration("1H2M"), None);
}

#[test]
fn formats_each_magnitude() {
    assert_eq!(format_watch_time(0), "0s");
    assert_eq!(format_watch_time(59), "59s");
    assert_eq!(format_watch_time(60), "1m");
    assert_eq!(format_watch_time(3599), "59m");
    assert_eq!(format_watch_time(3600), "1h");
    assert_eq!(format_watch_time(8100), "2h 15m");
    assert_eq!(format_watch_time(86400), "1d");
    assert_eq!(format_watch_time(97200), "1d 3h");
}
