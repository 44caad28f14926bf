//! Helpers for the ISO 8601 durations the YouTube API hands out.

use once_cell::sync::Lazy;
use regex::Regex;

static ISO_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^P(?:(?P<days>\d+)D)?(?:T(?:(?P<hours>\d+)H)?(?:(?P<minutes>\d+)M)?(?:(?P<seconds>\d+)S)?)?$",
    )
    .expect("Failed to compile ISO 8601 duration regex")
});

/// Parse a duration like `PT1H23M45S` into seconds. `None` when malformed.
pub fn parse_iso8601_duration(value: &str) -> Option<u64> {
    let value = value.trim().to_uppercase();
    let caps = ISO_DURATION_RE.captures(&value)?;

    let group = |name: &str| -> u64 {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };

    let days = group("days");
    let hours = group("hours");
    let minutes = group("minutes");
    let seconds = group("seconds");
    Some(seconds + minutes * 60 + hours * 3600 + days * 86400)
}

/// Express `total_seconds` as a compact string (e.g. `2h 15m`).
pub fn format_watch_time(total_seconds: u64) -> String {
    if total_seconds < 60 {
        return format!("{total_seconds}s");
    }

    let (minutes, _seconds) = (total_seconds / 60, total_seconds % 60);
    if total_seconds < 3600 {
        return format!("{minutes}m");
    }

    let (hours, minutes) = (minutes / 60, minutes % 60);
    if total_seconds < 86400 {
        return if minutes > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{hours}h")
        };
    }

    let (days, hours) = (hours / 24, hours % 24);
    let mut text = format!("{days}d");
    if hours > 0 {
        text.push_str(&format!(" {hours}h"));
    }
    text
}
