//! Human-readable value, byte and duration formatting helpers.

use bytesize::ByteSize;
use chrono::{DateTime, Local, Utc};

/// Format non-finite sample values the way the query API spells them.
fn fmt_non_finite(value: f64) -> Option<String> {
    if value.is_nan() {
        Some("NaN".into())
    } else if value.is_infinite() {
        Some(if value > 0.0 { "+Inf" } else { "-Inf" }.into())
    } else {
        None
    }
}

/// Fixed-point with `decimals` places.
pub fn fmt_fixed(value: f64, decimals: u8) -> String {
    fmt_non_finite(value).unwrap_or_else(|| format!("{value:.*}", usize::from(decimals)))
}

/// Format a byte count with binary prefixes (e.g., "1.5 KiB", "3.2 GiB").
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn fmt_bytes(value: f64) -> String {
    if let Some(s) = fmt_non_finite(value) {
        return s;
    }
    let magnitude = ByteSize::b(value.abs().round() as u64).to_string_as(true);
    if value < 0.0 {
        format!("-{magnitude}")
    } else {
        magnitude
    }
}

/// Format seconds into a compact human duration (e.g., "47d", "4h 23m", "12m", "9s").
pub fn fmt_duration(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{secs}s")
    }
}

/// Relative time of `then` against `now`: "4h 23m ago", "in 12m", "now".
pub fn fmt_time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then).num_seconds();
    let secs = delta.unsigned_abs();
    if secs == 0 {
        "now".into()
    } else if delta > 0 {
        format!("{} ago", fmt_duration(secs))
    } else {
        format!("in {}", fmt_duration(secs))
    }
}

/// Compact value for chart Y-axis labels: "1.2G", "50M", "500K", "0.25".
pub fn fmt_axis(value: f64) -> String {
    if let Some(s) = fmt_non_finite(value) {
        return s;
    }
    let abs = value.abs();
    if abs >= 1_000_000_000.0 {
        format!("{:.1}G", value / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 10_000.0 {
        format!("{:.0}K", value / 1_000.0)
    } else if abs >= 100.0 || abs == 0.0 {
        format!("{value:.0}")
    } else if abs >= 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    }
}

/// Wall-clock label for a Unix timestamp on the time axis.
#[allow(
    clippy::cast_possible_truncation,
    clippy::as_conversions
)]
pub fn fmt_clock(timestamp: f64) -> String {
    DateTime::from_timestamp(timestamp.floor() as i64, 0).map_or_else(String::new, |t| {
        t.with_timezone(&Local).format("%H:%M").to_string()
    })
}

/// Render a bar split into filled and empty portions.
///
/// Returns `(filled, empty)` strings of `█` and `░` characters that together
/// span `width` character positions. Caller applies styling per segment.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn fmt_fraction_bar(fraction: f64, width: u16) -> (String, String) {
    let clamped = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let filled_count = (clamped * f64::from(width)).round() as u16;
    let empty_count = width.saturating_sub(filled_count);
    (
        "█".repeat(usize::from(filled_count)),
        "░".repeat(usize::from(empty_count)),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn bytes_use_binary_prefixes() {
        assert_eq!(fmt_bytes(512.0), "512 B");
        assert_eq!(fmt_bytes(1536.0), "1.5 KiB");
        assert_eq!(fmt_bytes(3.0 * 1024.0 * 1024.0 * 1024.0), "3.0 GiB");
        assert_eq!(fmt_bytes(-2048.0), "-2.0 KiB");
        assert_eq!(fmt_bytes(f64::NAN), "NaN");
    }

    #[test]
    fn time_ago() {
        let now = at(1_700_000_000);
        assert_eq!(fmt_time_ago(now, now), "now");
        assert_eq!(fmt_time_ago(at(1_699_999_991), now), "9s ago");
        assert_eq!(fmt_time_ago(at(1_700_000_000 - 15_780), now), "4h 23m ago");
        assert_eq!(fmt_time_ago(at(1_700_000_000 - 47 * 86_400), now), "47d ago");
        assert_eq!(fmt_time_ago(at(1_700_000_600), now), "in 10m");
    }

    #[test]
    fn fixed_decimals() {
        assert_eq!(fmt_fixed(1.23456, 2), "1.23");
        assert_eq!(fmt_fixed(2.0, 0), "2");
        assert_eq!(fmt_fixed(f64::INFINITY, 2), "+Inf");
        assert_eq!(fmt_fixed(f64::NEG_INFINITY, 2), "-Inf");
    }

    #[test]
    fn axis_labels() {
        assert_eq!(fmt_axis(0.0), "0");
        assert_eq!(fmt_axis(0.254), "0.25");
        assert_eq!(fmt_axis(5.44), "5.4");
        assert_eq!(fmt_axis(250.0), "250");
        assert_eq!(fmt_axis(52_000.0), "52K");
        assert_eq!(fmt_axis(1_340_000_000.0), "1.3G");
    }

    #[test]
    fn fraction_bar_spans_width() {
        assert_eq!(fmt_fraction_bar(0.5, 10), ("█████".to_string(), "░░░░░".to_string()));
        assert_eq!(fmt_fraction_bar(1.5, 4), ("████".to_string(), String::new()));
        assert_eq!(fmt_fraction_bar(-1.0, 3), (String::new(), "░░░".to_string()));
        assert_eq!(fmt_fraction_bar(f64::NAN, 2), (String::new(), "░░".to_string()));
    }
}
