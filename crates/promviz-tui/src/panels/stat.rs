use chrono::{DateTime, TimeDelta, Utc};
use promviz_core::{FieldConfig, Panel, PanelData};
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::widgets::{Paragraph, Widget};

use crate::theme::Theme;
use crate::widgets::fmt::{fmt_bytes, fmt_fixed, fmt_time_ago};

const DEFAULT_DECIMALS: u8 = 2;

/// Format a single value according to the panel's unit.
///
/// `s` values are elapsed seconds (uptime, age) and render as the moment
/// `value` seconds before `now`.
pub fn format_value(value: f64, field: &FieldConfig, now: DateTime<Utc>) -> String {
    let decimals = field.decimals.unwrap_or(DEFAULT_DECIMALS);
    match field.unit() {
        "s" => seconds_ago(value, now),
        "bytes" => fmt_bytes(value),
        "percent" => format!("{}%", fmt_fixed(value, decimals)),
        "percentunit" => format!("{}%", fmt_fixed(value * 100.0, decimals)),
        _ => fmt_fixed(value, decimals),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::as_conversions
)]
fn seconds_ago(value: f64, now: DateTime<Utc>) -> String {
    if !value.is_finite() {
        return fmt_fixed(value, 0);
    }
    let elapsed = TimeDelta::try_milliseconds((value * 1000.0).round() as i64);
    match elapsed.and_then(|d| now.checked_sub_signed(d)) {
        Some(then) => fmt_time_ago(then, now),
        None => format!("{}s", fmt_fixed(value, 0)),
    }
}

pub fn render(
    panel: &Panel,
    data: Option<&PanelData>,
    area: Rect,
    buf: &mut Buffer,
    theme: &Theme,
    now: DateTime<Utc>,
) {
    let (text, style) = match data.and_then(PanelData::first_sample) {
        Some(sample) => (
            format_value(sample.point.value, &panel.field_config, now),
            theme.value_style(),
        ),
        None => ("No data".to_string(), theme.muted_style()),
    };

    // Vertically centered in whatever height the layout gave us.
    let mut target = area;
    if area.height > 1 {
        target.y += (area.height - 1) / 2;
        target.height = 1;
    }
    Paragraph::new(text)
        .style(style)
        .alignment(Alignment::Center)
        .render(target, buf);
}
