//! Panel renderers.
//!
//! One module per panel kind. Each turns the cached [`PanelData`] of a panel
//! into widgets drawn inside a rect of an off-screen buffer; nothing here
//! touches the terminal or waits on a fetch. [`render_panel`] is the single
//! dispatch point over [`PanelType`].

pub mod bargauge;
pub mod gauge;
pub mod row;
pub mod stat;
pub mod timeseries;

use chrono::{DateTime, Utc};
use promviz_api::Labels;
use promviz_core::{CacheEntry, FieldConfig, Panel, PanelData, PanelType};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Widget};

use crate::theme::Theme;

/// Threshold band of a gauge-like value. The bands are fixed:
/// below 70% is low, below 90% is a warning, the rest is critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    Warning,
    Critical,
}

impl Band {
    pub fn for_fraction(fraction: f64) -> Self {
        if fraction < 0.7 {
            Self::Low
        } else if fraction < 0.9 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

/// Upper bound of gauge-like panels: `max` from the field config, else 1
/// for `percentunit` and 100 for everything else.
pub fn gauge_max(field: &FieldConfig) -> f64 {
    field
        .max
        .filter(|m| m.is_finite() && *m > 0.0)
        .unwrap_or(if field.is_percentunit() { 1.0 } else { 100.0 })
}

/// Fraction of `max` covered by `value`, clamped to `[0, 1]`.
pub fn fraction_of(value: f64, max: f64) -> f64 {
    if value.is_nan() || max <= 0.0 {
        return 0.0;
    }
    (value.clamp(0.0, max) / max).clamp(0.0, 1.0)
}

/// Expand a legend template such as `{{instance}} ({{job}})` with the
/// series labels. An empty template falls back to `metric{k="v",...}`.
pub fn fmt_legend(format: &str, labels: &Labels) -> String {
    if format.trim().is_empty() {
        let name = labels.get("__name__").map_or("", String::as_str);
        let rest: Vec<String> = labels
            .iter()
            .filter(|(k, _)| k.as_str() != "__name__")
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect();
        return if rest.is_empty() {
            name.to_owned()
        } else {
            format!("{name}{{{}}}", rest.join(","))
        };
    }

    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        if let Some(value) = labels.get(after[..end].trim()) {
            out.push_str(value);
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// Rounded block titled with the panel title; the error marker, when the
/// cache entry carries one, goes into the bottom border.
pub fn panel_block(panel: &Panel, entry: Option<&CacheEntry>, theme: &Theme) -> Block<'static> {
    let mut block = Block::default()
        .title(format!(" {} ", panel.title))
        .title_style(theme.title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.border_style());

    if let Some(marker) = entry.and_then(CacheEntry::marker) {
        block = block
            .title_bottom(Line::from(Span::styled(
                format!(" ⚠ {marker} "),
                theme.error_style(),
            )))
            .border_style(Style::default().fg(theme.critical));
    }
    block
}

/// Draw `panel` into `area` of `buf` from its cache entry.
pub fn render_panel(
    panel: &Panel,
    entry: Option<&CacheEntry>,
    area: Rect,
    buf: &mut Buffer,
    theme: &Theme,
    now: DateTime<Utc>,
) {
    if area.is_empty() {
        return;
    }
    if panel.kind == PanelType::Row {
        row::render(panel, area, buf, theme);
        return;
    }

    let block = panel_block(panel, entry, theme);
    let inner = block.inner(area);
    block.render(area, buf);

    let data: Option<&PanelData> = entry.and_then(|e| e.data.as_ref());
    match &panel.kind {
        PanelType::Gauge => gauge::render(panel, data, inner, buf, theme),
        PanelType::Stat => stat::render(panel, data, inner, buf, theme, now),
        PanelType::BarGauge => bargauge::render(panel, data, inner, buf, theme, now),
        PanelType::TimeSeries => timeseries::render(panel, data, inner, buf, theme),
        PanelType::Unknown(name) => {
            Paragraph::new(format!("Unsupported panel type: {name}"))
                .style(theme.muted_style())
                .render(inner, buf);
        }
        PanelType::Row => {}
    }
}

/// Concatenate every cell symbol of row `y` in `area` (test helper).
#[cfg(test)]
pub(crate) fn row_text(buf: &Buffer, y: u16) -> String {
    let area = buf.area;
    (area.x..area.x + area.width)
        .filter_map(|x| buf.cell((x, y)).map(|c| c.symbol().to_string()))
        .collect()
}

/// Whole buffer as newline-separated rows (test helper).
#[cfg(test)]
pub(crate) fn buffer_text(buf: &Buffer) -> String {
    let area = buf.area;
    (area.y..area.y + area.height)
        .map(|y| row_text(buf, y))
        .collect::<Vec<_>>()
        .join("\n")
}
