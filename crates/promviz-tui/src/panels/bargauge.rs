use chrono::{DateTime, Utc};
use promviz_core::{Panel, PanelData};
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use super::{Band, fmt_legend, fraction_of, gauge_max, stat};
use crate::theme::Theme;
use crate::widgets::fmt::fmt_fraction_bar;

/// One horizontal bar per sample of the instant vector.
#[derive(Debug, Clone, PartialEq)]
pub struct BarRow {
    pub label: String,
    pub value: String,
    pub fraction: f64,
    pub band: Band,
}

pub fn bar_rows(panel: &Panel, data: &PanelData, now: DateTime<Utc>) -> Vec<BarRow> {
    let PanelData::Samples(samples) = data else {
        return Vec::new();
    };
    let legend = panel
        .visible_targets()
        .next()
        .map_or("", |t| t.legend_format.as_str());
    let max = gauge_max(&panel.field_config);

    samples
        .iter()
        .map(|s| {
            let fraction = fraction_of(s.point.value, max);
            BarRow {
                label: fmt_legend(legend, &s.labels),
                value: stat::format_value(s.point.value, &panel.field_config, now),
                fraction,
                band: Band::for_fraction(fraction),
            }
        })
        .collect()
}

fn fit(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat_n(' ', width - len));
    out
}

pub fn render(
    panel: &Panel,
    data: Option<&PanelData>,
    area: Rect,
    buf: &mut Buffer,
    theme: &Theme,
    now: DateTime<Utc>,
) {
    let rows = data.map(|d| bar_rows(panel, d, now)).unwrap_or_default();
    if rows.is_empty() {
        Paragraph::new("No data")
            .style(theme.muted_style())
            .alignment(Alignment::Center)
            .render(area, buf);
        return;
    }

    let width = usize::from(area.width);
    let label_w = rows
        .iter()
        .map(|r| r.label.chars().count())
        .max()
        .unwrap_or(0)
        .min(width / 3);
    let value_w = rows.iter().map(|r| r.value.chars().count()).max().unwrap_or(0);
    let bar_w = width.saturating_sub(label_w + value_w + 2);
    let bar_w = u16::try_from(bar_w).unwrap_or(u16::MAX);

    let lines: Vec<Line> = rows
        .iter()
        .map(|r| {
            let (filled, empty) = fmt_fraction_bar(r.fraction, bar_w);
            Line::from(vec![
                Span::styled(fit(&r.label, label_w), theme.text_style()),
                Span::raw(" "),
                Span::styled(filled, Style::default().fg(theme.band_color(r.band))),
                Span::styled(empty, theme.muted_style()),
                Span::raw(" "),
                Span::styled(format!("{:>value_w$}", r.value), theme.value_style()),
            ])
        })
        .collect();
    Paragraph::new(lines).render(area, buf);
}
