//! Multi-line braille chart for range query results.

use promviz_core::{Panel, PanelData, TimeSeries};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, LegendPosition, Widget};

use super::fmt_legend;
use crate::theme::Theme;
use crate::widgets::fmt::{fmt_axis, fmt_clock};

/// Fraction of the value span added above and below the data.
const Y_PADDING: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub name: String,
    /// `(unix seconds, value)`, sorted by time.
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    pub traces: Vec<Trace>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

/// Y bounds for a data range: the span padded by 10% on both sides, a
/// zero span widened to `v ± 1`.
pub fn value_bounds(min: f64, max: f64) -> [f64; 2] {
    if max > min {
        let pad = (max - min) * Y_PADDING;
        [min - pad, max + pad]
    } else {
        [min - 1.0, max + 1.0]
    }
}

/// Flatten every series of every target into named traces and compute
/// shared bounds. `percentunit` values are scaled to percent. `None` when
/// there is no finite point to plot.
pub fn build_chart(data: &[TimeSeries], percentunit: bool) -> Option<ChartModel> {
    let scale = if percentunit { 100.0 } else { 1.0 };
    let mut traces = Vec::new();
    for target in data {
        for series in &target.series {
            let mut points: Vec<(f64, f64)> = series
                .points
                .iter()
                .filter(|p| p.value.is_finite() && p.timestamp.is_finite())
                .map(|p| (p.timestamp, p.value * scale))
                .collect();
            if points.is_empty() {
                continue;
            }
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            traces.push(Trace {
                name: fmt_legend(&target.legend_format, &series.labels),
                points,
            });
        }
    }

    let all = || traces.iter().flat_map(|t| t.points.iter());
    let x_min = all().map(|p| p.0).reduce(f64::min)?;
    let x_max = all().map(|p| p.0).reduce(f64::max)?;
    let y_min = all().map(|p| p.1).reduce(f64::min)?;
    let y_max = all().map(|p| p.1).reduce(f64::max)?;

    Some(ChartModel {
        x_bounds: if x_max > x_min { [x_min, x_max] } else { [x_min - 1.0, x_max + 1.0] },
        y_bounds: value_bounds(y_min, y_max),
        traces,
    })
}

pub fn render(panel: &Panel, data: Option<&PanelData>, area: Rect, buf: &mut Buffer, theme: &Theme) {
    let Some(PanelData::Series(series)) = data else {
        return;
    };
    let Some(model) = build_chart(series, panel.field_config.is_percentunit()) else {
        return;
    };

    let datasets: Vec<Dataset> = model
        .traces
        .iter()
        .enumerate()
        .map(|(i, trace)| {
            Dataset::default()
                .name(trace.name.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.series_color(i)))
                .data(&trace.points)
        })
        .collect();

    let [x0, x1] = model.x_bounds;
    let [y0, y1] = model.y_bounds;
    let x_axis = Axis::default()
        .style(theme.muted_style())
        .bounds(model.x_bounds)
        .labels(vec![
            Span::styled(fmt_clock(x0), theme.muted_style()),
            Span::styled(fmt_clock(x1), theme.muted_style()),
        ]);
    let y_axis = Axis::default()
        .style(theme.muted_style())
        .bounds(model.y_bounds)
        .labels(vec![
            Span::styled(fmt_axis(y0), theme.muted_style()),
            Span::styled(fmt_axis((y0 + y1) / 2.0), theme.muted_style()),
            Span::styled(fmt_axis(y1), theme.muted_style()),
        ]);

    Chart::new(datasets)
        .x_axis(x_axis)
        .y_axis(y_axis)
        .legend_position(Some(LegendPosition::TopLeft))
        .render(area, buf);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::panels::buffer_text;
    use promviz_api::{Labels, Point, Series};
    use promviz_core::{FieldConfig, GridPos, PanelType, Target};

    fn series(instance: &str, values: &[(f64, f64)]) -> Series {
        let labels: Labels = [("instance".to_string(), instance.to_string())]
            .into_iter()
            .collect();
        Series {
            labels,
            points: values
                .iter()
                .map(|&(timestamp, value)| Point { timestamp, value })
                .collect(),
        }
    }

    fn target(series: Vec<Series>) -> TimeSeries {
        TimeSeries {
            legend_format: "{{instance}}".into(),
            series,
        }
    }

    fn assert_close(actual: [f64; 2], expected: [f64; 2]) {
        assert!(
            (actual[0] - expected[0]).abs() < 1e-9 && (actual[1] - expected[1]).abs() < 1e-9,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn padded_bounds() {
        let data = vec![target(vec![series(
            "a",
            &[(100.0, 1.0), (160.0, 2.0), (220.0, 3.0), (280.0, 4.0), (340.0, 5.0)],
        )])];
        let model = build_chart(&data, false).unwrap();
        assert_close(model.y_bounds, [0.6, 5.4]);
        assert_eq!(model.x_bounds, [100.0, 340.0]);
        assert_eq!(model.traces[0].name, "a");
    }

    #[test]
    fn flat_series_widens_by_one() {
        let data = vec![target(vec![series("a", &[(0.0, 7.0), (60.0, 7.0)])])];
        assert_eq!(build_chart(&data, false).unwrap().y_bounds, [6.0, 8.0]);
    }

    #[test]
    fn percentunit_scales_to_percent() {
        let data = vec![target(vec![series("a", &[(0.0, 0.25), (60.0, 0.75)])])];
        let model = build_chart(&data, true).unwrap();
        assert_eq!(model.traces[0].points, vec![(0.0, 25.0), (60.0, 75.0)]);
        assert_close(model.y_bounds, [20.0, 80.0]);
    }

    #[test]
    fn all_zero_is_not_empty() {
        let data = vec![target(vec![series("a", &[(0.0, 0.0), (60.0, 0.0)])])];
        assert_eq!(build_chart(&data, false).unwrap().y_bounds, [-1.0, 1.0]);
    }

    #[test]
    fn bounds_span_every_trace() {
        let data = vec![
            target(vec![series("a", &[(0.0, 10.0), (60.0, 20.0)])]),
            target(vec![series("b", &[(30.0, 0.0), (120.0, 30.0)])]),
        ];
        let model = build_chart(&data, false).unwrap();
        assert_eq!(model.traces.len(), 2);
        assert_eq!(model.x_bounds, [0.0, 120.0]);
        assert_close(model.y_bounds, [-3.0, 33.0]);
    }

    #[test]
    fn points_are_sorted_and_non_finite_dropped() {
        let data = vec![target(vec![series(
            "a",
            &[(120.0, 2.0), (0.0, f64::NAN), (60.0, 1.0)],
        )])];
        let model = build_chart(&data, false).unwrap();
        assert_eq!(model.traces[0].points, vec![(60.0, 1.0), (120.0, 2.0)]);
    }

    #[test]
    fn no_points_no_chart() {
        assert!(build_chart(&[], false).is_none());
        assert!(build_chart(&[target(vec![series("a", &[])])], false).is_none());
    }

    #[test]
    fn renders_braille_lines() {
        let panel = Panel {
            id: 5,
            kind: PanelType::TimeSeries,
            title: "Load".into(),
            grid_pos: GridPos { x: 0, y: 0, w: 24, h: 8 },
            field_config: FieldConfig::default(),
            targets: vec![Target::default()],
        };
        let data = PanelData::Series(vec![target(vec![series(
            "h1",
            &[(0.0, 1.0), (600.0, 5.0), (1200.0, 2.0)],
        )])]);
        let mut buf = Buffer::empty(Rect::new(0, 0, 60, 12));
        render(&panel, Some(&data), buf.area, &mut buf, &Theme::default());
        let text = buffer_text(&buf);
        assert!(text.chars().any(|c| ('\u{2801}'..='\u{28ff}').contains(&c)), "{text}");
        assert!(text.contains("h1"), "{text}");
    }
}
