use promviz_core::{Panel, PanelData};
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use super::{Band, fraction_of, gauge_max};
use crate::theme::Theme;
use crate::widgets::fmt::fmt_fraction_bar;

/// What a gauge shows: how much of its maximum the first sample fills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeModel {
    pub fraction: f64,
    pub band: Band,
}

impl GaugeModel {
    pub fn new(value: f64, max: f64) -> Self {
        let fraction = fraction_of(value, max);
        Self {
            fraction,
            band: Band::for_fraction(fraction),
        }
    }

    pub fn label(&self) -> String {
        format!("{:.2}%", self.fraction * 100.0)
    }
}

pub fn render(panel: &Panel, data: Option<&PanelData>, area: Rect, buf: &mut Buffer, theme: &Theme) {
    // No data draws an empty gauge.
    let value = data
        .and_then(PanelData::first_sample)
        .map_or(0.0, |s| s.point.value);
    let model = GaugeModel::new(value, gauge_max(&panel.field_config));
    let color = theme.band_color(model.band);
    let (filled, empty) = fmt_fraction_bar(model.fraction, area.width);
    let bar = Line::from(vec![
        Span::styled(filled, Style::default().fg(color)),
        Span::styled(empty, theme.muted_style()),
    ]);
    let label = Line::from(Span::styled(model.label(), theme.value_style().fg(color)))
        .alignment(Alignment::Center);

    let lines = if area.height >= 2 { vec![label, bar] } else { vec![bar] };
    Paragraph::new(lines).render(area, buf);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::panels::row_text;
    use pretty_assertions::assert_eq;
    use promviz_api::{Point, Sample};
    use promviz_core::{FieldConfig, GridPos, PanelType, Target};

    fn gauge(unit: Option<&str>) -> Panel {
        Panel {
            id: 1,
            kind: PanelType::Gauge,
            title: "CPU".into(),
            grid_pos: GridPos { x: 0, y: 0, w: 6, h: 4 },
            field_config: FieldConfig {
                unit: unit.map(Into::into),
                ..FieldConfig::default()
            },
            targets: vec![Target::default()],
        }
    }

    fn samples(value: f64) -> PanelData {
        PanelData::Samples(vec![Sample {
            labels: Default::default(),
            point: Point { timestamp: 1_700_000_000.0, value },
        }])
    }

    #[test]
    fn value_within_range() {
        let m = GaugeModel::new(95.0, 100.0);
        assert_eq!(m.label(), "95.00%");
        assert_eq!(m.band, Band::Critical);

        let m = GaugeModel::new(50.0, 100.0);
        assert_eq!(m.label(), "50.00%");
        assert_eq!(m.band, Band::Low);

        assert_eq!(GaugeModel::new(75.0, 100.0).band, Band::Warning);
    }

    #[test]
    fn value_is_clamped() {
        assert_eq!(GaugeModel::new(-10.0, 100.0).label(), "0.00%");
        assert_eq!(GaugeModel::new(150.0, 100.0).label(), "100.00%");
        assert_eq!(GaugeModel::new(f64::NAN, 100.0).fraction, 0.0);
        assert_eq!(GaugeModel::new(5.0, 0.0).fraction, 0.0);
    }

    #[test]
    fn renders_label_and_bar() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 2));
        render(&gauge(None), Some(&samples(50.0)), buf.area, &mut buf, &Theme::default());
        assert_eq!(row_text(&buf, 0).trim(), "50.00%");
        assert_eq!(row_text(&buf, 1), "█████░░░░░");
    }

    #[test]
    fn percentunit_defaults_to_unit_max() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 2));
        render(&gauge(Some("percentunit")), Some(&samples(0.95)), buf.area, &mut buf, &Theme::default());
        assert_eq!(row_text(&buf, 0).trim(), "95.00%");
    }

    #[test]
    fn no_data_is_an_empty_gauge() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 8, 2));
        render(&gauge(None), None, buf.area, &mut buf, &Theme::default());
        assert_eq!(row_text(&buf, 0).trim(), "0.00%");
        assert_eq!(row_text(&buf, 1), "░░░░░░░░");
    }
}
