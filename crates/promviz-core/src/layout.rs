//! Grid layout engine.
//!
//! Maps the dashboard's declarative 24-column grid onto terminal cells.
//! Panels sharing a `gridPos.y` form one visual row, ordered by `x`; rows
//! stack top to bottom and each is as tall as its tallest cell.
//!
//! The computation is a pure function of `(panels, viewport, mode)` and runs
//! on every frame, so resizing the terminal and resizing back reproduces the
//! original layout exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{GRID_COLUMNS, Panel, PanelType};

/// Minimum body height of a chart panel, borders included.
pub const MIN_CHART_HEIGHT: u16 = 5;
/// Gauge: border, percentage label, bar, border.
pub const GAUGE_HEIGHT: u16 = 4;
/// Stat and unsupported panels: border, one line of text, border.
pub const TEXT_HEIGHT: u16 = 3;
/// Row separators are a single line.
pub const ROW_HEIGHT: u16 = 1;

/// How grid widths are converted into terminal columns.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LayoutMode {
    /// `floor(viewport * w / 24)`; chart heights scale with the viewport.
    #[default]
    Proportional,
    /// Widths bucketed into thirds of the viewport and snapped to grid
    /// columns; chart heights keep the panel's aspect ratio.
    Bucketed,
}

/// One panel placed on screen. `column` is relative to the viewport's left
/// edge; the row's `top` gives the vertical position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelCell<'a> {
    pub panel: &'a Panel,
    pub column: u16,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRow<'a> {
    /// Offset of the row from the top of the scrollable content.
    pub top: u16,
    pub height: u16,
    pub cells: Vec<PanelCell<'a>>,
}

/// Total height of the laid out content.
pub fn content_height(rows: &[LayoutRow<'_>]) -> u16 {
    rows.last().map_or(0, |r| r.top.saturating_add(r.height))
}

/// Lay out `panels` for a viewport of `width` x `height` cells.
pub fn compute_layout<'a>(
    panels: &'a [Panel],
    width: u16,
    height: u16,
    mode: LayoutMode,
) -> Vec<LayoutRow<'a>> {
    let mut groups: BTreeMap<u16, Vec<&'a Panel>> = BTreeMap::new();
    for panel in panels {
        groups.entry(panel.grid_pos.y).or_default().push(panel);
    }

    let mut rows = Vec::with_capacity(groups.len());
    let mut top: u16 = 0;
    let mut push_row = |cells: Vec<PanelCell<'a>>, rows: &mut Vec<LayoutRow<'a>>| {
        let row_height = cells.iter().map(|c| c.height).max().unwrap_or(0);
        rows.push(LayoutRow {
            top,
            height: row_height,
            cells,
        });
        top = top.saturating_add(row_height);
    };

    for (_, mut group) in groups {
        // Stable: equal `x` keeps source order.
        group.sort_by_key(|p| p.grid_pos.x);

        // Row separators span the full width and are never scaled.
        let (separators, data): (Vec<&Panel>, Vec<&Panel>) =
            group.into_iter().partition(|p| p.kind == PanelType::Row);
        for panel in separators {
            let cell = PanelCell {
                panel,
                column: 0,
                width: width.max(1),
                height: ROW_HEIGHT,
            };
            push_row(vec![cell], &mut rows);
        }

        if data.is_empty() {
            continue;
        }
        let mut cells = Vec::with_capacity(data.len());
        let mut next_free: u16 = 0;
        for panel in data {
            let desired = panel_width(panel.grid_pos.w, width, mode);
            let column = grid_offset(panel.grid_pos.x, width)
                .max(next_free)
                .min(width.saturating_sub(1));
            let cell_width = desired.min(width.saturating_sub(column)).max(1);
            next_free = column.saturating_add(cell_width);
            cells.push(PanelCell {
                panel,
                column,
                width: cell_width,
                height: panel_height(panel, cell_width, height, mode),
            });
        }
        push_row(cells, &mut rows);
    }

    rows
}

/// Terminal width for a panel `grid_w` grid units wide.
pub fn panel_width(grid_w: u16, viewport_width: u16, mode: LayoutMode) -> u16 {
    let w = u32::from(grid_w.min(GRID_COLUMNS));
    let avail = u32::from(viewport_width);
    let cols = u32::from(GRID_COLUMNS);

    let width = match mode {
        LayoutMode::Proportional => avail * w / cols,
        LayoutMode::Bucketed => {
            // Up to 33% of the grid is a third, up to 66% two thirds.
            let bucket = if w * 100 <= cols * 33 {
                avail / 3
            } else if w * 100 <= cols * 66 {
                avail * 2 / 3
            } else {
                avail
            };
            snap_to_grid(bucket, avail)
        }
    };
    clamp_u16(width).min(viewport_width).max(1)
}

/// Terminal height for `panel` once its width is known.
pub fn panel_height(panel: &Panel, width: u16, viewport_height: u16, mode: LayoutMode) -> u16 {
    match panel.kind {
        PanelType::Row => ROW_HEIGHT,
        PanelType::Gauge => GAUGE_HEIGHT,
        PanelType::Stat | PanelType::Unknown(_) => TEXT_HEIGHT,
        PanelType::TimeSeries | PanelType::BarGauge => {
            let h = u32::from(panel.grid_pos.h);
            let scaled = match mode {
                LayoutMode::Proportional => {
                    u32::from(viewport_height) * h / u32::from(GRID_COLUMNS)
                }
                LayoutMode::Bucketed => {
                    let w = u32::from(panel.grid_pos.w.max(1));
                    (u32::from(width) * h / w).min(u32::from(viewport_height))
                }
            };
            clamp_u16(scaled).max(MIN_CHART_HEIGHT)
        }
    }
}

fn grid_offset(grid_x: u16, viewport_width: u16) -> u16 {
    clamp_u16(u32::from(viewport_width) * u32::from(grid_x) / u32::from(GRID_COLUMNS))
}

/// Round `width` to the nearest multiple of one grid column
/// (`available / 24`, fractional).
fn snap_to_grid(width: u32, available: u32) -> u32 {
    let column = f64::from(available) / f64::from(GRID_COLUMNS);
    if column <= 0.0 {
        return width;
    }
    let snapped = (f64::from(width) / column).round() * column;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::as_conversions
    )]
    let snapped = snapped.floor() as u32;
    snapped.min(available)
}

fn clamp_u16(v: u32) -> u16 {
    u16::try_from(v).unwrap_or(u16::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{FieldConfig, GridPos, PanelId};
    use pretty_assertions::assert_eq;

    fn panel(id: PanelId, kind: PanelType, x: u16, y: u16, w: u16, h: u16) -> Panel {
        Panel {
            id,
            kind,
            title: format!("panel {id}"),
            grid_pos: GridPos { x, y, w, h },
            field_config: FieldConfig::default(),
            targets: Vec::new(),
        }
    }

    /// `(id, column, width, height)` per row, for compact assertions.
    fn shape(rows: &[LayoutRow<'_>]) -> Vec<Vec<(PanelId, u16, u16, u16)>> {
        rows.iter()
            .map(|r| {
                r.cells
                    .iter()
                    .map(|c| (c.panel.id, c.column, c.width, c.height))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn groups_by_y_and_orders_by_x() {
        let panels = vec![
            panel(1, PanelType::Stat, 12, 0, 12, 4),
            panel(2, PanelType::Gauge, 0, 0, 12, 4),
            panel(3, PanelType::TimeSeries, 0, 4, 24, 8),
        ];
        let rows = compute_layout(&panels, 100, 48, LayoutMode::Proportional);

        assert_eq!(
            shape(&rows),
            vec![vec![(2, 0, 50, 4), (1, 50, 50, 3)], vec![(3, 0, 100, 16)]]
        );
        assert_eq!(rows[0].top, 0);
        assert_eq!(rows[0].height, 4);
        assert_eq!(rows[1].top, 4);
        assert_eq!(content_height(&rows), 20);
    }

    #[test]
    fn equal_x_keeps_source_order() {
        let panels = vec![
            panel(7, PanelType::Stat, 0, 0, 6, 3),
            panel(3, PanelType::Stat, 0, 0, 6, 3),
        ];
        let rows = compute_layout(&panels, 48, 24, LayoutMode::Proportional);
        let ids: Vec<PanelId> = rows[0].cells.iter().map(|c| c.panel.id).collect();
        assert_eq!(ids, vec![7, 3]);
    }

    #[test]
    fn row_panels_are_full_width_separators() {
        let panels = vec![
            panel(1, PanelType::Row, 0, 0, 24, 1),
            panel(2, PanelType::Gauge, 0, 1, 6, 4),
        ];
        let rows = compute_layout(&panels, 80, 24, LayoutMode::Proportional);
        assert_eq!(shape(&rows), vec![vec![(1, 0, 80, 1)], vec![(2, 0, 20, 4)]]);
    }

    #[test]
    fn fixed_heights_and_chart_minimum() {
        let panels = vec![
            panel(1, PanelType::Gauge, 0, 0, 4, 10),
            panel(2, PanelType::Stat, 4, 0, 4, 10),
            panel(3, PanelType::Unknown("text".into()), 8, 0, 4, 10),
            panel(4, PanelType::TimeSeries, 12, 0, 6, 1),
            panel(5, PanelType::BarGauge, 18, 0, 6, 12),
        ];
        let rows = compute_layout(&panels, 96, 40, LayoutMode::Proportional);
        let heights: Vec<u16> = rows[0].cells.iter().map(|c| c.height).collect();
        assert_eq!(heights, vec![4, 3, 3, MIN_CHART_HEIGHT, 20]);
        assert_eq!(rows[0].height, 20);
    }

    #[test]
    fn width_rounding_to_zero_floors_to_one() {
        let panels = vec![panel(1, PanelType::Stat, 0, 0, 1, 3)];
        let rows = compute_layout(&panels, 10, 10, LayoutMode::Proportional);
        assert_eq!(rows[0].cells[0].width, 1);
    }

    #[test]
    fn overlapping_cells_are_pushed_right_and_clipped() {
        let panels = vec![
            panel(1, PanelType::Stat, 0, 0, 13, 3),
            panel(2, PanelType::Stat, 12, 0, 12, 3),
        ];
        let rows = compute_layout(&panels, 24, 24, LayoutMode::Proportional);
        assert_eq!(shape(&rows), vec![vec![(1, 0, 13, 3), (2, 13, 11, 3)]]);
    }

    #[test]
    fn cells_never_exceed_viewport() {
        let panels = vec![
            panel(1, PanelType::Stat, 20, 0, 24, 3),
            panel(2, PanelType::Stat, 23, 0, 24, 3),
        ];
        for width in [1, 7, 24, 80, 211] {
            let rows = compute_layout(&panels, width, 24, LayoutMode::Proportional);
            for cell in &rows[0].cells {
                assert!(cell.width >= 1);
                assert!(cell.column + cell.width <= width.max(1), "{cell:?} at {width}");
            }
        }
    }

    #[test]
    fn width_is_bounded_and_monotonic_in_grid_width() {
        for mode in [LayoutMode::Proportional, LayoutMode::Bucketed] {
            for viewport in 24..=320 {
                let mut previous = 0;
                for w in 1..=GRID_COLUMNS {
                    let width = panel_width(w, viewport, mode);
                    assert!(width <= viewport, "{mode} w={w} viewport={viewport}");
                    assert!(width >= previous, "{mode} w={w} viewport={viewport}");
                    previous = width;
                }
            }
        }
    }

    #[test]
    fn layout_is_idempotent_and_survives_resize_round_trip() {
        let panels = vec![
            panel(1, PanelType::Row, 0, 0, 24, 1),
            panel(2, PanelType::Gauge, 0, 1, 8, 4),
            panel(3, PanelType::TimeSeries, 8, 1, 16, 8),
            panel(4, PanelType::Stat, 0, 9, 24, 3),
        ];
        for mode in [LayoutMode::Proportional, LayoutMode::Bucketed] {
            let before = shape(&compute_layout(&panels, 120, 40, mode));
            assert_eq!(before, shape(&compute_layout(&panels, 120, 40, mode)));
            let _small = compute_layout(&panels, 60, 20, mode);
            assert_eq!(before, shape(&compute_layout(&panels, 120, 40, mode)));
        }
    }

    // ── Bucketed mode ───────────────────────────────────────────────

    #[test]
    fn bucketed_widths_snap_to_thirds() {
        assert_eq!(panel_width(4, 120, LayoutMode::Bucketed), 40);
        assert_eq!(panel_width(7, 120, LayoutMode::Bucketed), 40);
        assert_eq!(panel_width(15, 120, LayoutMode::Bucketed), 80);
        assert_eq!(panel_width(17, 120, LayoutMode::Bucketed), 120);
        assert_eq!(panel_width(24, 120, LayoutMode::Bucketed), 120);
    }

    #[test]
    fn bucketed_third_and_two_thirds_widths_round_up() {
        // 8/24 is 33.3% and 16/24 is 66.7%, just past each bucket edge.
        assert_eq!(panel_width(8, 120, LayoutMode::Bucketed), 80);
        assert_eq!(panel_width(16, 120, LayoutMode::Bucketed), 120);
    }

    #[test]
    fn bucketed_chart_height_keeps_aspect_and_caps_at_viewport() {
        let chart = panel(1, PanelType::TimeSeries, 0, 0, 12, 3);
        assert_eq!(panel_height(&chart, 80, 100, LayoutMode::Bucketed), 20);
        let tall = panel(2, PanelType::TimeSeries, 0, 0, 6, 24);
        assert_eq!(panel_height(&tall, 40, 30, LayoutMode::Bucketed), 30);
    }

    #[test]
    fn layout_mode_names() {
        assert_eq!("bucketed".parse::<LayoutMode>().unwrap(), LayoutMode::Bucketed);
        assert_eq!(LayoutMode::Proportional.to_string(), "proportional");
        assert!("grid".parse::<LayoutMode>().is_err());
    }
}
