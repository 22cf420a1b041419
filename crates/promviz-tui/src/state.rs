//! View state machine.
//!
//! `ViewState::update` consumes one [`Action`] and returns the [`Effect`]s
//! the app must carry out. It performs no I/O, so every transition can be
//! exercised directly in tests.
//!
//! ```text
//! Uninitialized ──first Resize──▶ Ready ──Quit──▶ Quitting
//!       │                          ▲  │
//!       └──────────Quit────────────┼──┼──────────▶ Quitting
//!                                  └──┘ Refresh / Resize / Scroll / PanelFetched
//! ```

use std::sync::Arc;

use promviz_core::{
    Dashboard, LayoutMode, ResultCache, compute_layout, content_height,
};
use tracing::{debug, info};

use crate::action::{Action, Effect};

/// Header and footer lines around the scrollable body.
pub const CHROME_HEIGHT: u16 = 2;
/// Lines scrolled per mouse wheel notch.
pub const WHEEL_STEP: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Terminal size not known yet; nothing is drawn or fetched.
    #[default]
    Uninitialized,
    Ready,
    /// Terminal; every further action is ignored.
    Quitting,
}

/// Scrollable body area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u16,
    /// Body height, header and footer excluded.
    pub height: u16,
    /// First visible content line.
    pub offset: u16,
}

#[derive(Debug)]
pub struct ViewState {
    dashboard: Arc<Dashboard>,
    mode: LayoutMode,
    phase: Phase,
    viewport: Viewport,
    cache: ResultCache,
    /// Generation of the most recent fetch-all.
    generation: u64,
    /// Panels of the current generation still being fetched.
    in_flight: usize,
}

impl ViewState {
    pub fn new(dashboard: Arc<Dashboard>, mode: LayoutMode) -> Self {
        Self {
            dashboard,
            mode,
            phase: Phase::default(),
            viewport: Viewport::default(),
            cache: ResultCache::new(),
            generation: 0,
            in_flight: 0,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Largest valid scroll offset for the current viewport.
    pub fn max_offset(&self) -> u16 {
        let Viewport { width, height, .. } = self.viewport;
        let rows = compute_layout(&self.dashboard.panels, width, height, self.mode);
        content_height(&rows).saturating_sub(height)
    }

    /// Scroll position in `[0, 1]`; content that fits counts as fully scrolled.
    pub fn scroll_fraction(&self) -> f64 {
        let max = self.max_offset();
        if max == 0 {
            1.0
        } else {
            f64::from(self.viewport.offset) / f64::from(max)
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    pub fn update(&mut self, action: Action) -> Vec<Effect> {
        match (self.phase, action) {
            (Phase::Quitting, action) => {
                debug!(?action, "ignoring action after quit");
                Vec::new()
            }

            (_, Action::Quit) => {
                info!("quit requested");
                self.phase = Phase::Quitting;
                self.in_flight = 0;
                vec![Effect::Shutdown]
            }

            (Phase::Uninitialized, Action::Resize(w, h)) => {
                self.resize(w, h);
                self.phase = Phase::Ready;
                info!(width = w, height = h, "viewport ready");
                vec![self.fetch_all()]
            }

            (Phase::Uninitialized, action) => {
                debug!(?action, "ignoring action before first resize");
                Vec::new()
            }

            (Phase::Ready, Action::Resize(w, h)) => {
                self.resize(w, h);
                Vec::new()
            }

            (Phase::Ready, Action::Refresh) => vec![self.fetch_all()],

            (Phase::Ready, Action::ScrollUp(n)) => {
                self.scroll_to(self.viewport.offset.saturating_sub(n));
                Vec::new()
            }
            (Phase::Ready, Action::ScrollDown(n)) => {
                self.scroll_to(self.viewport.offset.saturating_add(n));
                Vec::new()
            }
            (Phase::Ready, Action::HalfPageUp) => {
                let half = self.half_page();
                self.scroll_to(self.viewport.offset.saturating_sub(half));
                Vec::new()
            }
            (Phase::Ready, Action::HalfPageDown) => {
                let half = self.half_page();
                self.scroll_to(self.viewport.offset.saturating_add(half));
                Vec::new()
            }
            (Phase::Ready, Action::ScrollTop) => {
                self.scroll_to(0);
                Vec::new()
            }
            (Phase::Ready, Action::ScrollBottom) => {
                self.scroll_to(u16::MAX);
                Vec::new()
            }

            (Phase::Ready, Action::PanelFetched { generation, outcome }) => {
                if generation == self.generation {
                    self.in_flight = self.in_flight.saturating_sub(1);
                }
                self.cache.apply(*outcome, generation);
                Vec::new()
            }
        }
    }

    fn fetch_all(&mut self) -> Effect {
        self.generation += 1;
        self.in_flight = self.dashboard.data_panels().count();
        debug!(generation = self.generation, panels = self.in_flight, "fetch all");
        Effect::FetchAll {
            generation: self.generation,
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.viewport.width = width;
        self.viewport.height = height.saturating_sub(CHROME_HEIGHT);
        self.scroll_to(self.viewport.offset);
    }

    fn scroll_to(&mut self, offset: u16) {
        self.viewport.offset = offset.min(self.max_offset());
    }

    fn half_page(&self) -> u16 {
        (self.viewport.height / 2).max(1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use promviz_api::{Labels, Point, Sample};
    use promviz_core::{
        CoreError, FetchOutcome, FieldConfig, GridPos, Panel, PanelData, PanelId, PanelType,
        Target,
    };

    use super::*;

    fn panel(id: PanelId, kind: PanelType, y: u16, h: u16) -> Panel {
        Panel {
            id,
            kind,
            title: format!("p{id}"),
            grid_pos: GridPos { x: 0, y, w: 24, h },
            field_config: FieldConfig::default(),
            targets: vec![Target {
                expr: "up".into(),
                ..Target::default()
            }],
        }
    }

    fn state_with(panels: Vec<Panel>) -> ViewState {
        let dashboard = Dashboard {
            title: "test".into(),
            refresh: None,
            panels,
            template_defaults: BTreeMap::new(),
        };
        ViewState::new(Arc::new(dashboard), LayoutMode::Proportional)
    }

    /// Two gauges, a full-height chart and a row separator.
    fn state() -> ViewState {
        state_with(vec![
            panel(1, PanelType::Gauge, 0, 4),
            panel(2, PanelType::Gauge, 4, 4),
            panel(3, PanelType::TimeSeries, 8, 24),
            panel(4, PanelType::Row, 32, 1),
        ])
    }

    fn ready() -> ViewState {
        let mut s = state();
        s.update(Action::Resize(48, 28));
        s
    }

    fn fetched(panel_id: PanelId, generation: u64, value: Option<f64>) -> Action {
        let result = match value {
            Some(v) => Ok(PanelData::Samples(vec![Sample {
                labels: Labels::new(),
                point: Point {
                    timestamp: 0.0,
                    value: v,
                },
            }])),
            None => Err(CoreError::Query {
                message: "unreachable".into(),
                status: None,
                transient: true,
            }),
        };
        Action::PanelFetched {
            generation,
            outcome: Box::new(FetchOutcome {
                panel_id,
                result,
                target_errors: Vec::new(),
                fetched_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            }),
        }
    }

    fn cached(s: &ViewState, id: PanelId) -> Option<f64> {
        s.cache()
            .data(id)
            .and_then(PanelData::first_sample)
            .map(|sample| sample.point.value)
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    #[test]
    fn first_resize_makes_ready_and_fetches() {
        let mut s = state();
        assert_eq!(s.update(Action::Refresh), vec![]);
        assert_eq!(s.update(Action::ScrollDown(1)), vec![]);
        assert_eq!(s.phase(), Phase::Uninitialized);

        let effects = s.update(Action::Resize(48, 28));
        assert_eq!(effects, vec![Effect::FetchAll { generation: 1 }]);
        assert_eq!(s.phase(), Phase::Ready);
        assert_eq!(s.viewport().height, 26);
        assert_eq!(s.in_flight(), 3);
    }

    #[test]
    fn later_resize_does_not_fetch() {
        let mut s = ready();
        assert_eq!(s.update(Action::Resize(80, 40)), vec![]);
        assert_eq!(s.viewport().width, 80);
        assert_eq!(s.generation(), 1);
    }

    #[test]
    fn refresh_bumps_generation() {
        let mut s = ready();
        assert_eq!(
            s.update(Action::Refresh),
            vec![Effect::FetchAll { generation: 2 }]
        );
        assert_eq!(
            s.update(Action::Refresh),
            vec![Effect::FetchAll { generation: 3 }]
        );
    }

    #[test]
    fn quit_is_terminal() {
        let mut s = ready();
        assert_eq!(s.update(Action::Quit), vec![Effect::Shutdown]);
        assert_eq!(s.phase(), Phase::Quitting);
        assert_eq!(s.update(Action::Refresh), vec![]);
        assert_eq!(s.update(Action::Quit), vec![]);
        assert_eq!(s.update(Action::Resize(10, 10)), vec![]);
        assert_eq!(s.phase(), Phase::Quitting);
    }

    #[test]
    fn quit_before_ready() {
        let mut s = state();
        assert_eq!(s.update(Action::Quit), vec![Effect::Shutdown]);
        assert_eq!(s.update(Action::Resize(48, 28)), vec![]);
    }

    // ── Fetch results ───────────────────────────────────────────────

    #[test]
    fn failed_panel_keeps_value_while_others_update() {
        let mut s = ready();
        s.update(fetched(1, 1, Some(10.0)));
        s.update(fetched(2, 1, Some(20.0)));

        s.update(Action::Refresh);
        s.update(fetched(1, 2, None));
        s.update(fetched(2, 2, Some(25.0)));

        assert_eq!(cached(&s, 1), Some(10.0));
        assert!(s.cache().get(1).unwrap().error.is_some());
        assert_eq!(cached(&s, 2), Some(25.0));
        assert_eq!(s.in_flight(), 1);
    }

    #[test]
    fn no_cache_write_after_quit() {
        let mut s = ready();
        s.update(Action::Quit);
        s.update(fetched(1, 1, Some(99.0)));
        assert!(s.cache().is_empty());
    }

    #[test]
    fn stale_generation_does_not_regress_cache() {
        let mut s = ready();
        s.update(Action::Refresh);
        s.update(fetched(1, 2, Some(2.0)));
        s.update(fetched(1, 1, Some(1.0)));
        assert_eq!(cached(&s, 1), Some(2.0));
    }

    // ── Scrolling ───────────────────────────────────────────────────

    #[test]
    fn scrolling_is_clamped_to_content() {
        let mut s = ready();
        // content: 4 + 4 + 26 + 1 = 35 lines, body 26
        assert_eq!(s.max_offset(), 9);

        s.update(Action::ScrollUp(5));
        assert_eq!(s.viewport().offset, 0);

        s.update(Action::ScrollDown(WHEEL_STEP));
        assert_eq!(s.viewport().offset, 3);

        s.update(Action::HalfPageDown);
        assert_eq!(s.viewport().offset, 9);

        s.update(Action::HalfPageUp);
        assert_eq!(s.viewport().offset, 0);

        s.update(Action::ScrollBottom);
        assert_eq!(s.viewport().offset, 9);
        assert_eq!(s.scroll_fraction(), 1.0);

        s.update(Action::ScrollTop);
        assert_eq!(s.viewport().offset, 0);
        assert_eq!(s.scroll_fraction(), 0.0);
    }

    #[test]
    fn growing_the_terminal_reclamps_offset() {
        // Ten stacked gauges: 40 fixed-height lines.
        let mut s = state_with(
            (0..10u16)
                .map(|i| panel(PanelId::from(i), PanelType::Gauge, i * 4, 4))
                .collect(),
        );
        s.update(Action::Resize(48, 28));
        s.update(Action::ScrollBottom);
        assert_eq!(s.viewport().offset, 14);

        s.update(Action::Resize(48, 60));
        assert_eq!(s.viewport().offset, 0);
        assert_eq!(s.scroll_fraction(), 1.0);
    }
}
