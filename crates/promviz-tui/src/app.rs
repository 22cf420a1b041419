//! Application core: event loop, fetch fan-out and frame rendering.
//!
//! Terminal events and fetch completions are both turned into [`Action`]s
//! and fed through [`ViewState::update`]; the returned [`Effect`]s are the
//! only place the app spawns or cancels work.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use promviz_core::{Dashboard, LayoutMode, MetricsBackend, Querier, TimeRange, Variables, compute_layout};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::action::{Action, Effect};
use crate::event::{Event, EventReader};
use crate::panels::render_panel;
use crate::state::{Phase, ViewState, WHEEL_STEP};
use crate::theme::Theme;
use crate::tui::Tui;

/// Settings resolved in `main` from config, dashboard and CLI.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub refresh: Duration,
    pub range: Duration,
    pub layout: LayoutMode,
}

pub struct App<B> {
    state: ViewState,
    querier: Arc<Querier<B>>,
    variables: Arc<Variables>,
    options: AppOptions,
    theme: Theme,
    running: bool,
    /// Parent of every fetch task's token; cancelled on shutdown.
    cancel: CancellationToken,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl<B: MetricsBackend + 'static> App<B> {
    pub fn new(
        dashboard: Arc<Dashboard>,
        querier: Querier<B>,
        variables: Variables,
        options: AppOptions,
    ) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        Self {
            state: ViewState::new(dashboard, options.layout),
            querier: Arc::new(querier),
            variables: Arc::new(variables),
            options,
            theme: Theme::default(),
            running: true,
            cancel: CancellationToken::new(),
            action_tx,
            action_rx,
        }
    }

    /// Run until quit. Restores the terminal on every exit path.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        let mut events = EventReader::new(self.options.refresh);

        // crossterm reports no initial size, so seed the first resize.
        let (w, h) = tui.size()?;
        self.dispatch(Action::Resize(w, h));
        info!(
            dashboard = %self.state.dashboard().title,
            refresh = %humantime::format_duration(self.options.refresh),
            "event loop started"
        );

        while self.running {
            tui.terminal.draw(|frame| self.render(frame))?;

            let next = tokio::select! {
                event = events.next() => match event {
                    Some(event) => action_for_event(event),
                    None => Some(Action::Quit),
                },
                Some(action) = self.action_rx.recv() => Some(action),
            };
            if let Some(action) = next {
                self.dispatch(action);
            }
            while let Ok(action) = self.action_rx.try_recv() {
                self.dispatch(action);
            }
        }

        events.stop();
        tui.exit();
        info!("event loop ended");
        Ok(())
    }

    /// Feed one action through the state machine and carry out its effects.
    pub fn dispatch(&mut self, action: Action) {
        for effect in self.state.update(action) {
            match effect {
                Effect::FetchAll { generation } => self.spawn_fetches(generation),
                Effect::Shutdown => {
                    info!(generation = self.state.generation(), "shutting down");
                    self.cancel.cancel();
                    self.running = false;
                }
            }
        }
    }

    fn spawn_fetches(&self, generation: u64) {
        let range = TimeRange::last(self.options.range, Utc::now());
        for panel in self.state.dashboard().data_panels() {
            let panel = panel.clone();
            let querier = Arc::clone(&self.querier);
            let variables = Arc::clone(&self.variables);
            let tx = self.action_tx.clone();
            let cancel = self.cancel.child_token();

            tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!(panel = panel.id, generation, "fetch cancelled");
                    }
                    outcome = querier.fetch(&panel, &variables, range) => {
                        let _ = tx.send(Action::PanelFetched {
                            generation,
                            outcome: Box::new(outcome),
                        });
                    }
                }
            });
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    pub fn render(&self, frame: &mut Frame) {
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.render_header(frame, header);
        if self.state.phase() == Phase::Ready {
            self.render_body(frame.buffer_mut(), body);
        }
        self.render_footer(frame, footer);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let cache = self.state.cache();
        let title = Line::from(vec![
            Span::styled(" promviz ", self.theme.brand_style()),
            Span::styled("│ ", self.theme.muted_style()),
            Span::styled(self.state.dashboard().title.clone(), self.theme.title_style()),
        ]);
        frame.render_widget(Paragraph::new(title), area);

        let updated = cache.last_update().map_or_else(
            || "never".to_string(),
            |t| t.with_timezone(&Local).format("%H:%M:%S").to_string(),
        );
        let status = Line::from(vec![
            Span::styled(format!("updated {updated}  "), self.theme.muted_style()),
            crate::widgets::status::status_span(
                self.state.in_flight(),
                cache.error_count(),
                &self.theme,
            ),
            Span::raw(" "),
        ]);
        frame.render_widget(Paragraph::new(status).alignment(Alignment::Right), area);
    }

    /// Draw the panels overlapping the viewport into a scratch buffer in
    /// content coordinates, then copy the visible lines into `buf`.
    fn render_body(&self, buf: &mut Buffer, area: Rect) {
        let viewport = self.state.viewport();
        let top = viewport.offset;
        let bottom = top.saturating_add(area.height);

        let rows = compute_layout(
            &self.state.dashboard().panels,
            area.width,
            area.height,
            self.state.mode(),
        );
        let visible: Vec<_> = rows
            .iter()
            .filter(|r| r.top < bottom && r.top.saturating_add(r.height) > top)
            .collect();
        let (Some(first), Some(last)) = (visible.first(), visible.last()) else {
            return;
        };
        let window_top = first.top;
        let window_bottom = last.top.saturating_add(last.height);
        let mut scratch = Buffer::empty(Rect::new(0, window_top, area.width, window_bottom - window_top));

        let now = Utc::now();
        for row in &visible {
            for cell in &row.cells {
                let rect = Rect::new(cell.column, row.top, cell.width, cell.height);
                let entry = self.state.cache().get(cell.panel.id);
                render_panel(cell.panel, entry, rect, &mut scratch, &self.theme, now);
            }
        }

        for line in 0..area.height {
            let y = top.saturating_add(line);
            for x in 0..area.width {
                if let (Some(src), Some(dst)) =
                    (scratch.cell((x, y)), buf.cell_mut((area.x + x, area.y + line)))
                {
                    *dst = src.clone();
                }
            }
        }
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::raw(" ")];
        for (key, label) in [
            ("q", "quit"),
            ("r", "refresh"),
            ("↑↓", "scroll"),
            ("PgUp/PgDn", "page"),
            ("g/G", "top/bottom"),
        ] {
            spans.push(Span::styled(key, self.theme.key_hint_key()));
            spans.push(Span::styled(format!(" {label}  "), self.theme.key_hint()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
        let percent = (self.state.scroll_fraction() * 100.0).round() as u8;
        let position = Line::from(Span::styled(format!("{percent:>3}% "), self.theme.muted_style()));
        frame.render_widget(Paragraph::new(position).alignment(Alignment::Right), area);
    }
}

// ── Input mapping ────────────────────────────────────────────────────

pub fn action_for_event(event: Event) -> Option<Action> {
    match event {
        Event::Key(key) => action_for_key(key),
        Event::Mouse(mouse) => action_for_mouse(mouse),
        Event::Resize(w, h) => Some(Action::Resize(w, h)),
        Event::Refresh => Some(Action::Refresh),
        Event::Interrupt => Some(Action::Quit),
    }
}

pub fn action_for_key(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('d') => Some(Action::HalfPageDown),
            KeyCode::Char('u') => Some(Action::HalfPageUp),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('r') => Some(Action::Refresh),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::ScrollUp(1)),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::ScrollDown(1)),
        KeyCode::PageUp => Some(Action::HalfPageUp),
        KeyCode::PageDown => Some(Action::HalfPageDown),
        KeyCode::Home | KeyCode::Char('g') => Some(Action::ScrollTop),
        KeyCode::End | KeyCode::Char('G') => Some(Action::ScrollBottom),
        _ => None,
    }
}

fn action_for_mouse(mouse: MouseEvent) -> Option<Action> {
    match mouse.kind {
        MouseEventKind::ScrollUp => Some(Action::ScrollUp(WHEEL_STEP)),
        MouseEventKind::ScrollDown => Some(Action::ScrollDown(WHEEL_STEP)),
        _ => None,
    }
}
