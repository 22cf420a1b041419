//! All possible UI actions. Actions are the sole mechanism for state mutation.

use promviz_core::FetchOutcome;

#[derive(Debug)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    /// Terminal size as (cols, rows).
    Resize(u16, u16),
    /// Periodic or manual refresh of every panel.
    Refresh,

    // ── Scrolling ─────────────────────────────────────────────────
    ScrollUp(u16),
    ScrollDown(u16),
    HalfPageUp,
    HalfPageDown,
    ScrollTop,
    ScrollBottom,

    // ── Data ──────────────────────────────────────────────────────
    /// A panel fetch issued by refresh `generation` completed.
    PanelFetched {
        generation: u64,
        outcome: Box<FetchOutcome>,
    },
}

/// Side effects requested by the state machine, executed by the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Spawn one fetch task per data panel, tagged with `generation`.
    FetchAll { generation: u64 },
    /// Cancel in-flight fetches and leave the event loop.
    Shutdown,
}
