//! Dashboard model, layout engine and query orchestration for promviz.
//!
//! This crate holds everything between the Prometheus client and the
//! terminal UI, none of which touches the terminal:
//!
//! - **Domain model** ([`model`]): decoded, normalized and validated
//!   dashboard documents plus the tagged [`PanelData`] query results.
//!
//! - **[`compute_layout`]**: pure mapping from the 24-column grid onto a
//!   terminal viewport, in [`LayoutMode::Proportional`] or
//!   [`LayoutMode::Bucketed`] mode.
//!
//! - **[`Variables`]**: single-pass `$name` / `${name}` substitution in
//!   query expressions.
//!
//! - **[`Querier`]**: instant vs. range dispatch against any
//!   [`MetricsBackend`], with concurrent per-target queries and partial
//!   success for time-series panels.
//!
//! - **[`ResultCache`]**: last-known-good results per panel, guarded by a
//!   refresh generation counter.

pub mod cache;
pub mod error;
pub mod layout;
pub mod model;
pub mod querier;
pub mod variables;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheEntry, ResultCache};
pub use error::CoreError;
pub use layout::{LayoutMode, LayoutRow, PanelCell, compute_layout, content_height};
pub use model::{
    Dashboard, FieldConfig, GridPos, Panel, PanelData, PanelId, PanelType, Target, TimeSeries,
};
pub use querier::{
    DEFAULT_RANGE, DEFAULT_STEP, FetchOutcome, MetricsBackend, Querier, TargetError, TimeRange,
};
pub use variables::Variables;
