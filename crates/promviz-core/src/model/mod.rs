// ── Dashboard domain model ──
//
// The dashboard document is decoded once, normalized, validated and then
// treated as immutable. Query results live in `result` and are replaced
// wholesale on every fetch.

pub mod dashboard;
pub mod result;

// ── Re-exports ──────────────────────────────────────────────────────

pub use dashboard::{
    Dashboard, FieldConfig, GridPos, GRID_COLUMNS, Panel, PanelId, PanelType, Target,
    parse_refresh,
};
pub use result::{PanelData, TimeSeries};
