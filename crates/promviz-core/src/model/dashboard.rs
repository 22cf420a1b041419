// ── Dashboard document types ──
//
// Only the subset of the Grafana dashboard schema that promviz renders is
// decoded; unknown fields are ignored. The raw serde shapes are private and
// converted into the public model by `Dashboard::from_json`.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::CoreError;

/// Width of the declarative layout grid.
pub const GRID_COLUMNS: u16 = 24;

/// Panel identifier, unique within one dashboard.
pub type PanelId = i64;

/// Closed set of panel kinds promviz knows how to draw.
///
/// Anything else decodes to `Unknown`, which keeps the original type name so
/// the renderer can say what it could not draw.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PanelType {
    Row,
    Gauge,
    #[strum(serialize = "stat", serialize = "singlestat")]
    Stat,
    #[strum(serialize = "timeseries", serialize = "graph")]
    TimeSeries,
    BarGauge,
    #[strum(default)]
    Unknown(String),
}

impl PanelType {
    /// Panels that are backed by a query.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            Self::Gauge | Self::Stat | Self::TimeSeries | Self::BarGauge
        )
    }

    /// Panels whose result comes from an instant query.
    pub fn is_instant(&self) -> bool {
        matches!(self, Self::Gauge | Self::Stat | Self::BarGauge)
    }
}

impl From<&str> for PanelType {
    fn from(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|_| Self::Unknown(s.to_owned()))
    }
}

impl fmt::Display for PanelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => f.write_str("row"),
            Self::Gauge => f.write_str("gauge"),
            Self::Stat => f.write_str("stat"),
            Self::TimeSeries => f.write_str("timeseries"),
            Self::BarGauge => f.write_str("bargauge"),
            Self::Unknown(name) => f.write_str(name),
        }
    }
}

/// Position on the 24-column grid. `h` is in grid units of ~30px each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct GridPos {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

/// Display options shared by every panel kind (`fieldConfig.defaults`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub unit: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub decimals: Option<u8>,
}

impl FieldConfig {
    pub fn unit(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }

    pub fn is_percentunit(&self) -> bool {
        self.unit() == "percentunit"
    }
}

/// A single query of a panel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Target {
    pub expr: String,
    pub legend_format: String,
    /// Range query resolution in seconds; `None` or `0` means "use the default".
    #[serde(deserialize_with = "lenient_secs")]
    pub step: Option<u64>,
    pub hide: bool,
    /// Evaluate once at the end of the range instead of over it.
    pub instant: bool,
    pub ref_id: String,
}

impl Target {
    pub fn step(&self) -> Option<Duration> {
        self.step.filter(|s| *s > 0).map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub id: PanelId,
    pub kind: PanelType,
    pub title: String,
    pub grid_pos: GridPos,
    pub field_config: FieldConfig,
    pub targets: Vec<Target>,
}

impl Panel {
    /// Targets that take part in a fetch (hidden ones are skipped).
    pub fn visible_targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(|t| !t.hide)
    }
}

/// A decoded, normalized dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub title: String,
    /// Raw refresh string; `None` when the document leaves it unset.
    pub refresh: Option<String>,
    /// Panels in source order, collapsed rows flattened.
    pub panels: Vec<Panel>,
    /// `templating.list[].current.value` defaults, keyed by variable name.
    pub template_defaults: BTreeMap<String, String>,
}

impl Dashboard {
    // ── Loading ──────────────────────────────────────────────────────

    /// Decode and normalize a dashboard document.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let raw: RawDashboard = serde_json::from_str(json)?;
        Ok(raw.into_dashboard())
    }

    /// Read and decode a dashboard file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dashboard = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            panels = dashboard.panels.len(),
            "dashboard loaded"
        );
        Ok(dashboard)
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Reject documents that cannot be laid out or fetched.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen = HashSet::with_capacity(self.panels.len());
        for panel in &self.panels {
            if !seen.insert(panel.id) {
                return Err(CoreError::config(format!(
                    "duplicate panel id {} (\"{}\")",
                    panel.id, panel.title
                )));
            }
            if panel.kind != PanelType::Row && panel.grid_pos.w == 0 {
                return Err(CoreError::config(format!(
                    "panel {} (\"{}\") has zero width",
                    panel.id, panel.title
                )));
            }
            if panel.kind.is_data() && panel.targets.is_empty() {
                return Err(CoreError::NoTargets { panel_id: panel.id });
            }
        }
        if let Some(refresh) = &self.refresh {
            parse_refresh(refresh)?;
        }
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == id)
    }

    /// Panels that issue queries.
    pub fn data_panels(&self) -> impl Iterator<Item = &Panel> {
        self.panels.iter().filter(|p| p.kind.is_data())
    }

    /// The refresh interval, or `default` when the document has none.
    pub fn refresh_interval(&self, default: Duration) -> Result<Duration, CoreError> {
        match &self.refresh {
            Some(s) => parse_refresh(s),
            None => Ok(default),
        }
    }
}

const MAX_REFRESH: Duration = Duration::from_secs(365 * 86_400);

/// Parse a Grafana refresh string (`5s`, `1m`, `1h`, `1d`).
pub fn parse_refresh(s: &str) -> Result<Duration, CoreError> {
    let invalid = |reason: String| CoreError::InvalidRefresh {
        value: s.to_owned(),
        reason,
    };
    let d = humantime::parse_duration(s.trim()).map_err(|e| invalid(e.to_string()))?;
    if d.is_zero() {
        return Err(invalid("interval must be positive".into()));
    }
    if d > MAX_REFRESH {
        return Err(invalid("interval must be at most 365 days".into()));
    }
    Ok(d)
}

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawDashboard {
    #[serde(default)]
    title: String,
    #[serde(default, deserialize_with = "refresh_field")]
    refresh: Option<String>,
    #[serde(default)]
    panels: Vec<RawPanel>,
    #[serde(default)]
    templating: RawTemplating,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPanel {
    id: PanelId,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    grid_pos: GridPos,
    #[serde(default)]
    field_config: RawFieldConfig,
    #[serde(default)]
    targets: Vec<Target>,
    /// Children of a collapsed row.
    #[serde(default)]
    panels: Vec<RawPanel>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFieldConfig {
    #[serde(default)]
    defaults: FieldConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RawTemplating {
    #[serde(default)]
    list: Vec<RawVariable>,
}

#[derive(Debug, Deserialize)]
struct RawVariable {
    name: String,
    #[serde(default)]
    current: Option<RawCurrent>,
}

#[derive(Debug, Deserialize)]
struct RawCurrent {
    #[serde(default)]
    value: Value,
}

impl RawDashboard {
    fn into_dashboard(self) -> Dashboard {
        let mut panels = Vec::with_capacity(self.panels.len());
        for raw in self.panels {
            flatten_into(raw, &mut panels);
        }

        let template_defaults = self
            .templating
            .list
            .into_iter()
            .filter_map(|var| {
                let value = var.current.and_then(|c| current_value(&c.value))?;
                Some((var.name, value))
            })
            .collect();

        Dashboard {
            title: self.title,
            refresh: self.refresh,
            panels,
            template_defaults,
        }
    }
}

/// Push `raw` and then, directly after it, any panels nested in a
/// collapsed row.
fn flatten_into(raw: RawPanel, out: &mut Vec<Panel>) {
    let RawPanel {
        id,
        kind,
        title,
        grid_pos,
        field_config,
        targets,
        panels: children,
    } = raw;
    out.push(Panel {
        id,
        kind: PanelType::from(kind.as_str()),
        title,
        grid_pos,
        field_config: field_config.defaults,
        targets,
    });
    for child in children {
        flatten_into(child, out);
    }
}

/// `current.value` is a string for single-value variables and an array for
/// multi-value ones; "All" selections carry no concrete value.
fn current_value(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.as_str(),
        Value::Array(items) => items.first()?.as_str()?,
        _ => return None,
    };
    match s {
        "" | "$__all" | "All" => None,
        other => Some(other.to_owned()),
    }
}

/// `refresh` is a duration string, or `false` / `""` when disabled.
fn refresh_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

/// Accept `60`, `"60"`, `"60s"` and `null` for a step in seconds.
fn lenient_secs<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid step {n}"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => match s.trim().parse::<u64>() {
            Ok(secs) => Ok(Some(secs)),
            Err(_) => humantime::parse_duration(s.trim())
                .map(|d| Some(d.as_secs()))
                .map_err(|e| D::Error::custom(format!("invalid step {s:?}: {e}"))),
        },
        other => Err(D::Error::custom(format!("invalid step {other}"))),
    }
}
