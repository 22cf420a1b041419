// ── Panel query results ──

use promviz_api::{Sample, Series};

/// Data for one target of a time-series panel.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Legend template of the target that produced these series.
    pub legend_format: String,
    pub series: Vec<Series>,
}

/// Normalized result of a panel fetch, tagged by panel kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelData {
    /// Instant vector for gauge, bar gauge and stat panels.
    Samples(Vec<Sample>),
    /// One entry per visible target of a time-series panel.
    Series(Vec<TimeSeries>),
}

impl PanelData {
    /// First sample of an instant result.
    pub fn first_sample(&self) -> Option<&Sample> {
        match self {
            Self::Samples(s) => s.first(),
            Self::Series(_) => None,
        }
    }
}
