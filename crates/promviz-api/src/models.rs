// Query API wire types and their typed counterparts.
//
// Every response is wrapped in `{ status, data, errorType, error, warnings }`.
// `data` is adjacently tagged by `resultType`; the raw shapes are converted
// once into `QueryResult` so callers never look at JSON again.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Label set of a single time series (`__name__` included when present).
pub type Labels = BTreeMap<String, String>;

/// One `(timestamp, value)` pair. Timestamps are Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub timestamp: f64,
    pub value: f64,
}

/// An instant-vector element: one value per active series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub labels: Labels,
    pub point: Point,
}

/// A range-vector element: ordered points for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub labels: Labels,
    pub points: Vec<Point>,
}

/// Typed query result, decided once at the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryResult {
    Vector(Vec<Sample>),
    Matrix(Vec<Series>),
    Scalar(Point),
    String { timestamp: f64, value: String },
}

impl QueryResult {
    /// The `resultType` name of this result, as reported by the API.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Vector(_) => "vector",
            Self::Matrix(_) => "matrix",
            Self::Scalar(_) => "scalar",
            Self::String { .. } => "string",
        }
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector(v) => write!(f, "vector({} samples)", v.len()),
            Self::Matrix(m) => write!(f, "matrix({} series)", m.len()),
            Self::Scalar(p) => write!(f, "scalar({})", p.value),
            Self::String { value, .. } => write!(f, "string({value:?})"),
        }
    }
}

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub status: String,
    #[serde(default)]
    pub data: Option<RawData>,
    #[serde(default, rename = "errorType")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub(crate) enum RawData {
    Vector(Vec<RawSample>),
    Matrix(Vec<RawSeries>),
    Scalar(RawPoint),
    String(RawPoint),
}

/// `[<unix seconds>, "<value>"]`
type RawPoint = (f64, String);

#[derive(Debug, Deserialize)]
pub(crate) struct RawSample {
    #[serde(default)]
    metric: Labels,
    value: RawPoint,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSeries {
    #[serde(default)]
    metric: Labels,
    #[serde(default)]
    values: Vec<RawPoint>,
}

/// Parse a sample value string. The API encodes floats as strings and uses
/// `NaN`, `+Inf` and `-Inf` for the special values.
pub fn parse_sample_value(raw: &str) -> Result<f64, Error> {
    match raw {
        "NaN" => Ok(f64::NAN),
        "+Inf" | "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        other => other
            .parse::<f64>()
            .map_err(|_| Error::InvalidSample(other.to_owned())),
    }
}

fn point((timestamp, raw): RawPoint) -> Result<Point, Error> {
    Ok(Point {
        timestamp,
        value: parse_sample_value(&raw)?,
    })
}

impl TryFrom<RawData> for QueryResult {
    type Error = Error;

    fn try_from(raw: RawData) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawData::Vector(samples) => Self::Vector(
                samples
                    .into_iter()
                    .map(|s| {
                        Ok(Sample {
                            labels: s.metric,
                            point: point(s.value)?,
                        })
                    })
                    .collect::<Result<_, Error>>()?,
            ),
            RawData::Matrix(series) => Self::Matrix(
                series
                    .into_iter()
                    .map(|s| {
                        Ok(Series {
                            labels: s.metric,
                            points: s.values.into_iter().map(point).collect::<Result<_, _>>()?,
                        })
                    })
                    .collect::<Result<_, Error>>()?,
            ),
            RawData::Scalar(p) => Self::Scalar(point(p)?),
            RawData::String((timestamp, value)) => Self::String { timestamp, value },
        })
    }
}
