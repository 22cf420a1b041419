// ── Query orchestration ──
//
// Turns a panel definition into backend queries and normalizes the answer
// into `PanelData`. Instant panels (gauge, stat, bar gauge) query their
// first target at the end of the time range; time-series panels run a range
// query per visible target, concurrently, and tolerate partial failure.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use promviz_api::{PrometheusClient, QueryResult, Series};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Panel, PanelData, PanelId, PanelType, Target, TimeSeries};
use crate::variables::Variables;

/// Default look-back window of time-series panels.
pub const DEFAULT_RANGE: Duration = Duration::from_secs(24 * 60 * 60);
/// Default range query resolution.
pub const DEFAULT_STEP: Duration = Duration::from_secs(60);

// ── Backend seam ─────────────────────────────────────────────────────

/// The subset of a metrics backend the orchestrator needs.
pub trait MetricsBackend: Send + Sync {
    fn instant_query(
        &self,
        expr: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<QueryResult, CoreError>> + Send;

    fn range_query(
        &self,
        expr: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> impl Future<Output = Result<QueryResult, CoreError>> + Send;
}

impl MetricsBackend for PrometheusClient {
    async fn instant_query(&self, expr: &str, at: DateTime<Utc>) -> Result<QueryResult, CoreError> {
        Ok(PrometheusClient::instant_query(self, expr, at).await?)
    }

    async fn range_query(
        &self,
        expr: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<QueryResult, CoreError> {
        Ok(PrometheusClient::range_query(self, expr, start, end, step).await?)
    }
}

// ── Time range ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// `[now - range, now]`.
    pub fn last(range: Duration, now: DateTime<Utc>) -> Self {
        let start = TimeDelta::from_std(range)
            .ok()
            .and_then(|delta| now.checked_sub_signed(delta))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }
}

// ── Outcome ──────────────────────────────────────────────────────────

/// A failed target of an otherwise successful time-series fetch.
#[derive(Debug)]
pub struct TargetError {
    /// `refId` of the target, or its expression when the id is empty.
    pub target: String,
    pub error: CoreError,
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.error)
    }
}

/// Result of fetching one panel.
#[derive(Debug)]
pub struct FetchOutcome {
    pub panel_id: PanelId,
    pub result: Result<PanelData, CoreError>,
    /// Per-target failures that did not fail the whole panel.
    pub target_errors: Vec<TargetError>,
    pub fetched_at: DateTime<Utc>,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

// ── Querier ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Querier<B> {
    backend: B,
    default_step: Duration,
}

impl<B: MetricsBackend> Querier<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            default_step: DEFAULT_STEP,
        }
    }

    /// Step used for targets that do not set one.
    #[must_use]
    pub fn with_default_step(mut self, step: Duration) -> Self {
        if !step.is_zero() {
            self.default_step = step;
        }
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetch everything `panel` needs. Never panics and never returns early
    /// on a single target failure.
    pub async fn fetch(
        &self,
        panel: &Panel,
        variables: &Variables,
        range: TimeRange,
    ) -> FetchOutcome {
        let (result, target_errors) = match &panel.kind {
            kind if kind.is_instant() => {
                (self.fetch_instant(panel, variables, range.end).await, Vec::new())
            }
            PanelType::TimeSeries => self.fetch_range(panel, variables, range).await,
            _ => {
                debug!(panel = panel.id, kind = %panel.kind, "panel issues no query");
                (Ok(PanelData::Samples(Vec::new())), Vec::new())
            }
        };

        if let Err(e) = &result {
            warn!(panel = panel.id, title = %panel.title, error = %e, "panel fetch failed");
        }

        FetchOutcome {
            panel_id: panel.id,
            result,
            target_errors,
            fetched_at: range.end,
        }
    }

    async fn fetch_instant(
        &self,
        panel: &Panel,
        variables: &Variables,
        at: DateTime<Utc>,
    ) -> Result<PanelData, CoreError> {
        let target = panel
            .targets
            .first()
            .ok_or(CoreError::NoTargets { panel_id: panel.id })?;
        let expr = variables.substitute(&target.expr);
        debug!(panel = panel.id, %expr, "instant query");

        match self.backend.instant_query(&expr, at).await? {
            QueryResult::Vector(samples) => Ok(PanelData::Samples(samples)),
            other => Err(CoreError::TypeMismatch {
                expected: "vector",
                got: other.kind(),
            }),
        }
    }

    async fn fetch_range(
        &self,
        panel: &Panel,
        variables: &Variables,
        range: TimeRange,
    ) -> (Result<PanelData, CoreError>, Vec<TargetError>) {
        let targets: Vec<&Target> = panel.visible_targets().collect();
        let queries = targets
            .iter()
            .map(|target| self.query_target(panel.id, target, variables, range));
        let results = join_all(queries).await;

        let mut series = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for (target, result) in targets.into_iter().zip(results) {
            match result {
                Ok(ts) => series.push(ts),
                Err(error) => {
                    let name = target_name(target);
                    warn!(panel = panel.id, target = %name, %error, "target query failed");
                    errors.push(TargetError {
                        target: name,
                        error,
                    });
                }
            }
        }

        if series.is_empty() && !errors.is_empty() {
            let count = errors.len();
            let first = errors[0].to_string();
            return (Err(CoreError::AllTargetsFailed { count, first }), errors);
        }
        (Ok(PanelData::Series(series)), errors)
    }

    async fn query_target(
        &self,
        panel_id: PanelId,
        target: &Target,
        variables: &Variables,
        range: TimeRange,
    ) -> Result<TimeSeries, CoreError> {
        let expr = variables.substitute(&target.expr);
        let result = if target.instant {
            debug!(panel = panel_id, %expr, "instant query");
            self.backend.instant_query(&expr, range.end).await?
        } else {
            let step = target.step().unwrap_or(self.default_step);
            debug!(panel = panel_id, %expr, step = step.as_secs(), "range query");
            self.backend
                .range_query(&expr, range.start, range.end, step)
                .await?
        };

        let series = match result {
            QueryResult::Matrix(series) => series,
            // An instant target plots each sample as a single point.
            QueryResult::Vector(samples) if target.instant => samples
                .into_iter()
                .map(|s| Series {
                    labels: s.labels,
                    points: vec![s.point],
                })
                .collect(),
            other => {
                return Err(CoreError::TypeMismatch {
                    expected: "matrix",
                    got: other.kind(),
                });
            }
        };
        Ok(TimeSeries {
            legend_format: target.legend_format.clone(),
            series,
        })
    }
}

fn target_name(target: &Target) -> String {
    if target.ref_id.is_empty() {
        target.expr.clone()
    } else {
        target.ref_id.clone()
    }
}
