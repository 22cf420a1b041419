// ── Result cache ──
//
// Latest known result per panel. Owned by the refresh loop, read by the
// renderers. A failed fetch records an error but keeps the previous data,
// and a late answer from an older refresh generation is dropped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{PanelData, PanelId};
use crate::querier::FetchOutcome;

/// Cached state of one panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheEntry {
    /// Last successfully fetched data.
    pub data: Option<PanelData>,
    /// Error of the most recent fetch, cleared by the next success.
    pub error: Option<String>,
    /// Target failures of the most recent, otherwise successful, fetch.
    pub warnings: Vec<String>,
    /// Generation of the last applied outcome.
    pub generation: u64,
    /// When data was last replaced.
    pub updated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Error marker to show on the panel, if any.
    pub fn marker(&self) -> Option<String> {
        if let Some(err) = &self.error {
            return Some(err.clone());
        }
        match self.warnings.as_slice() {
            [] => None,
            [one] => Some(one.clone()),
            [first, rest @ ..] => Some(format!("{first} (+{} more)", rest.len())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    entries: HashMap<PanelId, CacheEntry>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a fetch outcome issued by refresh `generation`.
    ///
    /// Returns `false` when the outcome is older than what is already
    /// cached and was discarded.
    pub fn apply(&mut self, outcome: FetchOutcome, generation: u64) -> bool {
        let entry = self.entries.entry(outcome.panel_id).or_default();
        if generation < entry.generation {
            debug!(
                panel = outcome.panel_id,
                generation,
                current = entry.generation,
                "discarding stale fetch result"
            );
            return false;
        }
        entry.generation = generation;

        match outcome.result {
            Ok(data) => {
                entry.data = Some(data);
                entry.error = None;
                entry.warnings = outcome
                    .target_errors
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                entry.updated_at = Some(outcome.fetched_at);
            }
            Err(err) => {
                entry.error = Some(err.to_string());
                entry.warnings.clear();
            }
        }
        true
    }

    pub fn get(&self, id: PanelId) -> Option<&CacheEntry> {
        self.entries.get(&id)
    }

    pub fn data(&self, id: PanelId) -> Option<&PanelData> {
        self.get(id).and_then(|e| e.data.as_ref())
    }

    /// Most recent successful update across all panels.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.entries.values().filter_map(|e| e.updated_at).max()
    }

    /// Number of panels currently showing an error.
    pub fn error_count(&self) -> usize {
        self.entries.values().filter(|e| e.error.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use promviz_api::{Labels, Point, Sample};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::CoreError;
    use crate::querier::TargetError;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn ok(panel_id: PanelId, value: f64, secs: i64) -> FetchOutcome {
        FetchOutcome {
            panel_id,
            result: Ok(PanelData::Samples(vec![Sample {
                labels: Labels::new(),
                point: Point {
                    timestamp: 0.0,
                    value,
                },
            }])),
            target_errors: Vec::new(),
            fetched_at: at(secs),
        }
    }

    fn failed(panel_id: PanelId, message: &str) -> FetchOutcome {
        FetchOutcome {
            panel_id,
            result: Err(CoreError::Query {
                message: message.into(),
                status: None,
                transient: true,
            }),
            target_errors: Vec::new(),
            fetched_at: at(0),
        }
    }

    fn value(cache: &ResultCache, id: PanelId) -> f64 {
        cache.data(id).unwrap().first_sample().unwrap().point.value
    }

    #[test]
    fn failure_keeps_last_known_good_for_that_panel_only() {
        let mut cache = ResultCache::new();
        cache.apply(ok(1, 10.0, 100), 1);
        cache.apply(ok(2, 20.0, 100), 1);

        cache.apply(failed(1, "connection refused"), 2);
        cache.apply(ok(2, 21.0, 200), 2);

        assert_eq!(value(&cache, 1), 10.0);
        assert!(cache.get(1).unwrap().error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(cache.get(1).unwrap().updated_at, Some(at(100)));

        assert_eq!(value(&cache, 2), 21.0);
        assert_eq!(cache.get(2).unwrap().error, None);
        assert_eq!(cache.error_count(), 1);
        assert_eq!(cache.last_update(), Some(at(200)));
    }

    #[test]
    fn success_clears_previous_error() {
        let mut cache = ResultCache::new();
        cache.apply(failed(1, "down"), 1);
        assert_eq!(cache.data(1), None);
        assert!(cache.get(1).unwrap().marker().is_some());

        cache.apply(ok(1, 5.0, 10), 2);
        assert_eq!(cache.get(1).unwrap().marker(), None);
        assert_eq!(value(&cache, 1), 5.0);
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut cache = ResultCache::new();
        assert!(cache.apply(ok(1, 2.0, 20), 2));
        assert!(!cache.apply(ok(1, 1.0, 10), 1));
        assert!(!cache.apply(failed(1, "late"), 1));

        let entry = cache.get(1).unwrap();
        assert_eq!(entry.generation, 2);
        assert_eq!(entry.error, None);
        assert_eq!(value(&cache, 1), 2.0);
    }

    #[test]
    fn partial_failures_become_warnings() {
        let mut cache = ResultCache::new();
        let mut outcome = ok(3, 1.0, 10);
        outcome.target_errors = vec![
            TargetError {
                target: "B".into(),
                error: CoreError::TypeMismatch {
                    expected: "matrix",
                    got: "vector",
                },
            },
            TargetError {
                target: "C".into(),
                error: CoreError::config("x"),
            },
        ];
        cache.apply(outcome, 1);

        let entry = cache.get(3).unwrap();
        assert_eq!(entry.error, None);
        assert_eq!(entry.warnings.len(), 2);
        assert_eq!(
            entry.marker().unwrap(),
            "B: Expected a matrix result, got vector (+1 more)"
        );
    }
}
