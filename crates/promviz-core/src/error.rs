// ── Core error types ──
//
// Configuration errors are fatal at startup; everything produced while
// fetching is recoverable and scoped to one panel. The
// `From<promviz_api::Error>` impl keeps HTTP details out of the renderers.

use thiserror::Error;

use crate::model::PanelId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors (fatal at startup) ──────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid dashboard JSON: {0}")]
    DashboardParse(#[from] serde_json::Error),

    #[error("Cannot read dashboard file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid refresh interval {value:?}: {reason}")]
    InvalidRefresh { value: String, reason: String },

    #[error("Panel {panel_id} has no query targets")]
    NoTargets { panel_id: PanelId },

    // ── Query errors (recoverable, per panel) ────────────────────────
    #[error("Expected a {expected} result, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("Query failed: {message}")]
    Query {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
        transient: bool,
    },

    #[error("All {count} targets failed; first error: {first}")]
    AllTargetsFailed { count: usize, first: String },
}

impl CoreError {
    /// Returns `true` for errors that must stop the program at startup.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::DashboardParse(_)
                | Self::Io { .. }
                | Self::InvalidRefresh { .. }
                | Self::NoTargets { .. }
        )
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<promviz_api::Error> for CoreError {
    fn from(err: promviz_api::Error) -> Self {
        let status = err.status();
        let transient = err.is_transient();
        let message = match err {
            promviz_api::Error::Api {
                error_type,
                message,
                ..
            } => format!("{error_type}: {message}"),
            promviz_api::Error::Transport(ref e) if e.is_timeout() => "request timed out".into(),
            promviz_api::Error::Transport(ref e) if e.is_connect() => {
                format!("backend unreachable: {e}")
            }
            other => other.to_string(),
        };
        CoreError::Query {
            message,
            status,
            transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_become_query_errors() {
        let err = CoreError::from(promviz_api::Error::Api {
            status: 422,
            error_type: "execution".into(),
            message: "many-to-many matching not allowed".into(),
        });
        match err {
            CoreError::Query {
                message,
                status,
                transient,
            } => {
                assert_eq!(status, Some(422));
                assert!(!transient);
                assert!(message.starts_with("execution: "));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn config_classification() {
        assert!(CoreError::NoTargets { panel_id: 3 }.is_config());
        assert!(
            !CoreError::TypeMismatch {
                expected: "vector",
                got: "matrix"
            }
            .is_config()
        );
    }
}
