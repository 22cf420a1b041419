use thiserror::Error;

/// Top-level error type for the `promviz-api` crate.
///
/// Covers transport failures, API-level error envelopes and payloads that
/// could not be decoded. `promviz-core` maps these into per-panel query
/// errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Invalid bearer token header value.
    #[error("Invalid bearer token: {0}")]
    InvalidToken(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Error envelope returned by the query API
    /// (`{"status":"error","errorType":...,"error":...}`).
    #[error("Query API error (HTTP {status}, {error_type}): {message}")]
    Api {
        status: u16,
        error_type: String,
        message: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A sample value string that is not a float.
    #[error("Invalid sample value {0:?}")]
    InvalidSample(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the
    /// next refresh cycle without user intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 503 || *status == 429,
            _ => false,
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
