// Async HTTP client for the Prometheus query API.
//
// Base path: {base}/api/v1/
// Endpoints: query (instant), query_range (range)

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::models::{Envelope, QueryResult};
use crate::transport::TransportConfig;

/// Async client for the Prometheus HTTP query API.
///
/// Cheap to clone: the inner `reqwest::Client` is reference-counted, so one
/// instance can be shared across every concurrently running panel fetch.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PrometheusClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL (e.g. `http://prometheus:9090`) and transport config.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(base_url, http)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base path ends with `/` so relative joins keep any
    /// reverse-proxy prefix (`http://host/prometheus/` + `api/v1/query`).
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        url.set_query(None);
        Ok(url)
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Public API ───────────────────────────────────────────────────

    /// Evaluate `expr` at a single instant.
    pub async fn instant_query(
        &self,
        expr: &str,
        at: DateTime<Utc>,
    ) -> Result<QueryResult, Error> {
        let params = [("query", expr.to_owned()), ("time", fmt_timestamp(at))];
        self.get("api/v1/query", &params).await
    }

    /// Evaluate `expr` over `[start, end]` at a fixed resolution step.
    pub async fn range_query(
        &self,
        expr: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<QueryResult, Error> {
        let params = [
            ("query", expr.to_owned()),
            ("start", fmt_timestamp(start)),
            ("end", fmt_timestamp(end)),
            ("step", step.as_secs_f64().to_string()),
        ];
        self.get("api/v1/query_range", &params).await
    }

    // ── HTTP ─────────────────────────────────────────────────────────

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<QueryResult, Error> {
        let url = self.base_url.join(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    /// Decode the response envelope. The API reports errors both through
    /// the HTTP status (400, 422, 503) and through `status: "error"`, so
    /// the body is always inspected before the status code.
    async fn handle_response(&self, resp: reqwest::Response) -> Result<QueryResult, Error> {
        let status = resp.status();
        let body = resp.text().await?;

        let envelope: Envelope = match serde_json::from_str(&body) {
            Ok(env) => env,
            Err(e) if status.is_success() => {
                let preview: String = body.chars().take(200).collect();
                return Err(Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                });
            }
            Err(_) => {
                return Err(Error::Api {
                    status: status.as_u16(),
                    error_type: "http".into(),
                    message: if body.is_empty() {
                        status.to_string()
                    } else {
                        body
                    },
                });
            }
        };

        if envelope.status != "success" || !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                error_type: envelope.error_type.unwrap_or_else(|| "unknown".into()),
                message: envelope.error.unwrap_or_else(|| status.to_string()),
            });
        }

        for warning in &envelope.warnings {
            warn!(%warning, "query returned a warning");
        }

        let data = envelope.data.ok_or_else(|| Error::Deserialization {
            message: "success envelope without data".into(),
            body: String::new(),
        })?;
        QueryResult::try_from(data)
    }
}

/// Unix seconds with millisecond precision, the format the API accepts.
fn fmt_timestamp(ts: DateTime<Utc>) -> String {
    format!("{}.{:03}", ts.timestamp(), ts.timestamp_subsec_millis())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_path_prefix() {
        let client =
            PrometheusClient::with_client("http://host:9090/prom", reqwest::Client::new()).unwrap();
        assert_eq!(client.base_url().as_str(), "http://host:9090/prom/");
        assert_eq!(
            client.base_url().join("api/v1/query").unwrap().as_str(),
            "http://host:9090/prom/api/v1/query"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = PrometheusClient::with_client("not a url", reqwest::Client::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn timestamps_use_unix_seconds_with_millis() {
        let ts = DateTime::from_timestamp_millis(1_700_000_000_250).unwrap();
        assert_eq!(fmt_timestamp(ts), "1700000000.250");
    }
}
