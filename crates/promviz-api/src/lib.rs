// promviz-api: Async Rust client for the Prometheus HTTP query API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::PrometheusClient;
pub use error::Error;
pub use models::{Labels, Point, QueryResult, Sample, Series};
pub use transport::{TlsMode, TransportConfig};
