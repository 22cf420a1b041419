//! `promviz`: live terminal dashboards for Prometheus metrics.
//!
//! Reads a Grafana dashboard JSON document, lays its panels out on the
//! terminal and re-queries the Prometheus HTTP API on the dashboard's
//! refresh interval.
//!
//! Logs go to a file (default `/tmp/promviz.log`) so they never corrupt the
//! terminal UI. Everything that can fail before the UI starts (arguments,
//! config, dashboard decoding and validation, backend URL) is reported on
//! stderr with a non-zero exit status.

mod action;
mod app;
mod event;
mod panels;
mod state;
mod theme;
mod tui;
mod widgets;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use color_eyre::eyre::{Result, WrapErr, bail};
use promviz_api::PrometheusClient;
use promviz_core::variables::parse_assignment;
use promviz_core::{Dashboard, LayoutMode, Querier};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{App, AppOptions};

/// Render a Grafana dashboard against a Prometheus server in the terminal.
#[derive(Parser, Debug)]
#[command(name = "promviz", version, about)]
struct Cli {
    /// Prometheus base URL (e.g., http://localhost:9090)
    backend_url: String,

    /// Grafana dashboard JSON file
    dashboard_file: PathBuf,

    /// Set a template variable, overriding dashboard and config values (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    vars: Vec<(String, String)>,

    /// Layout mode: proportional or bucketed
    #[arg(long)]
    layout: Option<LayoutMode>,

    /// Time window of range queries (e.g., 1h, 24h)
    #[arg(long, value_parser = humantime::parse_duration)]
    range: Option<Duration>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "/tmp/promviz.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-only tracing. Hold the returned guard until exit so buffered
/// lines are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "promviz={level},promviz_core={level},promviz_api={level},promviz_config={level}"
        ))
    });

    let dir = cli.log_file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_name = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("promviz.log"));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

/// Load and check everything the UI needs, in the order a user would
/// want errors reported.
fn prepare(cli: &Cli) -> Result<App<PrometheusClient>> {
    let config = promviz_config::load_config(cli.config.as_deref()).wrap_err("loading config")?;

    let dashboard = Dashboard::load(&cli.dashboard_file)
        .wrap_err_with(|| format!("loading dashboard {}", cli.dashboard_file.display()))?;
    dashboard
        .validate()
        .wrap_err_with(|| format!("invalid dashboard {}", cli.dashboard_file.display()))?;

    let refresh = dashboard.refresh_interval(config.default_refresh()?)?;
    let range = match cli.range {
        Some(r) if r.is_zero() => bail!("--range must be positive"),
        Some(r) => r,
        None => config.range()?,
    };
    let layout = cli.layout.unwrap_or(config.dashboard.layout);

    let client = PrometheusClient::new(&cli.backend_url, &config.transport())
        .wrap_err_with(|| format!("invalid backend URL {}", cli.backend_url))?;
    let querier = Querier::new(client).with_default_step(config.default_step());
    let variables = config.resolve_variables(&dashboard.template_defaults, &cli.vars);

    info!(
        backend = %cli.backend_url,
        dashboard = %dashboard.title,
        panels = dashboard.panels.len(),
        refresh = %humantime::format_duration(refresh),
        range = %humantime::format_duration(range),
        %layout,
        variables = variables.len(),
        "starting promviz"
    );

    Ok(App::new(
        Arc::new(dashboard),
        querier,
        variables,
        AppOptions {
            refresh,
            range,
            layout,
        },
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let mut app = prepare(&cli)?;
    app.run().await
}
