//! WMO bulletin collector.
//!
//! Polls a directory for GTS bulletin files and forwards the decoded
//! reports to the observation service, with on-disk retry of reports the
//! service could not take.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use collector::{build_loop, CollectorConfig, CollectorMetrics, MultiEndpoint};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "collector")]
#[command(about = "Collects WMO bulletins from a drop directory and forwards the reports")]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "COLLECTOR_CONFIG", default_value = "config/collector.yaml")]
    config: PathBuf,

    /// Write decoded reports to the work directory instead of sending them
    #[arg(long)]
    test: bool,

    /// Keep snapshot copies after they are collected
    #[arg(long)]
    debug: bool,

    /// Run one collect and one resend cycle, then exit
    #[arg(long)]
    once: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Port for the Prometheus metrics listener
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!(config = %args.config.display(), "Starting WMO bulletin collector");

    let mut config = CollectorConfig::load(&args.config)?;
    config.debug |= args.debug;
    config.validate(args.test).context("Invalid configuration")?;
    config.prepare_directories().await?;

    if let Some(port) = args.metrics_port {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(port, "Prometheus metrics exporter listening");
    }

    let endpoint = Arc::new(MultiEndpoint::http(
        &config.endpoints,
        config.request_timeout(),
    )?);
    let metrics = Arc::new(CollectorMetrics::new());
    let mut collection = build_loop(&config, args.test, endpoint, metrics.clone()).await?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    if args.once {
        info!("Running single collection cycle");
        let summary = collection.run_once(&cancel).await;
        info!(
            files = summary.files,
            reports = summary.reports,
            decode_warnings = summary.decode_warnings,
            "Collection cycle complete"
        );
    } else {
        collection.run_forever(cancel).await?;
    }

    let stats = metrics.snapshot();
    info!(
        files_collected = stats.files_collected,
        reports_accepted = stats.reports_accepted,
        reports_rejected = stats.reports_rejected,
        reports_queued = stats.reports_queued,
        bulletin_errors = stats.bulletin_errors,
        "Collector stopped"
    );

    Ok(())
}

/// Cancel `token` on SIGTERM or Ctrl+C.
async fn shutdown_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.ok();

    info!("Received shutdown signal");
    token.cancel();
}
