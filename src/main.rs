use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cpapwatch::config::StoreKind;
use cpapwatch::{MetricsProjector, Poller, Settings};
use cpapwatch_sdk::prometheus::{PrometheusConfig, PrometheusExporter};
use cpapwatch_sdk::Registry;

#[derive(Parser, Debug)]
#[command(name = "cpapwatch")]
#[command(about = "Polls CPAP therapy data and exports it as Prometheus metrics")]
struct Args {
    /// Path to a config file (default: ./cpapwatch.{toml,yaml,json} if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run one poll cycle for every account and exit
    #[arg(long)]
    once: bool,

    /// Keep history in memory only, ignoring the configured store
    #[arg(long)]
    ephemeral: bool,

    /// Log filter, e.g. "debug" or "cpapwatch=trace" (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let mut settings =
        Settings::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.ephemeral {
        settings.store.kind = StoreKind::Memory;
    }

    let store = settings.store.open().with_context(|| {
        format!("Failed to open store at {}", settings.store.path.display())
    })?;

    let registry = Arc::new(Registry::with_namespace(settings.metrics.namespace.clone()));
    let projector =
        MetricsProjector::new(registry.clone()).context("Failed to register gauges")?;

    let mut builder = Poller::builder()
        .interval(settings.polling_interval())
        .history_months(settings.history_months())
        .include_zero_scores(settings.include_zero_scores);
    for account in &settings.accounts {
        let client = account
            .client()
            .with_context(|| format!("Failed to build client for {}", account.username))?;
        builder = builder.account(client);
    }
    let (mut poller, shutdown) = builder.build(store, projector);

    if args.once {
        let failed = poller.run_once().await;
        if failed > 0 {
            anyhow::bail!("{} of {} account cycles failed", failed, poller.accounts());
        }
        return Ok(());
    }

    let server = if settings.metrics.enabled {
        let config = PrometheusConfig::builder()
            .listen_addr(&settings.metrics.listen_addr)
            .metrics_path(&settings.metrics.path)
            .build();
        let exporter = PrometheusExporter::new(config, registry);
        Some(
            exporter
                .start_server()
                .await
                .context("Failed to start metrics exporter")?,
        )
    } else {
        warn!("Metrics exporter disabled");
        None
    };

    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("Shutdown requested");
        shutdown.stop();
    });

    poller.run().await;

    if let Some(server) = server {
        server.abort();
    }
    info!("cpapwatch stopped");
    Ok(())
}

/// Initialize tracing with an env filter; `--log-level` wins over RUST_LOG.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
