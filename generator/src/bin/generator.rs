//! Synthetic email telemetry generator - CLI binary.
//!
//! Samples weighted email events in time-of-day shaped batches and reports
//! them as Prometheus metrics, tracing spans and structured logs.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use broadside_common::{
    init_tracing, service_instance, LogFormat, MetricsContext, MetricsServerConfig, OtlpConfig,
    ServiceInfo,
};
use generator::{EmailStatus, EventSampler, GeneratorConfig, TelemetrySink};

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum LogFormatArg {
    Auto,
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(v: LogFormatArg) -> Self {
        match v {
            LogFormatArg::Auto => LogFormat::Auto,
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Broadside email generator - Synthetic email telemetry for dashboards
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    // ---
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address for `GET /metrics` and `GET /health`.
    ///
    /// Overrides `service.metrics_bind` from the configuration
    /// (default 0.0.0.0:8088).
    #[arg(long)]
    metrics_bind: Option<String>,

    /// OTLP/gRPC collector for span export, e.g. http://localhost:4317.
    ///
    /// Overrides `service.otlp_endpoint`; spans stay local when neither is set.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    /// Log output: pretty on a terminal, JSON otherwise
    #[arg(long, value_enum, default_value = "auto")]
    log_format: LogFormatArg,

    /// Seed the sampler for a reproducible event sequence
    #[arg(long)]
    seed: Option<u64>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

/// Capture version number from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(bind) = args.metrics_bind {
        config.service.metrics_bind = bind;
    }
    if let Some(endpoint) = args.otlp_endpoint.filter(|e| !e.is_empty()) {
        config.service.otlp_endpoint = Some(endpoint);
    }

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let service = ServiceInfo::new(config.service.name.clone(), VERSION, service_instance());
    let otlp = config
        .service
        .otlp_endpoint
        .clone()
        .map(|endpoint| OtlpConfig {
            endpoint,
            service: service.clone(),
        });
    let tracing_guard = init_tracing(args.log_format.into(), otlp.as_ref())?;

    info!("Starting {} v{VERSION}", service.name);
    info!("Instance: {}", service.instance);
    info!("Metrics bind: {}", config.service.metrics_bind);
    match &otlp {
        Some(otlp) => info!("OTLP span export: {}", otlp.endpoint),
        None => info!("OTLP span export: disabled"),
    }
    match &args.config {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    let sampler = match args.seed {
        Some(seed) => {
            info!("Sampler seed: {seed}");
            EventSampler::with_seed(&config, seed)
        }
        None => EventSampler::new(&config),
    }
    .context("invalid generator configuration")?;

    for (provider, weight) in sampler.providers() {
        info!(
            provider = %provider.name,
            weight,
            base_volume = provider.base_volume,
            processing_jitter_ms = provider.processing_jitter_ms,
            rate_sum = provider.rates.total(),
            "Provider configured"
        );
    }

    let metrics = MetricsContext::new(service)?;
    let metrics_bind: SocketAddr = config
        .service
        .metrics_bind
        .parse()
        .context("invalid metrics bind")?;
    let totals = sampler.totals();
    let server = metrics
        .spawn_metrics_server(MetricsServerConfig::new(metrics_bind).with_health(totals.clone()))
        .context("failed to start metrics server")?;
    info!("Serving /metrics and /health on {}", server.local_addr());

    let handle = sampler.spawn(Arc::new(TelemetrySink::new(metrics)));

    shutdown_signal().await;
    info!("Shutdown requested");

    let batches = handle.shutdown().await?;
    server.abort();

    info!(
        batches,
        total_sent = totals.get(EmailStatus::Sent),
        total_in_transit = totals.get(EmailStatus::InTransit),
        total_bounced = totals.get(EmailStatus::Bounced),
        total_rejected = totals.get(EmailStatus::Rejected),
        "Generator stopped"
    );

    if tracing_guard.otlp_enabled() {
        info!("Flushing OTLP spans");
    }
    tokio::task::spawn_blocking(move || tracing_guard.shutdown())
        .await
        .context("OTLP flush task failed")?;

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    // ---
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
