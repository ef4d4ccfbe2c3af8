//! Prometheus metrics (Rust `prometheus` crate).
//!
//! One `MetricsContext` is intended per process. Each binary owns its registry
//! and controls which metrics it reports.

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::health::{health_body, HealthSource, ServiceInfo};

/// Histogram boundaries (seconds) for per-email processing time.
pub const PROCESSING_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0];

const BATCH_SIZE_BUCKETS: [f64; 8] = [5.0, 10.0, 25.0, 50.0, 100.0, 150.0, 200.0, 300.0];

/// Configuration for the built-in scrape / health endpoint.
#[derive(Clone)]
pub struct MetricsServerConfig {
    // ---
    /// Address to bind, e.g. `0.0.0.0:8088`. Port 0 picks a free port.
    pub bind: SocketAddr,

    /// Optional provider of the `details` object on `GET /health`.
    pub health: Option<Arc<dyn HealthSource>>,
}

impl MetricsServerConfig {
    // ---
    pub fn new(bind: SocketAddr) -> Self {
        // ---
        Self { bind, health: None }
    }

    pub fn with_health(mut self, source: Arc<dyn HealthSource>) -> Self {
        // ---
        self.health = Some(source);
        self
    }
}

/// A running scrape endpoint.
pub struct MetricsServer {
    // ---
    local_addr: SocketAddr,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    // ---
    /// Address actually bound (useful when the configured port was 0).
    pub fn local_addr(&self) -> SocketAddr {
        // ---
        self.local_addr
    }

    /// Stops serving. Scrapes in flight are dropped.
    pub fn abort(&self) {
        // ---
        self.task.abort();
    }
}

/// Prometheus metrics registry + handles.
///
/// This is a thin, explicit wrapper around the `prometheus` crate so hot-path
/// instrumentation is just counter increments / histogram observations.
#[derive(Clone)]
pub struct MetricsContext {
    // ---
    registry: Registry,
    info: ServiceInfo,

    // Email volume
    pub email_total: IntCounterVec,
    pub email_provider_total: IntCounterVec,

    // Email gauges (only ever go up while the process lives)
    pub email_current: IntGaugeVec,
    pub email_status_count: IntGaugeVec,

    // Timing (seconds)
    pub processing_seconds: HistogramVec,

    // Batch shape
    pub batches_total: IntCounter,
    pub batch_size: Histogram,
}

impl MetricsContext {
    // ---
    /// Create a new registry and register the email metrics.
    ///
    /// Every family is prefixed with `bs_` and carries `service` and
    /// `instance` as constant labels.
    pub fn new(info: ServiceInfo) -> Result<Self> {
        // ---
        let registry = Registry::new_custom(
            Some("bs".into()),
            Some(prometheus::labels! {
                "service".to_string() => info.name.clone(),
                "instance".to_string() => info.instance.clone()
            }),
        )?;

        let email_total = IntCounterVec::new(
            Opts::new("email_total", "Total number of emails processed"),
            &["dcs", "state", "provider", "status", "region"],
        )?;
        let email_provider_total = IntCounterVec::new(
            Opts::new("email_provider_total", "Total emails by provider"),
            &["provider", "status"],
        )?;

        let email_current = IntGaugeVec::new(
            Opts::new("email_current", "Current email count by status"),
            &["dcs", "provider", "status", "region"],
        )?;
        let email_status_count = IntGaugeVec::new(
            Opts::new("email_status_count", "Email count by status"),
            &["status"],
        )?;

        let processing_seconds = HistogramVec::new(
            HistogramOpts::new(
                "email_processing_duration_seconds",
                "Email processing duration in seconds",
            )
            .buckets(PROCESSING_BUCKETS.to_vec()),
            &["provider", "status", "region"],
        )?;

        let batches_total = IntCounter::with_opts(Opts::new(
            "email_batches_total",
            "Total synthetic email batches processed",
        ))?;
        let batch_size = Histogram::with_opts(
            HistogramOpts::new("email_batch_size", "Emails generated per batch")
                .buckets(BATCH_SIZE_BUCKETS.to_vec()),
        )?;

        // Register all metrics
        registry.register(Box::new(email_total.clone()))?;
        registry.register(Box::new(email_provider_total.clone()))?;
        registry.register(Box::new(email_current.clone()))?;
        registry.register(Box::new(email_status_count.clone()))?;
        registry.register(Box::new(processing_seconds.clone()))?;
        registry.register(Box::new(batches_total.clone()))?;
        registry.register(Box::new(batch_size.clone()))?;

        Ok(Self {
            registry,
            info,
            email_total,
            email_provider_total,
            email_current,
            email_status_count,
            processing_seconds,
            batches_total,
            batch_size,
        })
    }

    /// Gather metric families from this registry.
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        // ---
        self.registry.gather()
    }

    /// Spawns a minimal HTTP server that serves `GET /metrics` and
    /// `GET /health`.
    ///
    /// Must be called from within a Tokio runtime. Callers decide whether
    /// to run it.
    pub fn spawn_metrics_server(&self, cfg: MetricsServerConfig) -> Result<MetricsServer> {
        // ---
        let endpoint = Arc::new(Endpoint {
            registry: self.registry.clone(),
            info: self.info.clone(),
            health: cfg.health,
        });

        let make_svc = make_service_fn(move |_conn| {
            let endpoint = Arc::clone(&endpoint);
            async move {
                Ok::<_, hyper::Error>(service_fn(move |req| {
                    let endpoint = Arc::clone(&endpoint);
                    async move { handle_request(req, endpoint).await }
                }))
            }
        });

        let server = Server::try_bind(&cfg.bind)
            .with_context(|| format!("failed to bind metrics endpoint on {}", cfg.bind))?
            .serve(make_svc);
        let local_addr = server.local_addr();

        let task = tokio::spawn(async move {
            // ---
            server.await.map_err(|e| anyhow::anyhow!(e))?;
            Ok(())
        });

        Ok(MetricsServer { local_addr, task })
    }
}

struct Endpoint {
    // ---
    registry: Registry,
    info: ServiceInfo,
    health: Option<Arc<dyn HealthSource>>,
}

async fn handle_request(
    req: Request<Body>,
    endpoint: Arc<Endpoint>,
) -> Result<Response<Body>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let encoder = TextEncoder::new();
            let metric_families = endpoint.registry.gather();
            let mut buffer = Vec::new();

            if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
                let mut resp = Response::new(Body::from(format!("encode error: {e}")));
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                return Ok(resp);
            }

            let mut resp = Response::new(Body::from(buffer));
            resp.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            Ok(resp)
        }
        (&Method::GET, "/health") => {
            let body = health_body(&endpoint.info, endpoint.health.as_deref());
            let mut resp = Response::new(Body::from(body.to_string()));
            resp.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("application/json"),
            );
            Ok(resp)
        }
        _ => {
            let mut resp = Response::new(Body::from("not found"));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            Ok(resp)
        }
    }
}
