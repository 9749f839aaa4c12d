//! Prometheus HTTP exporter.
//!
//! Serves a [`Registry`] in the Prometheus text exposition format so it can
//! be scraped by Prometheus or compatible collectors.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cpapwatch_sdk::prometheus::{PrometheusConfig, PrometheusExporter};
//! use cpapwatch_sdk::Registry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(Registry::with_namespace("myair"));
//!     let config = PrometheusConfig::builder()
//!         .listen_addr("0.0.0.0:8933")
//!         .metrics_path("/metrics")
//!         .build();
//!
//!     let exporter = PrometheusExporter::new(config, registry.clone());
//!     let _server = exporter.start_server().await?;
//!
//!     // Metrics available at http://localhost:8933/metrics
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::{Registry, SinkError};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8933";
const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Configuration for the Prometheus metrics endpoint.
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Address to listen on (e.g., "0.0.0.0:8933")
    pub listen_addr: String,
    /// Path for metrics endpoint (e.g., "/metrics")
    pub metrics_path: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

impl PrometheusConfig {
    /// Create a new builder for PrometheusConfig.
    pub fn builder() -> PrometheusConfigBuilder {
        PrometheusConfigBuilder::default()
    }
}

/// Builder for PrometheusConfig.
#[derive(Debug, Default)]
pub struct PrometheusConfigBuilder {
    listen_addr: Option<String>,
    metrics_path: Option<String>,
}

impl PrometheusConfigBuilder {
    /// Set the listen address.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Set the metrics path.
    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    /// Build the PrometheusConfig.
    pub fn build(self) -> PrometheusConfig {
        PrometheusConfig {
            listen_addr: self
                .listen_addr
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            metrics_path: self
                .metrics_path
                .unwrap_or_else(|| DEFAULT_METRICS_PATH.to_string()),
        }
    }
}

/// Prometheus exporter that serves a registry over HTTP.
#[derive(Debug)]
pub struct PrometheusExporter {
    config: PrometheusConfig,
    registry: Arc<Registry>,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter for a shared registry.
    pub fn new(config: PrometheusConfig, registry: Arc<Registry>) -> Self {
        Self { config, registry }
    }

    /// Get the configuration.
    pub fn config(&self) -> &PrometheusConfig {
        &self.config
    }

    /// Get the current metrics in Prometheus exposition format.
    pub fn render(&self) -> String {
        self.registry.render()
    }

    /// Bind the listen address and serve metrics in a background task.
    ///
    /// Binding happens before this returns, so an unusable address is
    /// reported to the caller. The server then runs until the runtime shuts
    /// down or the returned handle is aborted.
    pub async fn start_server(&self) -> Result<tokio::task::JoinHandle<()>, SinkError> {
        let addr: SocketAddr = self
            .config
            .listen_addr
            .parse()
            .map_err(|_| SinkError::InvalidAddress(self.config.listen_addr.clone()))?;
        let listener = TcpListener::bind(addr).await?;
        info!(
            "Prometheus exporter listening on {}{}",
            addr, self.config.metrics_path
        );

        let metrics_path = self.config.metrics_path.clone();
        let registry = self.registry.clone();

        Ok(tokio::spawn(async move {
            if let Err(e) = run_server(listener, metrics_path, registry).await {
                warn!("Prometheus server error: {}", e);
            }
        }))
    }
}

async fn run_server(
    listener: TcpListener,
    metrics_path: String,
    registry: Arc<Registry>,
) -> Result<(), std::io::Error> {
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        let metrics_path = metrics_path.clone();
        let registry = registry.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let metrics_path = metrics_path.clone();
                let registry = registry.clone();

                async move { handle_request(req.uri().path(), &metrics_path, &registry) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Prometheus connection error: {}", e);
            }
        });
    }
}

fn handle_request(
    path: &str,
    metrics_path: &str,
    registry: &Registry,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if path == metrics_path {
        Ok(text_response(
            StatusCode::OK,
            "text/plain; version=0.0.4; charset=utf-8",
            registry.render(),
        ))
    } else if path == "/health" || path == "/healthz" {
        Ok(text_response(StatusCode::OK, "text/plain", "OK".to_string()))
    } else {
        Ok(text_response(
            StatusCode::NOT_FOUND,
            "text/plain",
            "Not Found".to_string(),
        ))
    }
}

fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: String,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
