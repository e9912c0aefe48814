//! Health and metrics endpoints served next to the controller
//!
//! `/healthz` answers as long as the process runs, `/readyz` once the
//! controller loop has started, and `/metrics` renders the registry in the
//! Prometheus text format.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

const METRIC_PREFIX: &str = "connector_operator";

const OPENMETRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Upper bounds of the reconcile duration buckets, in seconds
const DURATION_BUCKETS: [f64; 10] = [0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Identifies one Connector in metric labels
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ConnectorLabels {
    pub namespace: String,
    pub name: String,
}

impl ConnectorLabels {
    fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TriggerLabels {
    pub trigger_type: String,
}

/// Controller metrics, all registered under the `connector_operator` prefix
pub struct Metrics {
    pub reconciliations: Family<ConnectorLabels, Counter>,
    pub reconciliation_errors: Family<ConnectorLabels, Counter>,
    pub reconcile_duration: Family<ConnectorLabels, Histogram>,
    /// Trigger Secrets that matched none of the configured key-sets
    pub secret_validation_failures: Family<TriggerLabels, Counter>,
    /// Unix time of the last successful pass over any Connector
    pub last_reconcile: Gauge,
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let reconciliations = Family::<ConnectorLabels, Counter>::default();
        let reconciliation_errors = Family::<ConnectorLabels, Counter>::default();
        let reconcile_duration =
            Family::<ConnectorLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(DURATION_BUCKETS.iter().copied())
            });
        let secret_validation_failures = Family::<TriggerLabels, Counter>::default();
        let last_reconcile = Gauge::default();

        let mut registry = Registry::with_prefix(METRIC_PREFIX);
        registry.register(
            "reconciliations",
            "Reconcile passes that converged",
            reconciliations.clone(),
        );
        registry.register(
            "reconciliation_errors",
            "Reconcile passes that ended in an error",
            reconciliation_errors.clone(),
        );
        registry.register(
            "reconcile_duration_seconds",
            "Wall time of converged reconcile passes",
            reconcile_duration.clone(),
        );
        registry.register(
            "secret_validation_failures",
            "Trigger secrets missing every configured key-set",
            secret_validation_failures.clone(),
        );
        registry.register(
            "last_reconcile_timestamp_seconds",
            "Unix time of the last converged reconcile pass",
            last_reconcile.clone(),
        );

        Self {
            reconciliations,
            reconciliation_errors,
            reconcile_duration,
            secret_validation_failures,
            last_reconcile,
            registry,
        }
    }

    pub fn record_reconcile(&self, namespace: &str, name: &str, duration_secs: f64) {
        let labels = ConnectorLabels::new(namespace, name);
        self.reconciliations.get_or_create(&labels).inc();
        self.reconcile_duration
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    pub fn record_error(&self, namespace: &str, name: &str) {
        self.reconciliation_errors
            .get_or_create(&ConnectorLabels::new(namespace, name))
            .inc();
    }

    pub fn record_secret_validation_failure(&self, trigger_type: &str) {
        self.secret_validation_failures
            .get_or_create(&TriggerLabels {
                trigger_type: trigger_type.to_string(),
            })
            .inc();
    }

    /// Render the registry; an encoding failure is logged and yields an empty body
    pub fn encode(&self) -> String {
        let mut body = String::new();
        match encode(&mut body, &self.registry) {
            Ok(()) => body,
            Err(e) => {
                tracing::error!("Failed to encode metrics: {}", e);
                String::new()
            }
        }
    }
}

/// State shared between the controller and the health server
pub struct HealthState {
    ready: RwLock<bool>,
    pub metrics: Metrics,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }

    /// Stamp the last-reconcile gauge with the current time
    pub fn touch_last_reconcile(&self) {
        self.metrics
            .last_reconcile
            .set(chrono::Utc::now().timestamp());
    }

    /// Unix time of the last converged pass, 0 before the first one
    pub fn last_reconcile(&self) -> i64 {
        self.metrics.last_reconcile.get()
    }
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    if state.is_ready().await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn render_metrics(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)],
        state.metrics.encode(),
    )
}

pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(liveness))
        .route("/readyz", get(readiness))
        .route("/metrics", get(render_metrics))
        .with_state(state)
}

/// Serve the health endpoints on `addr` until the listener fails
pub async fn run_health_server(
    state: Arc<HealthState>,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Health server listening");
    axum::serve(listener, create_router(state)).await
}
