use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kube::Client;

use crate::config::ScalerConfig;
use crate::controller::error::BackoffConfig;
use crate::controller::store::{KubeStore, ObjectStore};
use crate::health::HealthState;

/// Shared context for the controller
pub struct Context {
    /// Reads and writes of cluster objects
    pub store: Arc<dyn ObjectStore>,
    /// Secret key-sets per trigger type, loaded once at startup
    pub scaler_config: Arc<ScalerConfig>,
    /// Health state for recording metrics
    pub health_state: Option<Arc<HealthState>>,
    /// Delete autoscaling objects no longer desired by the spec
    pub prune: bool,
    pub backoff: BackoffConfig,
    /// Consecutive failures per `namespace/name`
    failures: Mutex<HashMap<String, u32>>,
}

impl Context {
    pub fn new(
        client: Client,
        scaler_config: Arc<ScalerConfig>,
        health_state: Option<Arc<HealthState>>,
        prune: bool,
    ) -> Self {
        Self::with_store(Arc::new(KubeStore::new(client)), scaler_config)
            .with_health_state(health_state)
            .with_prune(prune)
    }

    /// Context over an arbitrary store, with pruning enabled
    pub fn with_store(store: Arc<dyn ObjectStore>, scaler_config: Arc<ScalerConfig>) -> Self {
        Self {
            store,
            scaler_config,
            health_state: None,
            prune: true,
            backoff: BackoffConfig::default(),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_health_state(mut self, health_state: Option<Arc<HealthState>>) -> Self {
        self.health_state = health_state;
        self
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Record a failure and return the number of failures before it
    pub fn record_failure(&self, key: &str) -> u32 {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let count = failures.entry(key.to_string()).or_insert(0);
        let previous = *count;
        *count = count.saturating_add(1);
        previous
    }

    pub fn reset_failures(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub fn failure_count(&self, key: &str) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}
