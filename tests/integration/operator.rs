//! In-process controller for integration tests, scoped to one namespace

use std::sync::Arc;

use kube::Client;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use connector_operator::{Context, ScalerConfig, run_controller_scoped};

/// A namespace-scoped controller that runs until dropped
pub struct ScopedOperator {
    handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ScopedOperator {
    pub async fn start(client: Client, namespace: &str, scaler_config: ScalerConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let namespace = namespace.to_string();
        let ctx = Arc::new(Context::new(
            client.clone(),
            Arc::new(scaler_config),
            None,
            true,
        ));

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = run_controller_scoped(client, ctx, None, Some(&namespace)) => {
                    tracing::warn!("Controller stream ended before shutdown");
                }
                _ = shutdown_rx => {
                    tracing::debug!(namespace = %namespace, "Stopping scoped controller");
                }
            }
        });

        // Watches are established asynchronously
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        Self {
            handle,
            shutdown_tx: Some(shutdown_tx),
        }
    }
}

impl Drop for ScopedOperator {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}
