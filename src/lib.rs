pub mod config;
pub mod controller;
pub mod crd;
pub mod health;
pub mod resources;

pub use config::{ConfigError, OperatorConfig, ScalerConfig};
pub use controller::{
    BackoffConfig, Context, Error, KubeStore, ObjectStore, Result, error_policy, reconcile,
    reconcile_connector,
};
pub use crd::{Connector, ConnectorSpec, ConnectorStatus, ScalingMode, ScalingRule};
pub use health::{HealthState, Metrics};

use std::fmt::Debug;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::controller::{Action, Controller, Error as ControllerError};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;

/// `Api<T>` over one namespace, or over the whole cluster for `None`
fn api_for<T>(client: Client, namespace: Option<&str>) -> Api<T>
where
    T: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
    <T as Resource>::DynamicType: Default,
{
    namespace.map_or_else(
        || Api::all(client.clone()),
        |ns| Api::namespaced(client.clone(), ns),
    )
}

/// Run the Connector controller with the watch scope taken from `config`
pub async fn run_controller(
    client: Client,
    config: &OperatorConfig,
    scaler_config: Arc<ScalerConfig>,
    health_state: Option<Arc<HealthState>>,
) {
    let ctx = Arc::new(Context::new(
        client.clone(),
        scaler_config,
        health_state.clone(),
        config.prune_stale_resources,
    ));
    run_controller_scoped(client, ctx, health_state, config.watch_namespace.as_deref()).await
}

/// Run the Connector controller over a prepared context until its stream ends
///
/// Owned Deployments and Services are watched so that edits to them trigger
/// a pass. KEDA objects are not watched, which keeps the controller usable on
/// clusters without the KEDA CRDs; the periodic resync corrects their drift.
pub async fn run_controller_scoped(
    client: Client,
    ctx: Arc<Context>,
    health_state: Option<Arc<HealthState>>,
    namespace: Option<&str>,
) {
    tracing::info!(
        scope = namespace.unwrap_or("cluster"),
        "Starting Connector controller"
    );
    if let Some(state) = &health_state {
        state.set_ready(true).await;
    }

    let watch = watcher::Config::default().any_semantic();
    Controller::new(api_for::<Connector>(client.clone(), namespace), watch.clone())
        .owns(api_for::<Deployment>(client.clone(), namespace), watch.clone())
        .owns(api_for::<Service>(client, namespace), watch)
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move { log_outcome(result) })
        .await;

    tracing::error!("Connector controller stream ended");
}

type Outcome = std::result::Result<
    (ObjectRef<Connector>, Action),
    ControllerError<Error, watcher::Error>,
>;

fn log_outcome(result: Outcome) {
    match result {
        Ok((obj, _)) => tracing::debug!(connector = %obj, "Reconciled"),
        Err(e) if is_connector_gone(&e) => tracing::debug!("Connector is gone: {}", e),
        Err(e) => tracing::error!("Reconciliation error: {:?}", e),
    }
}

/// Owned-object events can still arrive for a Connector deleted moments ago.
/// A 404 from any other object is a real failure.
fn is_connector_gone(err: &ControllerError<Error, watcher::Error>) -> bool {
    matches!(err, ControllerError::ObjectNotFound(_))
}
