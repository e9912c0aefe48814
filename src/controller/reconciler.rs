//! Reconciliation logic for Connector resources
//!
//! One pass converges the derived objects in a fixed order:
//! Deployment, then Service and HTTPScaledObject for HTTP scaling, or
//! TriggerAuthentications and ScaledObject for custom scaling, then prunes
//! autoscaling objects the spec no longer asks for.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kube::ResourceExt;
use kube::runtime::controller::Action;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::autoscaling::{reconcile_http_scaled_object, reconcile_scaled_object};
use crate::controller::context::Context;
use crate::controller::error::{Error, Result};
use crate::controller::prune::{DesiredObjects, prune_stale};
use crate::controller::status::{ReconcileStage, StatusManager, condition, failure_condition};
use crate::controller::store::get_typed;
use crate::controller::validation::validate_connector;
use crate::controller::workload::{reconcile_deployment, reconcile_service};
use crate::crd::{
    ConditionStatus, Connector, ConnectorCondition, ConnectorConditionReason,
    ConnectorCreationStatus, ScalingMode,
};
use crate::resources::common::{ResourceKind, connector_resource};

/// Periodic resync of healthy connectors
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Main reconciliation function
#[instrument(skip(connector, ctx), fields(name = %connector.name_any(), namespace = %connector.namespace().unwrap_or_default()))]
pub async fn reconcile(connector: Arc<Connector>, ctx: Arc<Context>) -> Result<Action> {
    let ns = connector
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    let name = connector.name_any();
    let key = failure_key(&ns, &name);
    let start = Instant::now();

    let result = reconcile_connector(&ctx, &ns, &name).await;

    if let Some(health) = &ctx.health_state {
        match &result {
            Ok(_) => {
                health
                    .metrics
                    .record_reconcile(&ns, &name, start.elapsed().as_secs_f64());
                health.touch_last_reconcile();
            }
            Err(_) => health.metrics.record_error(&ns, &name),
        }
    }
    if result.is_ok() {
        ctx.reset_failures(&key);
    }

    result
}

/// Reconcile the Connector `ns/name` as currently stored
///
/// A Connector that no longer exists is not an error: its derived objects
/// are garbage collected through their owner references.
pub async fn reconcile_connector(ctx: &Context, ns: &str, name: &str) -> Result<Action> {
    let Some(connector) =
        get_typed::<Connector>(ctx.store.as_ref(), &connector_resource(), ns, name).await?
    else {
        debug!("Connector no longer exists");
        return Ok(Action::await_change());
    };

    let status = StatusManager::new(&connector, ctx, ns);

    if connector.metadata.deletion_timestamp.is_some() {
        info!("Connector is terminating, leaving cleanup to garbage collection");
        status
            .record_best_effort(condition(
                ConnectorCreationStatus::Terminating,
                ConditionStatus::True,
                ConnectorConditionReason::TerminatingResources,
                "Derived objects are removed with the Connector",
            ))
            .await;
        return Ok(Action::await_change());
    }

    info!("Reconciling Connector");

    match converge(ctx, &connector, ns).await {
        Ok(outcome) => {
            info!("Reconciliation completed successfully");
            status.record_best_effort(outcome).await;
            Ok(Action::requeue(RESYNC_INTERVAL))
        }
        Err((stage, e)) => {
            error!(stage = ?stage, "Reconciliation failed: {}", e);
            status.record_best_effort(failure_condition(stage, &e)).await;
            Err(e)
        }
    }
}

/// Error policy for the controller with exponential backoff
pub fn error_policy(connector: Arc<Connector>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = connector.name_any();
    let key = failure_key(&connector.namespace().unwrap_or_default(), &name);

    let attempt = ctx.record_failure(&key);
    let delay = ctx.backoff.delay_for_error(error, attempt);

    if error.is_retryable() {
        warn!(
            "Retryable error for {} (attempt {}): {:?}, requeuing in {:?}",
            name,
            attempt + 1,
            error,
            delay
        );
    } else {
        error!(
            "Non-retryable error for {}: {:?}, requeuing in {:?} until the spec is fixed",
            name, error, delay
        );
    }

    Action::requeue(delay)
}

fn failure_key(ns: &str, name: &str) -> String {
    format!("{ns}/{name}")
}

type StageResult<T> = std::result::Result<T, (ReconcileStage, Error)>;

fn at<E: Into<Error>>(stage: ReconcileStage) -> impl FnOnce(E) -> (ReconcileStage, Error) {
    move |e| (stage, e.into())
}

/// Run every step of one pass, producing the success condition to record
async fn converge(ctx: &Context, connector: &Connector, ns: &str) -> StageResult<ConnectorCondition> {
    let name = connector.name_any();

    validate_connector(connector).map_err(at(ReconcileStage::Validate))?;
    let scaling = connector
        .spec
        .effective_scaling()
        .map_err(at(ReconcileStage::Validate))?;

    reconcile_deployment(ctx, connector, ns)
        .await
        .map_err(at(ReconcileStage::Deployment))?;

    let mut desired: DesiredObjects = BTreeSet::new();

    let outcome = match &scaling {
        None => {
            debug!("No scaling rule, Deployment only");
            condition(
                ConnectorCreationStatus::Created,
                ConditionStatus::True,
                ConnectorConditionReason::DeploymentCreated,
                format!("Deployment {name} is up to date"),
            )
        }
        Some(rule) => match &rule.mode {
            ScalingMode::HttpScaling(http) => {
                let port = connector.spec.effective_expose_port().ok_or_else(|| {
                    (
                        ReconcileStage::Validate,
                        Error::ValidationError("httpScaling requires exposePort".to_string()),
                    )
                })?;

                reconcile_service(ctx, connector, ns, port, http.svc_type)
                    .await
                    .map_err(at(ReconcileStage::Autoscaling))?;
                reconcile_http_scaled_object(ctx, connector, ns, rule, http, port)
                    .await
                    .map_err(at(ReconcileStage::Autoscaling))?;

                desired.insert((ResourceKind::Service, ResourceKind::Service.object_name(&name)));
                let httpso = ResourceKind::HttpScaledObject.object_name(&name);
                desired.insert((ResourceKind::HttpScaledObject, httpso.clone()));

                condition(
                    ConnectorCreationStatus::Ready,
                    ConditionStatus::True,
                    ConnectorConditionReason::HttpScaledObjectIsReady,
                    format!("HTTPScaledObject {httpso} routes host {}", http.host),
                )
            }
            ScalingMode::CustomScaling(custom) => {
                let trigger_auths = reconcile_scaled_object(ctx, connector, ns, rule, custom)
                    .await
                    .map_err(at(ReconcileStage::Autoscaling))?;

                let so = ResourceKind::ScaledObject.object_name(&name);
                desired.insert((ResourceKind::ScaledObject, so.clone()));
                desired.extend(
                    trigger_auths
                        .into_iter()
                        .map(|ta| (ResourceKind::TriggerAuthentication, ta)),
                );

                condition(
                    ConnectorCreationStatus::Created,
                    ConditionStatus::True,
                    ConnectorConditionReason::AppScaledObjectCreated,
                    format!("ScaledObject {so} has {} trigger(s)", custom.triggers.len()),
                )
            }
        },
    };

    if ctx.prune {
        let removed = prune_stale(ctx, connector, ns, &desired)
            .await
            .map_err(at(ReconcileStage::Autoscaling))?;
        if removed > 0 {
            info!(removed, "Pruned autoscaling objects no longer in spec");
        }
    }

    Ok(outcome)
}
