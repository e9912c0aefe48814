//! Deployment and Service convergence

use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use tracing::{error, info};

use crate::controller::apply::{Applied, create_or_patch};
use crate::controller::context::Context;
use crate::controller::error::{Error, Result};
use crate::crd::{Connector, ServiceType};
use crate::resources::common::{ResourceKind, config_map_resource, secret_resource, to_dynamic};
use crate::resources::deployment::generate_deployment;
use crate::resources::service::generate_service;

/// Upsert the connector's Deployment
///
/// A `configRef` or `secretRef` naming a missing object fails the pass so
/// that pods never start without their mounts.
pub async fn reconcile_deployment(
    ctx: &Context,
    connector: &Connector,
    ns: &str,
) -> Result<Applied> {
    if let Some(config_ref) = connector.spec.config_ref.as_deref().filter(|s| !s.is_empty()) {
        if ctx.store.get(&config_map_resource(), ns, config_ref).await?.is_none() {
            error!(config_map = %config_ref, namespace = %ns, "Referenced ConfigMap not found");
            return Err(Error::NotFound(format!("ConfigMap {ns}/{config_ref}")));
        }
    }

    if let Some(secret_ref) = connector.spec.secret_ref.as_deref().filter(|s| !s.is_empty()) {
        if ctx.store.get(&secret_resource(), ns, secret_ref).await?.is_none() {
            error!(secret = %secret_ref, namespace = %ns, "Referenced Secret not found");
            return Err(Error::NotFound(format!("Secret {ns}/{secret_ref}")));
        }
    }

    let deployment = generate_deployment(connector);
    let obj = to_dynamic(&deployment, &ResourceKind::Deployment.api_resource())?;
    let applied = create_or_patch(ctx.store.as_ref(), ResourceKind::Deployment, ns, &obj).await?;

    info!(deployment = %connector.name_any(), ?applied, "Deployment reconciled");
    Ok(applied)
}

/// Upsert the Service fronting an HTTP-scaled connector
pub async fn reconcile_service(
    ctx: &Context,
    connector: &Connector,
    ns: &str,
    port: i32,
    service_type: ServiceType,
) -> Result<Applied> {
    let service: Service = generate_service(connector, port, service_type);
    let obj = to_dynamic(&service, &ResourceKind::Service.api_resource())?;
    let applied = create_or_patch(ctx.store.as_ref(), ResourceKind::Service, ns, &obj).await?;

    info!(
        service = %connector.name_any(),
        port,
        service_type = %service_type,
        ?applied,
        "Service reconciled"
    );
    Ok(applied)
}
