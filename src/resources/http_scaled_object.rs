//! KEDA HTTP Add-on resource generation
//!
//! HTTP-scaled connectors scale on the number of pending requests seen by the
//! Add-on interceptor for their host, down to zero replicas when idle.

use kube::ResourceExt;
use kube::api::DynamicObject;
use serde::{Deserialize, Serialize};

use crate::crd::{Connector, HttpScaling, ScalingRule};
use crate::resources::common::{ResourceKind, keda_object};

/// Replica bounds used when the scaling rule leaves them unset
pub const DEFAULT_MIN_REPLICAS: i32 = 0;
pub const DEFAULT_MAX_REPLICAS: i32 = 10;

/// KEDA HTTPScaledObject spec
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpScaledObjectSpec {
    /// Host headers routed to the connector by the interceptor
    pub hosts: Vec<String>,
    pub scale_target_ref: HttpScaleTargetRef,
    pub replicas: ReplicasConfig,
    /// Pending requests per replica before scaling out, `null` when unset
    pub target_pending_requests: Option<i32>,
}

/// Deployment, Service and port behind the routed host
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpScaleTargetRef {
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub service: String,
    pub port: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicasConfig {
    /// 0 allows scaling to zero
    pub min: i32,
    pub max: i32,
}

/// Generate the HTTPScaledObject routing `http.host` to the connector
///
/// The Deployment and the Service share the connector's name.
pub fn generate_http_scaled_object(
    connector: &Connector,
    rule: &ScalingRule,
    http: &HttpScaling,
    port: i32,
) -> DynamicObject {
    let connector_name = connector.name_any();
    let name = ResourceKind::HttpScaledObject.object_name(&connector_name);

    let spec = HttpScaledObjectSpec {
        hosts: vec![http.host.clone()],
        scale_target_ref: HttpScaleTargetRef {
            name: ResourceKind::Deployment.object_name(&connector_name),
            kind: "Deployment".to_string(),
            api_version: Some("apps/v1".to_string()),
            service: ResourceKind::Service.object_name(&connector_name),
            port,
        },
        replicas: ReplicasConfig {
            min: rule.min_replica_count.unwrap_or(DEFAULT_MIN_REPLICAS),
            max: rule.max_replica_count.unwrap_or(DEFAULT_MAX_REPLICAS),
        },
        target_pending_requests: Some(http.pending_requests).filter(|p| *p != 0),
    };

    keda_object(connector, ResourceKind::HttpScaledObject, &name, &spec)
}
