//! Common utilities for Kubernetes resource generation
//!
//! Shared naming, labelling and ownership helpers used by every generator so
//! that all derived objects of a Connector look alike.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::ResourceExt;
use kube::api::{ApiResource, DynamicObject};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::crd::Connector;

/// API version for the Connector CRD
pub const API_VERSION: &str = "vance.io/v1alpha1";

/// Kind for the Connector CRD
pub const KIND: &str = "Connector";

/// Operator field manager name
pub const FIELD_MANAGER: &str = "connector-operator";

/// Label naming the owning Connector
pub const CONNECTOR_LABEL: &str = "vance.io/connector";

/// Pod label matched by the Deployment and Service selectors
pub const APP_LABEL: &str = "app";

/// KEDA API group
pub const KEDA_API_GROUP: &str = "keda.sh";
/// KEDA HTTP Add-on API group
pub const HTTP_API_GROUP: &str = "http.keda.sh";
/// API version shared by the KEDA kinds
pub const KEDA_API_VERSION: &str = "v1alpha1";

/// Kind of object derived from a Connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Deployment,
    Service,
    ScaledObject,
    HttpScaledObject,
    TriggerAuthentication,
}

impl ResourceKind {
    /// Autoscaling kinds subject to pruning, in deletion order
    pub const PRUNABLE: [ResourceKind; 4] = [
        ResourceKind::HttpScaledObject,
        ResourceKind::ScaledObject,
        ResourceKind::TriggerAuthentication,
        ResourceKind::Service,
    ];

    /// Name of this kind's object for a connector
    ///
    /// TriggerAuthentications of further secret-backed triggers are named
    /// with [`trigger_auth_name`].
    pub fn object_name(&self, connector_name: &str) -> String {
        match self {
            ResourceKind::Deployment | ResourceKind::Service => connector_name.to_string(),
            ResourceKind::ScaledObject => format!("{connector_name}-vso"),
            ResourceKind::HttpScaledObject => format!("{connector_name}-vhso"),
            ResourceKind::TriggerAuthentication => format!("{connector_name}-vta"),
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        match self {
            ResourceKind::Deployment => ApiResource::erase::<Deployment>(&()),
            ResourceKind::Service => ApiResource::erase::<Service>(&()),
            ResourceKind::ScaledObject => {
                keda_resource(KEDA_API_GROUP, "ScaledObject", "scaledobjects")
            }
            ResourceKind::HttpScaledObject => {
                keda_resource(HTTP_API_GROUP, "HTTPScaledObject", "httpscaledobjects")
            }
            ResourceKind::TriggerAuthentication => keda_resource(
                KEDA_API_GROUP,
                "TriggerAuthentication",
                "triggerauthentications",
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::ScaledObject => "ScaledObject",
            ResourceKind::HttpScaledObject => "HTTPScaledObject",
            ResourceKind::TriggerAuthentication => "TriggerAuthentication",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn keda_resource(group: &str, kind: &str, plural: &str) -> ApiResource {
    ApiResource {
        group: group.to_string(),
        version: KEDA_API_VERSION.to_string(),
        api_version: format!("{group}/{KEDA_API_VERSION}"),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

/// Api resources for the objects the reconciler reads but never writes
pub fn secret_resource() -> ApiResource {
    ApiResource::erase::<Secret>(&())
}

pub fn config_map_resource() -> ApiResource {
    ApiResource::erase::<ConfigMap>(&())
}

pub fn connector_resource() -> ApiResource {
    ApiResource::erase::<Connector>(&())
}

/// Name of the TriggerAuthentication for the `index`-th secret-backed trigger
///
/// The first one keeps the plain `<name>-vta` name.
pub fn trigger_auth_name(connector_name: &str, index: usize) -> String {
    let base = ResourceKind::TriggerAuthentication.object_name(connector_name);
    if index == 0 {
        base
    } else {
        format!("{base}-{index}")
    }
}

/// Generate an owner reference for a Connector
///
/// Every derived object carries this as its only owner so that deleting the
/// Connector garbage collects it.
pub fn owner_reference(connector: &Connector) -> OwnerReference {
    OwnerReference {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        name: connector.name_any(),
        uid: connector.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Generate standard labels for all resources belonging to a Connector
pub fn standard_labels(connector_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "app.kubernetes.io/name".to_string(),
            connector_name.to_string(),
        ),
        (
            "app.kubernetes.io/managed-by".to_string(),
            FIELD_MANAGER.to_string(),
        ),
        (CONNECTOR_LABEL.to_string(), connector_name.to_string()),
    ])
}

/// Metadata of an object named `name` derived from `connector`
pub fn derived_metadata(connector: &Connector, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: connector.namespace(),
        labels: Some(standard_labels(&connector.name_any())),
        owner_references: Some(vec![owner_reference(connector)]),
        ..Default::default()
    }
}

/// Wrap a KEDA `spec` into a `DynamicObject` of `kind`
pub fn keda_object<S: Serialize>(
    connector: &Connector,
    kind: ResourceKind,
    name: &str,
    spec: &S,
) -> DynamicObject {
    let mut obj = DynamicObject::new(name, &kind.api_resource());
    obj.metadata = derived_metadata(connector, name);
    obj.data = serde_json::json!({ "spec": spec });
    obj
}

/// Label selector matching every object derived from a connector
pub fn connector_selector(connector_name: &str) -> String {
    format!("{CONNECTOR_LABEL}={connector_name}")
}

/// Pod selector labels shared by the Deployment and the Service
pub fn selector_labels(connector_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), connector_name.to_string())])
}

/// Convert a typed object into a `DynamicObject` of the given resource
pub fn to_dynamic<K: Serialize>(
    obj: &K,
    resource: &ApiResource,
) -> Result<DynamicObject, serde_json::Error> {
    let mut value = serde_json::to_value(obj)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("apiVersion".to_string(), resource.api_version.clone().into());
        map.insert("kind".to_string(), resource.kind.clone().into());
    }
    serde_json::from_value(value)
}

/// Convert a `DynamicObject` back into a typed object
pub fn from_dynamic<K: DeserializeOwned>(obj: DynamicObject) -> Result<K, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(obj)?)
}
