//! KEDA ScaledObject resource generation for custom-scaled connectors
//!
//! One ScaledObject per connector targets its Deployment and carries every
//! declared trigger. Triggers backed by a Secret reference the
//! TriggerAuthentication generated for them.

use kube::ResourceExt;
use kube::api::DynamicObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crd::{Connector, CustomScaling, ScalingRule, Trigger};
use crate::resources::common::{ResourceKind, keda_object};

/// KEDA ScaledObject spec
///
/// Unset overrides serialize as `null` so that patching an existing object
/// clears them and KEDA falls back to its own defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObjectSpec {
    pub scale_target_ref: ScaleTargetRef,
    pub min_replica_count: Option<i32>,
    pub max_replica_count: Option<i32>,
    /// Seconds to wait after the last active trigger before scaling to the minimum
    pub cooldown_period: Option<i32>,
    /// Seconds between trigger polls
    pub polling_interval: Option<i32>,
    pub triggers: Vec<ScaleTrigger>,
}

/// Workload the ScaledObject drives
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTargetRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub kind: String,
    pub name: String,
}

/// One entry of `spec.triggers`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTrigger {
    #[serde(rename = "type")]
    pub type_: String,
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_ref: Option<AuthenticationRef>,
}

impl ScaleTrigger {
    /// Build the KEDA trigger for a connector trigger
    pub fn from_trigger(trigger: &Trigger, trigger_auth: Option<String>) -> Self {
        Self {
            type_: trigger.type_.clone(),
            metadata: trigger.metadata.clone(),
            authentication_ref: trigger_auth.map(|name| AuthenticationRef { name }),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRef {
    pub name: String,
}

/// Generate the ScaledObject for a custom-scaled connector
pub fn generate_scaled_object(
    connector: &Connector,
    rule: &ScalingRule,
    custom: &CustomScaling,
    triggers: Vec<ScaleTrigger>,
) -> DynamicObject {
    let connector_name = connector.name_any();
    let name = ResourceKind::ScaledObject.object_name(&connector_name);

    let spec = ScaledObjectSpec {
        scale_target_ref: ScaleTargetRef {
            api_version: Some("apps/v1".to_string()),
            kind: "Deployment".to_string(),
            name: ResourceKind::Deployment.object_name(&connector_name),
        },
        min_replica_count: rule.min_replica_count,
        max_replica_count: rule.max_replica_count,
        cooldown_period: custom.cooldown_period,
        polling_interval: custom.check_interval,
        triggers,
    };

    keda_object(connector, ResourceKind::ScaledObject, &name, &spec)
}
