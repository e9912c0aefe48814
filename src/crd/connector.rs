use k8s_openapi::api::core::v1::Container;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::legacy::{ConnectorType, ConversionError, LegacyScalerSpec};

/// Connector is the Schema for the connectors API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "vance.io",
    version = "v1alpha1",
    kind = "Connector",
    plural = "connectors",
    shortname = "conn",
    namespaced,
    status = "ConnectorStatus",
    printcolumn = r#"{"name":"Image", "type":"string", "jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Port", "type":"integer", "jsonPath":".spec.exposePort"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSpec {
    /// The image uri of the connector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Explicit pod containers. When set they are used verbatim and `image` is ignored.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(schema_with = "containers_schema")]
    pub containers: Vec<Container>,

    /// Port the connector listens on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_port: Option<i32>,

    /// ConfigMap mounted into the connector at `/vance/config`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_ref: Option<String>,

    /// Secret mounted into the connector at `/vance/secret`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,

    /// Autoscaling configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "scaling_rule_schema")]
    pub scaling_rule: Option<ScalingRule>,

    /// Deprecated: connector type of the first API revision. Use `scalingRule`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub connector_type: Option<ConnectorType>,

    /// Deprecated: single scaler of the first API revision. Use `scalingRule`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler_spec: Option<LegacyScalerSpec>,
}

impl ConnectorSpec {
    /// Resolve the scaling rule to reconcile.
    ///
    /// `scalingRule` wins; otherwise the legacy `type` + `scalerSpec` pair is
    /// converted. `Ok(None)` means no autoscaling is wanted.
    pub fn effective_scaling(&self) -> Result<Option<ScalingRule>, ConversionError> {
        if let Some(rule) = &self.scaling_rule {
            return Ok(Some(rule.clone()));
        }

        match (&self.connector_type, &self.scaler_spec) {
            (Some(connector_type), Some(scaler)) => scaler.to_scaling_rule(connector_type).map(Some),
            (None, Some(_)) => Err(ConversionError::MissingField("type")),
            _ => Ok(None),
        }
    }

    /// Whether KEDA rather than the Deployment owns the replica count
    pub fn wants_autoscaling(&self) -> bool {
        self.scaling_rule.is_some() || self.scaler_spec.is_some()
    }

    /// Port exposed by the connector, falling back to the legacy `svcPort` metadata
    pub fn effective_expose_port(&self) -> Option<i32> {
        self.expose_port
            .or_else(|| self.scaler_spec.as_ref().and_then(|s| s.int_value("svcPort")))
    }
}

fn containers_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "array",
        "items": {
            "type": "object",
            "x-kubernetes-preserve-unknown-fields": true
        }
    })
}

/// Structural schema of `scalingRule`: both modes are declared as properties
/// and a `oneOf` of required-clauses admits exactly one of them.
fn scaling_rule_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    let custom = generator.subschema_for::<CustomScaling>();
    let http = generator.subschema_for::<HttpScaling>();
    schemars::json_schema!({
        "type": "object",
        "nullable": true,
        "properties": {
            "maxReplicaCount": { "type": "integer", "format": "int32", "nullable": true },
            "minReplicaCount": { "type": "integer", "format": "int32", "nullable": true },
            "customScaling": custom,
            "httpScaling": http
        },
        "oneOf": [
            { "required": ["customScaling"] },
            { "required": ["httpScaling"] }
        ]
    })
}

/// Autoscaling rule. Exactly one scaling mode is set.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "ScalingRuleFields")]
pub struct ScalingRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replica_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replica_count: Option<i32>,

    #[serde(flatten)]
    pub mode: ScalingMode,
}

impl ScalingRule {
    pub fn custom(custom: CustomScaling) -> Self {
        Self {
            max_replica_count: None,
            min_replica_count: None,
            mode: ScalingMode::CustomScaling(custom),
        }
    }

    pub fn http(http: HttpScaling) -> Self {
        Self {
            max_replica_count: None,
            min_replica_count: None,
            mode: ScalingMode::HttpScaling(http),
        }
    }

    pub fn with_replicas(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.min_replica_count = min;
        self.max_replica_count = max;
        self
    }

    pub fn is_http(&self) -> bool {
        matches!(self.mode, ScalingMode::HttpScaling(_))
    }
}

/// Wire shape of [`ScalingRule`] before the single-mode check
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScalingRuleFields {
    #[serde(default)]
    max_replica_count: Option<i32>,
    #[serde(default)]
    min_replica_count: Option<i32>,
    #[serde(default)]
    custom_scaling: Option<CustomScaling>,
    #[serde(default)]
    http_scaling: Option<HttpScaling>,
}

impl TryFrom<ScalingRuleFields> for ScalingRule {
    type Error = String;

    fn try_from(fields: ScalingRuleFields) -> Result<Self, Self::Error> {
        let mode = match (fields.custom_scaling, fields.http_scaling) {
            (Some(custom), None) => ScalingMode::CustomScaling(custom),
            (None, Some(http)) => ScalingMode::HttpScaling(http),
            (Some(_), Some(_)) => {
                return Err("scalingRule sets both customScaling and httpScaling".to_string());
            }
            (None, None) => {
                return Err("scalingRule needs one of customScaling or httpScaling".to_string());
            }
        };
        Ok(Self {
            max_replica_count: fields.max_replica_count,
            min_replica_count: fields.min_replica_count,
            mode,
        })
    }
}

/// Scaling mode of a connector
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ScalingMode {
    /// KEDA ScaledObject driven by arbitrary triggers
    CustomScaling(CustomScaling),
    /// KEDA HTTP Add-on scaling on pending requests
    HttpScaling(HttpScaling),
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomScaling {
    /// Polling interval of the triggers (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval: Option<i32>,

    /// Wait period after the last active trigger before scaling to min (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_period: Option<i32>,

    pub triggers: Vec<Trigger>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpScaling {
    /// Host routed to the connector by the HTTP Add-on interceptor
    pub host: String,

    #[serde(default)]
    pub svc_type: ServiceType,

    /// Target pending requests per replica, 0 keeps the KEDA default
    #[serde(default, skip_serializing_if = "is_zero")]
    pub pending_requests: i32,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// One KEDA scale trigger
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    /// KEDA scaler type, e.g. `aws-sqs-queue`
    #[serde(rename = "type")]
    pub type_: String,

    /// Scaler metadata passed to KEDA verbatim
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Secret supplying the scaler authentication parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,
}

impl Trigger {
    pub fn new(type_: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            metadata: BTreeMap::new(),
            secret_ref: None,
        }
    }

    /// Secret name, treating an empty string as unset
    pub fn secret_name(&self) -> Option<&str> {
        self.secret_ref.as_deref().filter(|s| !s.is_empty())
    }
}

/// Kubernetes Service type used for HTTP-scaled connectors
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    LoadBalancer,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::ClusterIP => "ClusterIP",
            ServiceType::LoadBalancer => "LoadBalancer",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of the Connector
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorStatus {
    /// History of what the controller observed and did, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConnectorCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorCondition {
    /// Timestamp of this condition
    pub timestamp: String,

    /// Type of status condition
    #[serde(rename = "type")]
    pub type_: ConnectorCreationStatus,

    /// Status of the condition, one of True, False, Unknown
    pub status: ConditionStatus,

    /// One-word CamelCase reason for the condition's last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ConnectorConditionReason>,

    /// Human-readable message indicating details about last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConnectorCondition {
    /// Whether two conditions describe the same observation, ignoring the timestamp
    pub fn same_observation(&self, other: &ConnectorCondition) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum ConnectorCreationStatus {
    // The resource has been created
    Created,
    // The resource has been terminated
    Terminated,
    // The resource had an error
    Error,
    // The resource hasn't been created
    Pending,
    // The resource is marked for deletion but hasn't been deleted yet
    Terminating,
    // The status is unavailable
    Unknown,
    // The object is fully created
    Ready,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum ConnectorConditionReason {
    ErrorCreatingAppScaledObject,
    AppScaledObjectCreated,
    TerminatingResources,
    AppScaledObjectTerminated,
    AppScaledObjectTerminationError,
    PendingCreation,
    #[serde(rename = "HTTPScaledObjectIsReady")]
    HttpScaledObjectIsReady,
    DeploymentCreated,
    ErrorCreatingDeployment,
    InvalidSpec,
}

impl std::fmt::Display for ConnectorConditionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::ErrorCreatingAppScaledObject => "ErrorCreatingAppScaledObject",
            Self::AppScaledObjectCreated => "AppScaledObjectCreated",
            Self::TerminatingResources => "TerminatingResources",
            Self::AppScaledObjectTerminated => "AppScaledObjectTerminated",
            Self::AppScaledObjectTerminationError => "AppScaledObjectTerminationError",
            Self::PendingCreation => "PendingCreation",
            Self::HttpScaledObjectIsReady => "HTTPScaledObjectIsReady",
            Self::DeploymentCreated => "DeploymentCreated",
            Self::ErrorCreatingDeployment => "ErrorCreatingDeployment",
            Self::InvalidSpec => "InvalidSpec",
        };
        f.write_str(reason)
    }
}
