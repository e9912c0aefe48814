//! First-revision scaler fields of the Connector API
//!
//! Older Connectors declare a `type` and a single `scalerSpec` whose metadata
//! mixes scaler parameters with controller settings (`secret`, `svcPort`,
//! `host`, ...). They are converted into a [`ScalingRule`] so that a single
//! reconciler serves both API shapes.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::connector::{CustomScaling, HttpScaling, ScalingRule, ServiceType, Trigger};

/// Metadata key naming the scaler Secret
const SECRET_KEY: &str = "secret";

/// Metadata keys consumed by the HTTP conversion
const HOST_KEY: &str = "host";
const MIN_REPLICA_KEY: &str = "minReplica";
const MAX_REPLICA_KEY: &str = "maxReplica";
const PENDING_REQUESTS_KEY: &str = "pendingRequests";

/// Error converting legacy scaler fields
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("missing required field <{0}>")]
    MissingField(&'static str),

    #[error("field <{field}> has invalid value {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// Connector type of the first API revision
#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorType {
    Http,
    Activemq,
    ArtemisQueue,
    Kafka,
    AwsCloudwatch,
    AwsKinesisStream,
    AwsSqsQueue,
    AzureAppInsights,
    Rabbitmq,
    Mysql,
}

impl ConnectorType {
    /// KEDA scaler type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorType::Http => "http",
            ConnectorType::Activemq => "activemq",
            ConnectorType::ArtemisQueue => "artemis-queue",
            ConnectorType::Kafka => "kafka",
            ConnectorType::AwsCloudwatch => "aws-cloudwatch",
            ConnectorType::AwsKinesisStream => "aws-kinesis-stream",
            ConnectorType::AwsSqsQueue => "aws-sqs-queue",
            ConnectorType::AzureAppInsights => "azure-app-insights",
            ConnectorType::Rabbitmq => "rabbitmq",
            ConnectorType::Mysql => "mysql",
        }
    }
}

impl std::fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single scaler of the first API revision
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyScalerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_period: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replica_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replica_count: Option<i32>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[schemars(schema_with = "int_or_string_map_schema")]
    pub metadata: BTreeMap<String, IntOrString>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler_secret: Option<String>,
}

fn int_or_string_map_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "additionalProperties": {
            "x-kubernetes-int-or-string": true
        }
    })
}

impl LegacyScalerSpec {
    /// Metadata value as a string, integers rendered in decimal
    pub fn string_value(&self, key: &str) -> Option<String> {
        self.metadata.get(key).map(render).filter(|v| !v.is_empty())
    }

    /// Metadata value as an integer, accepting numeric strings
    pub fn int_value(&self, key: &str) -> Option<i32> {
        match self.metadata.get(key)? {
            IntOrString::Int(value) => Some(*value),
            IntOrString::String(value) => value.trim().parse().ok(),
        }
    }

    /// Convert into the scaling rule of the current API
    pub fn to_scaling_rule(
        &self,
        connector_type: &ConnectorType,
    ) -> Result<ScalingRule, ConversionError> {
        match connector_type {
            ConnectorType::Http => self.to_http_rule(),
            other => Ok(self.to_custom_rule(other)),
        }
    }

    fn to_http_rule(&self) -> Result<ScalingRule, ConversionError> {
        let host = self
            .string_value(HOST_KEY)
            .ok_or(ConversionError::MissingField(HOST_KEY))?;

        let pending_requests = match self.metadata.get(PENDING_REQUESTS_KEY) {
            None => 0,
            Some(raw) => self
                .int_value(PENDING_REQUESTS_KEY)
                .ok_or_else(|| ConversionError::InvalidValue {
                    field: PENDING_REQUESTS_KEY,
                    value: render(raw),
                })?,
        };

        let min = non_zero(self.int_value(MIN_REPLICA_KEY)).or(self.min_replica_count);
        let max = non_zero(self.int_value(MAX_REPLICA_KEY)).or(self.max_replica_count);

        Ok(ScalingRule::http(HttpScaling {
            host,
            svc_type: ServiceType::LoadBalancer,
            pending_requests,
        })
        .with_replicas(min, max))
    }

    fn to_custom_rule(&self, connector_type: &ConnectorType) -> ScalingRule {
        let metadata = self
            .metadata
            .iter()
            .filter(|(key, _)| key.as_str() != SECRET_KEY)
            .map(|(key, value)| (key.clone(), render(value)))
            .collect();

        let secret_ref = self
            .string_value(SECRET_KEY)
            .or_else(|| self.scaler_secret.clone().filter(|s| !s.is_empty()));

        let trigger = Trigger {
            type_: connector_type.as_str().to_string(),
            metadata,
            secret_ref,
        };

        ScalingRule::custom(CustomScaling {
            check_interval: self.check_interval,
            cooldown_period: self.cooldown_period,
            triggers: vec![trigger],
        })
        .with_replicas(self.min_replica_count, self.max_replica_count)
    }
}

fn render(value: &IntOrString) -> String {
    match value {
        IntOrString::Int(value) => value.to_string(),
        IntOrString::String(value) => value.clone(),
    }
}

fn non_zero(value: Option<i32>) -> Option<i32> {
    value.filter(|v| *v != 0)
}
