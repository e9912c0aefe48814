//! Test fixtures and builders for Connector resources
//!
//! ```rust,ignore
//! let connector = ConnectorBuilder::new("nginx-conn", "default")
//!     .with_image("nginx")
//!     .with_http_scaling("foo.example.com")
//!     .with_expose_port(8080)
//!     .build();
//! ```

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::core::ObjectMeta;

use connector_operator::config::ScalerConfig;
use connector_operator::crd::{
    Connector, ConnectorSpec, ConnectorType, CustomScaling, HttpScaling, LegacyScalerSpec,
    ScalingRule, ServiceType, Trigger,
};

pub const TEST_NAMESPACE: &str = "default";
pub const TEST_UID: &str = "test-uid-12345";

/// Scaler config used by the reconcile tests
///
/// `aws-sqs-queue` needs `access_key` and `secret_key`; `kafka` accepts
/// either SASL or TLS credentials; `cpu` is known but takes no Secret.
pub fn test_scaler_config() -> ScalerConfig {
    ScalerConfig::default()
        .with_trigger("aws-sqs-queue", &[&["access_key", "secret_key"]])
        .with_trigger(
            "kafka",
            &[&["sasl", "username", "password"], &["tls", "ca", "cert", "key"]],
        )
        .with_trigger("cpu", &[])
}

/// Builder for Connector test resources
pub struct ConnectorBuilder {
    name: String,
    namespace: String,
    uid: Option<String>,
    generation: Option<i64>,
    spec: ConnectorSpec,
}

impl ConnectorBuilder {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            uid: Some(TEST_UID.to_string()),
            generation: Some(1),
            spec: ConnectorSpec::default(),
        }
    }

    pub fn with_image(mut self, image: &str) -> Self {
        self.spec.image = Some(image.to_string());
        self
    }

    pub fn with_expose_port(mut self, port: i32) -> Self {
        self.spec.expose_port = Some(port);
        self
    }

    pub fn with_config_ref(mut self, name: &str) -> Self {
        self.spec.config_ref = Some(name.to_string());
        self
    }

    pub fn with_secret_ref(mut self, name: &str) -> Self {
        self.spec.secret_ref = Some(name.to_string());
        self
    }

    pub fn with_scaling_rule(mut self, rule: ScalingRule) -> Self {
        self.spec.scaling_rule = Some(rule);
        self
    }

    pub fn with_http_scaling(self, host: &str) -> Self {
        self.with_scaling_rule(ScalingRule::http(HttpScaling {
            host: host.to_string(),
            svc_type: ServiceType::ClusterIP,
            pending_requests: 0,
        }))
    }

    pub fn with_triggers(self, triggers: Vec<Trigger>) -> Self {
        self.with_scaling_rule(ScalingRule::custom(CustomScaling {
            triggers,
            ..Default::default()
        }))
    }

    pub fn with_legacy_scaler(mut self, connector_type: ConnectorType, scaler: LegacyScalerSpec) -> Self {
        self.spec.connector_type = Some(connector_type);
        self.spec.scaler_spec = Some(scaler);
        self
    }

    pub fn with_generation(mut self, generation: i64) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn without_uid(mut self) -> Self {
        self.uid = None;
        self
    }

    pub fn build(self) -> Connector {
        let mut connector = Connector::new(&self.name, self.spec);
        connector.metadata.namespace = Some(self.namespace);
        connector.metadata.uid = self.uid;
        connector.metadata.generation = self.generation;
        connector
    }
}

/// Trigger of `trigger_type`, optionally backed by a Secret
pub fn trigger(trigger_type: &str, secret_ref: Option<&str>) -> Trigger {
    let mut trigger = Trigger::new(trigger_type);
    trigger.secret_ref = secret_ref.map(str::to_string);
    trigger
}

/// Secret holding a dummy value for each of `keys`
pub fn secret_with_keys(name: &str, namespace: &str, keys: &[&str]) -> Secret {
    let data: BTreeMap<String, ByteString> = keys
        .iter()
        .map(|k| (k.to_string(), ByteString(b"value".to_vec())))
        .collect();

    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

pub fn config_map(name: &str, namespace: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            "config.json".to_string(),
            "{}".to_string(),
        )])),
        ..Default::default()
    }
}
