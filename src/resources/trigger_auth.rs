//! KEDA TriggerAuthentication generation
//!
//! Each secret-backed trigger gets one TriggerAuthentication mapping every
//! required Secret key to the scaler parameter of the same name.

use kube::api::DynamicObject;
use serde::{Deserialize, Serialize};

use crate::crd::Connector;
use crate::resources::common::{ResourceKind, keda_object};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerAuthenticationSpec {
    pub secret_target_ref: Vec<SecretTargetRef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SecretTargetRef {
    /// Scaler parameter receiving the value
    pub parameter: String,
    /// Secret name
    pub name: String,
    /// Key within the Secret
    pub key: String,
}

/// Generate a TriggerAuthentication exposing `keys` of `secret_name`
pub fn generate_trigger_auth(
    connector: &Connector,
    name: &str,
    secret_name: &str,
    keys: &[String],
) -> DynamicObject {
    let spec = TriggerAuthenticationSpec {
        secret_target_ref: keys
            .iter()
            .map(|key| SecretTargetRef {
                parameter: key.clone(),
                name: secret_name.to_string(),
                key: key.clone(),
            })
            .collect(),
    };

    keda_object(connector, ResourceKind::TriggerAuthentication, name, &spec)
}
