//! Validation of Connector specs and scaler Secrets
//!
//! Secrets are checked against the alternative key-sets configured for a
//! trigger type. The first alternative fully present in the Secret wins, in
//! configuration order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use k8s_openapi::api::core::v1::Secret;

use crate::controller::error::{Error, Result};
use crate::crd::{Connector, ScalingMode};

/// Highest valid TCP port
const MAX_PORT: i32 = 65535;

/// Anything that can answer whether it holds a key
pub trait KeySet {
    fn contains_key(&self, key: &str) -> bool;
}

impl<V> KeySet for BTreeMap<String, V> {
    fn contains_key(&self, key: &str) -> bool {
        BTreeMap::contains_key(self, key)
    }
}

impl<V> KeySet for HashMap<String, V> {
    fn contains_key(&self, key: &str) -> bool {
        HashMap::contains_key(self, key)
    }
}

impl KeySet for BTreeSet<String> {
    fn contains_key(&self, key: &str) -> bool {
        self.contains(key)
    }
}

impl KeySet for Secret {
    fn contains_key(&self, key: &str) -> bool {
        self.data.as_ref().is_some_and(|d| d.contains_key(key))
            || self.string_data.as_ref().is_some_and(|d| d.contains_key(key))
    }
}

/// First alternative whose keys are all present
pub fn matching_key_set<'a, K: KeySet + ?Sized>(
    keys: &K,
    alternatives: &'a [Vec<String>],
) -> Option<&'a [String]> {
    alternatives
        .iter()
        .find(|set| set.iter().all(|key| keys.contains_key(key)))
        .map(Vec::as_slice)
}

pub fn is_valid_secret<K: KeySet + ?Sized>(keys: &K, alternatives: &[Vec<String>]) -> bool {
    matching_key_set(keys, alternatives).is_some()
}

/// Keys missing from the alternative that comes closest to matching
///
/// Ties go to the earlier alternative. Empty when nothing is configured.
pub fn closest_missing_keys<K: KeySet + ?Sized>(
    keys: &K,
    alternatives: &[Vec<String>],
) -> Vec<String> {
    alternatives
        .iter()
        .map(|set| {
            set.iter()
                .filter(|key| !keys.contains_key(key))
                .cloned()
                .collect::<Vec<_>>()
        })
        .min_by_key(Vec::len)
        .unwrap_or_default()
}

/// Validate a Connector before any object is written
pub fn validate_connector(connector: &Connector) -> Result<()> {
    let spec = &connector.spec;

    let has_image = spec.image.as_deref().is_some_and(|i| !i.trim().is_empty());
    if !has_image && spec.containers.is_empty() {
        return Err(Error::ValidationError(
            "either image or containers must be set".to_string(),
        ));
    }

    let port = spec.effective_expose_port();
    if let Some(port) = port.filter(|p| !(1..=MAX_PORT).contains(p)) {
        return Err(Error::ValidationError(format!(
            "exposePort {port} must be between 1 and {MAX_PORT}"
        )));
    }

    let Some(rule) = spec.effective_scaling()? else {
        return Ok(());
    };

    if let Some(min) = rule.min_replica_count.filter(|m| *m < 0) {
        return Err(Error::ValidationError(format!(
            "minReplicaCount {min} must not be negative"
        )));
    }
    if let (Some(min), Some(max)) = (rule.min_replica_count, rule.max_replica_count) {
        if min > max {
            return Err(Error::ValidationError(format!(
                "minReplicaCount {min} exceeds maxReplicaCount {max}"
            )));
        }
    }

    match &rule.mode {
        ScalingMode::HttpScaling(http) => {
            if port.is_none() {
                return Err(Error::ValidationError(
                    "httpScaling requires exposePort".to_string(),
                ));
            }
            if http.host.trim().is_empty() {
                return Err(Error::ValidationError(
                    "httpScaling requires a host".to_string(),
                ));
            }
        }
        ScalingMode::CustomScaling(custom) => {
            if custom.triggers.is_empty() {
                return Err(Error::ValidationError(
                    "customScaling requires at least one trigger".to_string(),
                ));
            }
            if let Some(index) = custom.triggers.iter().position(|t| t.type_.trim().is_empty()) {
                return Err(Error::ValidationError(format!(
                    "trigger {index} has an empty type"
                )));
            }
        }
    }

    Ok(())
}
