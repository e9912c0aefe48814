//! Scaler authentication configuration
//!
//! Maps `"<triggerType>-auth"` to the alternative sets of Secret keys that can
//! authenticate a KEDA scaler of that type, for example:
//!
//! ```json
//! {
//!   "aws-sqs-queue-auth": [["awsAccessKeyID", "awsSecretAccessKey"], ["awsRoleArn"]]
//! }
//! ```
//!
//! Loaded once at startup and shared read-only with the reconciler. Both
//! `pkg/config/scale_config.json` and `config/scale_config.json` are looked up
//! relative to the working directory, in that order, before the mounted path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use super::ConfigError;

/// Source-tree location used by existing deployments, relative to the working directory
pub const SOURCE_TREE_CONFIG_PATH: &str = "pkg/config/scale_config.json";

/// Path of the bundled configuration, relative to the working directory
pub const LOCAL_CONFIG_PATH: &str = "config/scale_config.json";

/// Path of the configuration mounted from a ConfigMap in-cluster
pub const MOUNTED_CONFIG_PATH: &str = "/config/scale_config.json";

/// Suffix appended to a trigger type to form its configuration key
const AUTH_SUFFIX: &str = "-auth";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ScalerConfig {
    auth: BTreeMap<String, Vec<Vec<String>>>,
}

impl ScalerConfig {
    pub fn new(auth: BTreeMap<String, Vec<Vec<String>>>) -> Self {
        Self { auth }
    }

    /// Register the key-set alternatives for a trigger type
    pub fn with_trigger(mut self, trigger_type: &str, key_sets: &[&[&str]]) -> Self {
        let key_sets = key_sets
            .iter()
            .map(|set| set.iter().map(|k| k.to_string()).collect())
            .collect();
        self.auth.insert(auth_key(trigger_type), key_sets);
        self
    }

    /// Candidate file locations in lookup order
    pub fn candidate_paths(override_path: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(4);
        if let Some(path) = override_path {
            paths.push(path.to_path_buf());
        }
        paths.push(PathBuf::from(SOURCE_TREE_CONFIG_PATH));
        paths.push(PathBuf::from(LOCAL_CONFIG_PATH));
        paths.push(PathBuf::from(MOUNTED_CONFIG_PATH));
        paths
    }

    /// Load the first candidate file that exists.
    ///
    /// No existing file yields an empty configuration; a file that exists but
    /// cannot be read or parsed is an error.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, ConfigError> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if !path.exists() {
                continue;
            }

            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let config = Self::from_json(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

            info!(
                path = %path.display(),
                trigger_types = config.auth.len(),
                "Loaded scaler config"
            );
            return Ok(config);
        }

        warn!(
            candidates = ?candidates.iter().map(|p| p.as_ref().display().to_string()).collect::<Vec<_>>(),
            "No scaler config found, triggers with secrets will fail validation"
        );
        Ok(Self::default())
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Alternative key-sets for a trigger type, `None` when the type is unknown
    pub fn auth_key_sets(&self, trigger_type: &str) -> Option<&[Vec<String>]> {
        self.auth.get(&auth_key(trigger_type)).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.auth.is_empty()
    }
}

fn auth_key(trigger_type: &str) -> String {
    format!("{trigger_type}{AUTH_SUFFIX}")
}
