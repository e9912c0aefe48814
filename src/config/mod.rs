//! Operator configuration read at startup

mod scaler;

pub use scaler::{LOCAL_CONFIG_PATH, MOUNTED_CONFIG_PATH, SOURCE_TREE_CONFIG_PATH, ScalerConfig};

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// Default listen address of the health and metrics server
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8080";

/// Errors loading operator configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Process settings taken from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Namespace to watch, `None` watches the whole cluster
    pub watch_namespace: Option<String>,
    /// Explicit scaler config file, tried before the default locations
    pub scaler_config_path: Option<PathBuf>,
    /// Identity used for leader election
    pub pod_name: String,
    /// Namespace holding the leader election Lease
    pub pod_namespace: String,
    pub health_addr: SocketAddr,
    /// Delete autoscaling objects the current spec no longer asks for
    pub prune_stale_resources: bool,
}

impl OperatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let pod_name = var("POD_NAME").unwrap_or_else(|| {
            warn!("POD_NAME not set, using hostname");
            hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string())
        });
        let pod_namespace = var("POD_NAMESPACE").unwrap_or_else(|| {
            warn!("POD_NAMESPACE not set, using 'default'");
            "default".to_string()
        });

        let health_addr = var("HEALTH_ADDR").unwrap_or_else(|| DEFAULT_HEALTH_ADDR.to_string());
        let health_addr = health_addr
            .parse()
            .map_err(|_| ConfigError::InvalidEnv {
                name: "HEALTH_ADDR",
                value: health_addr.clone(),
            })?;

        let prune_stale_resources = match var("PRUNE_STALE_RESOURCES") {
            None => true,
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidEnv {
                name: "PRUNE_STALE_RESOURCES",
                value,
            })?,
        };

        Ok(Self {
            watch_namespace: var("WATCH_NAMESPACE"),
            scaler_config_path: var("SCALER_CONFIG_PATH").map(PathBuf::from),
            pod_name,
            pod_namespace,
            health_addr,
            prune_stale_resources,
        })
    }

    /// Load the scaler configuration from the configured or default locations
    pub fn load_scaler_config(&self) -> Result<ScalerConfig, ConfigError> {
        ScalerConfig::load(&ScalerConfig::candidate_paths(
            self.scaler_config_path.as_deref(),
        ))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
