//! Errors raised while reconciling a Connector

use std::time::Duration;

use thiserror::Error;

use crate::crd::ConversionError;

/// Error variants are named with the `Error` suffix where they wrap a lower layer.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing object key: {0}")]
    MissingObjectKey(&'static str),

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: String, name: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unknown trigger type {0:?}: no scaler auth configured")]
    UnknownTriggerType(String),

    #[error("secret {secret} misses required field for trigger {trigger_type}: {missing:?}")]
    SecretMissingRequiredKeys {
        secret: String,
        trigger_type: String,
        missing: Vec<String>,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid legacy scaler spec: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Transient error (will retry): {0}")]
    TransientError(String),
}

impl Error {
    /// Whether another attempt can succeed without the user changing anything
    ///
    /// API rejections in the 4xx range only clear on retry when they are
    /// conflicts (409) or throttling (429).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::KubeError(kube::Error::Api(response)) => {
                !(400..500).contains(&response.code) || matches!(response.code, 409 | 429)
            }
            Error::KubeError(_) | Error::TransientError(_) | Error::AlreadyExists { .. } => true,
            // A referenced Secret or ConfigMap may still be created
            Error::NotFound(_) => true,
            Error::UnknownTriggerType(_)
            | Error::SecretMissingRequiredKeys { .. }
            | Error::ValidationError(_)
            | Error::Conversion(_)
            | Error::SerializationError(_)
            | Error::MissingObjectKey(_) => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Requeue delays after a failed pass
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Ceiling for every delay, also used for errors that need a spec change
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of the delay applied as symmetric random jitter
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl BackoffConfig {
    /// `initial_delay * multiplier^attempt`, jittered and capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // powi overflows to infinity long before u32::MAX
        let exponent = attempt.min(30) as i32;
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        let spread = base * self.jitter;
        let offset = (rand::random::<f64>() * 2.0 - 1.0) * spread;

        let secs = (base + offset)
            .max(0.0)
            .min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    pub fn delay_for_error(&self, error: &Error, attempt: u32) -> Duration {
        if error.is_retryable() {
            self.delay_for_attempt(attempt)
        } else {
            self.max_delay
        }
    }
}
