pub mod apply;
pub mod autoscaling;
pub mod context;
pub mod error;
pub mod prune;
pub mod reconciler;
pub mod status;
pub mod store;
pub mod validation;
pub mod workload;

pub use apply::{Applied, create_or_patch};
pub use context::Context;
pub use error::{BackoffConfig, Error, Result};
pub use reconciler::{RESYNC_INTERVAL, error_policy, reconcile, reconcile_connector};
pub use status::{ConditionBuilder, MAX_CONDITIONS, StatusManager};
pub use store::{KubeStore, ObjectStore};
pub use validation::{
    KeySet, closest_missing_keys, is_valid_secret, matching_key_set, validate_connector,
};
