//! Wait helpers for objects derived from Connectors

use std::fmt::Debug;
use std::time::Duration;

use kube::Api;
use kube::runtime::wait::{Condition, await_condition};
use serde::de::DeserializeOwned;
use thiserror::Error;

use connector_operator::crd::{Connector, ConnectorConditionReason};

#[derive(Error, Debug)]
pub enum WaitError {
    #[error("Timeout waiting for condition")]
    Timeout,

    #[error("Watch error: {0}")]
    Watch(#[from] kube::runtime::wait::Error),
}

/// Condition that checks the latest status condition's reason
pub fn has_latest_reason(expected: ConnectorConditionReason) -> impl Condition<Connector> {
    move |obj: Option<&Connector>| {
        obj.and_then(|c| c.status.as_ref())
            .and_then(|s| s.conditions.last())
            .is_some_and(|c| c.reason == Some(expected))
    }
}

/// Wait until `name` satisfies `condition`
pub async fn wait_for<K, C>(
    api: Api<K>,
    name: &str,
    condition: C,
    timeout: Duration,
) -> Result<(), WaitError>
where
    K: kube::Resource + Clone + DeserializeOwned + Debug + Send + 'static,
    C: Condition<K>,
{
    tokio::time::timeout(timeout, await_condition(api, name, condition))
        .await
        .map_err(|_| WaitError::Timeout)??;
    Ok(())
}

/// Condition that is true once the object exists
pub fn exists<K>() -> impl Condition<K> {
    |obj: Option<&K>| obj.is_some()
}
