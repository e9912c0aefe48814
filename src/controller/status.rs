//! Status history for Connector resources
//!
//! Each terminal reconcile outcome appends a [`ConnectorCondition`], unless
//! it repeats the latest entry. The history is capped and drops the oldest
//! entries first.

use chrono::Utc;
use kube::ResourceExt;
use tracing::{debug, warn};

use crate::controller::Context;
use crate::controller::error::{Error, Result};
use crate::crd::{
    ConditionStatus, Connector, ConnectorCondition, ConnectorConditionReason,
    ConnectorCreationStatus, ConnectorStatus,
};
use crate::resources::common::connector_resource;

/// Maximum number of conditions kept in the history
pub const MAX_CONDITIONS: usize = 16;

/// Step of the reconcile that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    Validate,
    Deployment,
    Autoscaling,
}

/// Create a condition stamped with the current time
pub fn condition(
    type_: ConnectorCreationStatus,
    status: ConditionStatus,
    reason: ConnectorConditionReason,
    message: impl Into<String>,
) -> ConnectorCondition {
    ConnectorCondition {
        timestamp: Utc::now().to_rfc3339(),
        type_,
        status,
        reason: Some(reason),
        message: Some(message.into()),
    }
}

/// Condition recorded for a failed reconcile
pub fn failure_condition(stage: ReconcileStage, error: &Error) -> ConnectorCondition {
    let reason = match stage {
        ReconcileStage::Validate => ConnectorConditionReason::InvalidSpec,
        ReconcileStage::Deployment => ConnectorConditionReason::ErrorCreatingDeployment,
        ReconcileStage::Autoscaling => ConnectorConditionReason::ErrorCreatingAppScaledObject,
    };
    condition(
        ConnectorCreationStatus::Error,
        ConditionStatus::False,
        reason,
        error.to_string(),
    )
}

/// Builder for the append-only condition history
pub struct ConditionBuilder {
    conditions: Vec<ConnectorCondition>,
}

impl ConditionBuilder {
    pub fn from_existing(existing: Vec<ConnectorCondition>) -> Self {
        Self {
            conditions: existing,
        }
    }

    /// Append a condition unless it repeats the latest one; returns whether it was added
    pub fn push(&mut self, condition: ConnectorCondition) -> bool {
        if self
            .conditions
            .last()
            .is_some_and(|last| last.same_observation(&condition))
        {
            return false;
        }

        self.conditions.push(condition);
        if self.conditions.len() > MAX_CONDITIONS {
            let excess = self.conditions.len() - MAX_CONDITIONS;
            self.conditions.drain(..excess);
        }
        true
    }

    pub fn build(self) -> Vec<ConnectorCondition> {
        self.conditions
    }
}

/// Status manager for Connector resources
pub struct StatusManager<'a> {
    connector: &'a Connector,
    ctx: &'a Context,
    ns: &'a str,
}

impl<'a> StatusManager<'a> {
    pub fn new(connector: &'a Connector, ctx: &'a Context, ns: &'a str) -> Self {
        Self { connector, ctx, ns }
    }

    /// Append a condition and write the status if anything changed
    pub async fn record(&self, condition: ConnectorCondition) -> Result<bool> {
        let current = self.connector.status.clone().unwrap_or_default();
        let generation = self.connector.metadata.generation;

        let mut builder = ConditionBuilder::from_existing(current.conditions);
        let appended = builder.push(condition);
        if !appended && current.observed_generation == generation {
            debug!("Status unchanged");
            return Ok(false);
        }

        let status = ConnectorStatus {
            conditions: builder.build(),
            observed_generation: generation,
        };
        let patch = serde_json::json!({ "status": status });

        self.ctx
            .store
            .merge_patch_status(
                &connector_resource(),
                self.ns,
                &self.connector.name_any(),
                &patch,
            )
            .await?;
        Ok(true)
    }

    /// Like [`record`](Self::record), logging instead of failing
    pub async fn record_best_effort(&self, condition: ConnectorCondition) {
        if let Err(e) = self.record(condition).await {
            warn!(error = %e, "Failed to update Connector status");
        }
    }
}
