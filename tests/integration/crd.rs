//! CRD installation helpers for integration tests

use std::time::Duration;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Patch, PatchParams};
use kube::runtime::wait::{await_condition, conditions};
use kube::{Api, Client, CustomResourceExt};
use thiserror::Error;

use connector_operator::Connector;

const CRD_NAME: &str = "connectors.vance.io";

#[derive(Error, Debug)]
pub enum CrdError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("CRD establishment timeout")]
    EstablishmentTimeout,

    #[error("Wait error: {0}")]
    WaitError(#[from] kube::runtime::wait::Error),
}

/// Install the Connector CRD and wait until it is established
pub async fn install_crd(client: Client) -> Result<(), CrdError> {
    let crds: Api<CustomResourceDefinition> = Api::all(client);
    let params = PatchParams::apply("integration-test").force();

    crds.patch(CRD_NAME, &params, &Patch::Apply(&Connector::crd()))
        .await?;

    let establish = await_condition(crds, CRD_NAME, conditions::is_crd_established());
    tokio::time::timeout(Duration::from_secs(30), establish)
        .await
        .map_err(|_| CrdError::EstablishmentTimeout)??;

    tracing::info!("Connector CRD installed and established");
    Ok(())
}

/// Whether the KEDA ScaledObject CRD is present
pub async fn keda_installed(client: Client) -> bool {
    let crds: Api<CustomResourceDefinition> = Api::all(client);
    matches!(crds.get_opt("scaledobjects.keda.sh").await, Ok(Some(_)))
}
