//! Deployment generation for connector workloads

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, PodSpec, PodTemplateSpec,
    SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::ResourceExt;
use kube::core::ObjectMeta;

use crate::crd::Connector;
use crate::resources::common::{owner_reference, selector_labels, standard_labels};

/// Mount path of the connector ConfigMap
pub const CONFIG_MOUNT_PATH: &str = "/vance/config";
/// Mount path of the connector Secret
pub const SECRET_MOUNT_PATH: &str = "/vance/secret";

const CONFIG_VOLUME: &str = "config";
const SECRET_VOLUME: &str = "secret";

/// Generate the Deployment running a connector
///
/// Explicit `containers` are used as given; otherwise a single container is
/// built from `image`. The replica count is left to KEDA whenever the
/// connector asks for autoscaling.
pub fn generate_deployment(connector: &Connector) -> Deployment {
    let name = connector.name_any();
    let ns = connector.namespace();
    let spec = &connector.spec;

    let mut containers = if spec.containers.is_empty() {
        vec![default_container(connector)]
    } else {
        spec.containers.clone()
    };

    let mut volumes = Vec::new();
    let mut mounts = Vec::new();

    if let Some(config_ref) = spec.config_ref.as_deref().filter(|s| !s.is_empty()) {
        volumes.push(Volume {
            name: CONFIG_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_ref.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name: CONFIG_VOLUME.to_string(),
            mount_path: CONFIG_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        });
    }

    if let Some(secret_ref) = spec.secret_ref.as_deref().filter(|s| !s.is_empty()) {
        volumes.push(Volume {
            name: SECRET_VOLUME.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(secret_ref.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name: SECRET_VOLUME.to_string(),
            mount_path: SECRET_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        });
    }

    if let Some(first) = containers.first_mut() {
        let existing = first.volume_mounts.get_or_insert_with(Vec::new);
        for mount in mounts {
            if !existing.iter().any(|m| m.name == mount.name) {
                existing.push(mount);
            }
        }
        if existing.is_empty() {
            first.volume_mounts = None;
        }
    }

    let mut pod_labels = standard_labels(&name);
    pod_labels.extend(selector_labels(&name));

    let replicas = if spec.wants_autoscaling() {
        None
    } else {
        Some(1)
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: ns,
            labels: Some(standard_labels(&name)),
            owner_references: Some(vec![owner_reference(connector)]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas,
            selector: LabelSelector {
                match_labels: Some(selector_labels(&name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(pod_labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers,
                    // An empty list replaces volumes left by removed refs
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn default_container(connector: &Connector) -> Container {
    let ports = connector.spec.effective_expose_port().map(|port| {
        vec![ContainerPort {
            name: Some("http".to_string()),
            container_port: port,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]
    });

    Container {
        name: connector.name_any(),
        image: connector.spec.image.clone(),
        image_pull_policy: Some("IfNotPresent".to_string()),
        ports,
        ..Default::default()
    }
}
