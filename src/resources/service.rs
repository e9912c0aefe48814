//! Service generation for HTTP-scaled connectors
//!
//! The KEDA HTTP Add-on interceptor forwards requests to this Service once the
//! connector has been woken up.

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use kube::core::ObjectMeta;

use crate::crd::{Connector, ServiceType};
use crate::resources::common::{owner_reference, selector_labels, standard_labels};

/// Generate the Service in front of a connector's pods
pub fn generate_service(connector: &Connector, port: i32, service_type: ServiceType) -> Service {
    let name = connector.name_any();

    Service {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: connector.namespace(),
            labels: Some(standard_labels(&name)),
            owner_references: Some(vec![owner_reference(connector)]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(&name)),
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                port,
                target_port: Some(IntOrString::Int(port)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            type_: Some(service_type.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
