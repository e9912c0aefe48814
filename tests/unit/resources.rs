//! Unit tests for resource generators

use k8s_openapi::api::core::v1::{Container, VolumeMount};

use connector_operator::crd::{CustomScaling, HttpScaling, ScalingRule, ServiceType};
use connector_operator::resources::common::{
    ResourceKind, connector_selector, owner_reference, selector_labels, standard_labels,
    trigger_auth_name,
};
use connector_operator::resources::deployment::{
    CONFIG_MOUNT_PATH, SECRET_MOUNT_PATH, generate_deployment,
};
use connector_operator::resources::http_scaled_object::generate_http_scaled_object;
use connector_operator::resources::scaled_object::{ScaleTrigger, generate_scaled_object};
use connector_operator::resources::service::generate_service;
use connector_operator::resources::trigger_auth::generate_trigger_auth;

use crate::common::*;

mod deployment_tests {
    use super::*;

    #[test]
    fn test_selector_matches_pod_labels() {
        let connector = ConnectorBuilder::new("nginx-conn", TEST_NAMESPACE)
            .with_image("nginx")
            .build();
        let spec = generate_deployment(&connector).spec.unwrap();

        let selector = spec.selector.match_labels.unwrap();
        let pod_labels = spec.template.metadata.unwrap().labels.unwrap();
        for (k, v) in &selector {
            assert_eq!(pod_labels.get(k), Some(v));
        }
        assert_eq!(selector, selector_labels("nginx-conn"));
    }

    #[test]
    fn test_fixed_replicas_without_autoscaling() {
        let connector = ConnectorBuilder::new("nginx-conn", TEST_NAMESPACE)
            .with_image("nginx")
            .build();
        assert_eq!(generate_deployment(&connector).spec.unwrap().replicas, Some(1));

        let scaled = ConnectorBuilder::new("nginx-conn", TEST_NAMESPACE)
            .with_image("nginx")
            .with_triggers(vec![trigger("cpu", None)])
            .build();
        assert_eq!(generate_deployment(&scaled).spec.unwrap().replicas, None);
    }

    #[test]
    fn test_explicit_containers_win_over_image() {
        let mut connector = ConnectorBuilder::new("sidecar", TEST_NAMESPACE)
            .with_image("ignored")
            .build();
        connector.spec.containers = vec![
            Container {
                name: "main".to_string(),
                image: Some("vance/main".to_string()),
                ..Default::default()
            },
            Container {
                name: "proxy".to_string(),
                image: Some("envoy".to_string()),
                ..Default::default()
            },
        ];

        let pod = generate_deployment(&connector)
            .spec
            .unwrap()
            .template
            .spec
            .unwrap();
        let images: Vec<_> = pod
            .containers
            .iter()
            .map(|c| c.image.as_deref().unwrap())
            .collect();
        assert_eq!(images, vec!["vance/main", "envoy"]);
    }

    #[test]
    fn test_config_and_secret_mounts() {
        let connector = ConnectorBuilder::new("mounted", TEST_NAMESPACE)
            .with_image("vance/source")
            .with_config_ref("mounted-config")
            .with_secret_ref("mounted-secret")
            .build();

        let pod = generate_deployment(&connector)
            .spec
            .unwrap()
            .template
            .spec
            .unwrap();

        let volumes = pod.volumes.unwrap();
        assert_eq!(volumes.len(), 2);
        assert!(volumes.iter().any(|v| v
            .config_map
            .as_ref()
            .is_some_and(|c| c.name == "mounted-config")));
        assert!(volumes.iter().any(|v| v
            .secret
            .as_ref()
            .is_some_and(|s| s.secret_name.as_deref() == Some("mounted-secret"))));

        let mounts = pod.containers[0].volume_mounts.clone().unwrap();
        let paths: Vec<_> = mounts.iter().map(|m| m.mount_path.as_str()).collect();
        assert_eq!(paths, vec![CONFIG_MOUNT_PATH, SECRET_MOUNT_PATH]);
    }

    #[test]
    fn test_existing_mount_is_not_duplicated() {
        let mut connector = ConnectorBuilder::new("mounted", TEST_NAMESPACE)
            .with_config_ref("mounted-config")
            .build();
        connector.spec.containers = vec![Container {
            name: "main".to_string(),
            image: Some("vance/main".to_string()),
            volume_mounts: Some(vec![VolumeMount {
                name: "config".to_string(),
                mount_path: "/etc/custom".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }];

        let pod = generate_deployment(&connector)
            .spec
            .unwrap()
            .template
            .spec
            .unwrap();
        let mounts = pod.containers[0].volume_mounts.clone().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].mount_path, "/etc/custom");
    }
}

mod service_tests {
    use super::*;

    #[test]
    fn test_service_selects_deployment_pods() {
        let connector = ConnectorBuilder::new("web", TEST_NAMESPACE)
            .with_image("vance/source-http")
            .build();
        let deployment = generate_deployment(&connector);
        let service = generate_service(&connector, 8080, ServiceType::LoadBalancer);

        assert_eq!(
            service.spec.as_ref().unwrap().selector,
            deployment.spec.unwrap().selector.match_labels
        );
        assert_eq!(
            service.spec.unwrap().type_.as_deref(),
            Some("LoadBalancer")
        );
    }
}

mod keda_tests {
    use super::*;

    #[test]
    fn test_http_scaled_object_replica_overrides() {
        let connector = ConnectorBuilder::new("web", TEST_NAMESPACE)
            .with_image("vance/source-http")
            .build();
        let http = HttpScaling {
            host: "web.example.com".to_string(),
            svc_type: ServiceType::ClusterIP,
            pending_requests: 50,
        };
        let rule = ScalingRule::http(http.clone()).with_replicas(Some(1), Some(4));

        let obj = generate_http_scaled_object(&connector, &rule, &http, 8080);
        assert_eq!(obj.metadata.name.as_deref(), Some("web-vhso"));
        assert_eq!(obj.data["spec"]["replicas"]["min"], 1);
        assert_eq!(obj.data["spec"]["replicas"]["max"], 4);
        assert_eq!(obj.data["spec"]["targetPendingRequests"], 50);
    }

    #[test]
    fn test_scaled_object_carries_every_trigger() {
        let connector = ConnectorBuilder::new("sink", TEST_NAMESPACE)
            .with_image("vance/sink")
            .build();
        let custom = CustomScaling {
            check_interval: Some(15),
            cooldown_period: Some(120),
            triggers: vec![trigger("cpu", None), trigger("aws-sqs-queue", Some("creds"))],
        };
        let rule = ScalingRule::custom(custom.clone()).with_replicas(Some(0), Some(20));
        let triggers = vec![
            ScaleTrigger::from_trigger(&custom.triggers[0], None),
            ScaleTrigger::from_trigger(&custom.triggers[1], Some(trigger_auth_name("sink", 0))),
        ];

        let obj = generate_scaled_object(&connector, &rule, &custom, triggers);
        let spec = &obj.data["spec"];
        assert_eq!(spec["pollingInterval"], 15);
        assert_eq!(spec["cooldownPeriod"], 120);
        assert_eq!(spec["minReplicaCount"], 0);
        assert_eq!(spec["maxReplicaCount"], 20);
        assert_eq!(spec["triggers"].as_array().unwrap().len(), 2);
        assert_eq!(spec["triggers"][1]["authenticationRef"]["name"], "sink-vta");
    }

    #[test]
    fn test_keda_objects_share_labels_and_owner() {
        let connector = ConnectorBuilder::new("sink", TEST_NAMESPACE)
            .with_image("vance/sink")
            .build();
        let ta = generate_trigger_auth(
            &connector,
            &trigger_auth_name("sink", 2),
            "creds",
            &["token".to_string()],
        );

        assert_eq!(ta.metadata.name.as_deref(), Some("sink-vta-2"));
        assert_eq!(ta.metadata.labels, Some(standard_labels("sink")));
        assert_eq!(
            ta.metadata.owner_references,
            Some(vec![owner_reference(&connector)])
        );

        let types = ta.types.unwrap();
        assert_eq!(types.api_version, "keda.sh/v1alpha1");
        assert_eq!(types.kind, "TriggerAuthentication");
    }

    #[test]
    fn test_prunable_kinds_exclude_deployment() {
        assert!(!ResourceKind::PRUNABLE.contains(&ResourceKind::Deployment));
        assert_eq!(connector_selector("sink"), "vance.io/connector=sink");
    }
}
