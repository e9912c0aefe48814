// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for Secret validation and derived object naming
//!
//! These tests use proptest to generate random key-set configurations and
//! connector names and verify that:
//! 1. Key-set matching picks the first fully present alternative
//! 2. A Secret with a superset of a matching Secret's keys still matches
//! 3. Derived object names are fixed by the connector name and never collide
//! 4. Validation never panics on arbitrary replica bounds and ports

use std::collections::BTreeSet;

use proptest::prelude::*;

use connector_operator::controller::validation::{
    closest_missing_keys, matching_key_set, validate_connector,
};
use connector_operator::crd::{Connector, ConnectorSpec, HttpScaling, ScalingRule, ServiceType};
use connector_operator::resources::common::{ResourceKind, trigger_auth_name};

fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]).prop_map(str::to_string)
}

fn key_sets_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(key_strategy(), 1..4), 0..5)
}

fn secret_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(key_strategy(), 0..6)
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,30}[a-z0-9]"
}

proptest! {
    #[test]
    fn matching_key_set_is_first_complete_alternative(
        alternatives in key_sets_strategy(),
        secret in secret_strategy(),
    ) {
        let expected = alternatives
            .iter()
            .position(|set| set.iter().all(|k| secret.contains(k)));

        match (matching_key_set(&secret, &alternatives), expected) {
            (Some(found), Some(index)) => prop_assert_eq!(found, alternatives[index].as_slice()),
            (None, None) => {}
            (found, expected) => prop_assert!(false, "found {:?}, expected index {:?}", found, expected),
        }
    }

    #[test]
    fn superset_secret_still_matches(
        alternatives in key_sets_strategy(),
        secret in secret_strategy(),
        extra in secret_strategy(),
    ) {
        if matching_key_set(&secret, &alternatives).is_some() {
            let superset: BTreeSet<String> = secret.union(&extra).cloned().collect();
            prop_assert!(matching_key_set(&superset, &alternatives).is_some());
        }
    }

    #[test]
    fn closest_missing_keys_are_really_missing(
        alternatives in key_sets_strategy(),
        secret in secret_strategy(),
    ) {
        let missing = closest_missing_keys(&secret, &alternatives);
        for key in &missing {
            prop_assert!(!secret.contains(key));
        }
        if matching_key_set(&secret, &alternatives).is_some() {
            prop_assert!(missing.is_empty());
        }
    }

    #[test]
    fn derived_names_are_distinct(name in name_strategy(), auths in 0usize..8) {
        let mut names = BTreeSet::new();
        prop_assert!(names.insert(ResourceKind::ScaledObject.object_name(&name)));
        prop_assert!(names.insert(ResourceKind::HttpScaledObject.object_name(&name)));
        for index in 0..auths {
            prop_assert!(names.insert(trigger_auth_name(&name, index)));
        }
        prop_assert!(!names.contains(&ResourceKind::Deployment.object_name(&name)));
    }

    #[test]
    fn derived_names_follow_connector_name(name in name_strategy(), index in 1usize..16) {
        prop_assert_eq!(ResourceKind::Deployment.object_name(&name), name.clone());
        prop_assert_eq!(ResourceKind::Service.object_name(&name), name.clone());
        prop_assert_eq!(ResourceKind::ScaledObject.object_name(&name), format!("{name}-vso"));
        prop_assert_eq!(ResourceKind::HttpScaledObject.object_name(&name), format!("{name}-vhso"));
        prop_assert_eq!(trigger_auth_name(&name, 0), format!("{name}-vta"));
        prop_assert_eq!(trigger_auth_name(&name, index), format!("{name}-vta-{index}"));
    }

    #[test]
    fn validation_never_panics(
        min in proptest::option::of(-5i32..20),
        max in proptest::option::of(-5i32..20),
        port in proptest::option::of(-10i32..70000),
        host in "[a-z. ]{0,12}",
    ) {
        let spec = ConnectorSpec {
            image: Some("nginx".to_string()),
            expose_port: port,
            scaling_rule: Some(
                ScalingRule::http(HttpScaling {
                    host,
                    svc_type: ServiceType::ClusterIP,
                    pending_requests: 0,
                })
                .with_replicas(min, max),
            ),
            ..Default::default()
        };
        let connector = Connector::new("prop", spec);

        let result = validate_connector(&connector);
        let bounds_ok = min.is_none_or(|m| m >= 0)
            && match (min, max) {
                (Some(min), Some(max)) => min <= max,
                _ => true,
            };
        if !bounds_ok {
            prop_assert!(result.is_err());
        }
    }
}
