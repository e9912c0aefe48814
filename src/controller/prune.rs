//! Removal of autoscaling objects the current spec no longer asks for
//!
//! Only objects labelled with the connector and controlled by its UID are
//! candidates. The Deployment is never pruned.

use std::collections::BTreeSet;

use kube::ResourceExt;
use kube::api::DynamicObject;
use tracing::{debug, info};

use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::crd::Connector;
use crate::resources::common::{ResourceKind, connector_selector};

/// Objects a reconcile pass wants to keep, by kind and name
pub type DesiredObjects = BTreeSet<(ResourceKind, String)>;

/// Delete stale derived objects, returning how many were removed
pub async fn prune_stale(
    ctx: &Context,
    connector: &Connector,
    ns: &str,
    desired: &DesiredObjects,
) -> Result<usize> {
    let Some(uid) = connector.metadata.uid.as_deref() else {
        debug!("Connector has no UID yet, skipping prune");
        return Ok(0);
    };

    let selector = connector_selector(&connector.name_any());
    let mut removed = 0;

    for kind in ResourceKind::PRUNABLE {
        let resource = kind.api_resource();
        for obj in ctx.store.list(&resource, ns, &selector).await? {
            let name = obj.name_any();
            if desired.contains(&(kind, name.clone())) || !is_controlled_by(&obj, uid) {
                continue;
            }

            if ctx.store.delete(&resource, ns, &name).await? {
                info!(kind = %kind, name = %name, namespace = %ns, "Pruned stale object");
                removed += 1;
            }
        }
    }

    Ok(removed)
}

fn is_controlled_by(obj: &DynamicObject, uid: &str) -> bool {
    obj.owner_references()
        .iter()
        .any(|owner| owner.controller == Some(true) && owner.uid == uid)
}
