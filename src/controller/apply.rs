//! Create-or-patch upsert shared by every derived object

use kube::api::DynamicObject;
use serde_json::Value;
use tracing::{debug, info};

use crate::controller::error::{Error, Result};
use crate::controller::store::ObjectStore;
use crate::resources::common::ResourceKind;

/// Outcome of [`create_or_patch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Created,
    Patched,
}

/// Create `obj`, or merge-patch it over the existing object of the same name.
///
/// Builders write `null` for fields they own but leave unset. The merge patch
/// removes those fields from the existing object; on create they are dropped.
///
/// The existing object is fetched before patching; if it vanished in between
/// the upsert fails with a transient error and the next reconcile retries.
pub async fn create_or_patch(
    store: &dyn ObjectStore,
    kind: ResourceKind,
    namespace: &str,
    obj: &DynamicObject,
) -> Result<Applied> {
    let resource = kind.api_resource();
    let name = obj
        .metadata
        .name
        .clone()
        .ok_or(Error::MissingObjectKey(".metadata.name"))?;

    let mut body = obj.clone();
    strip_nulls(&mut body.data);

    match store.create(&resource, namespace, &body).await {
        Ok(_) => {
            info!(kind = %kind, name = %name, namespace = %namespace, "Created");
            return Ok(Applied::Created);
        }
        Err(Error::AlreadyExists { .. }) => {
            debug!(kind = %kind, name = %name, "Already exists, patching");
        }
        Err(e) => return Err(e),
    }

    if store.get(&resource, namespace, &name).await?.is_none() {
        return Err(Error::TransientError(format!(
            "{kind} {namespace}/{name} disappeared before patch"
        )));
    }

    let patch = serde_json::to_value(obj)?;
    store
        .merge_patch(&resource, namespace, &name, &patch)
        .await?;
    debug!(kind = %kind, name = %name, namespace = %namespace, "Patched");
    Ok(Applied::Patched)
}

/// Remove `null` members from every object nested in `value`
pub fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}
