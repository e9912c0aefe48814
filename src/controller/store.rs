//! Object access used by the reconciler
//!
//! Every read and write of the reconciler goes through [`ObjectStore`] over
//! `DynamicObject`s, so derived objects of any kind (built-in or KEDA CRD)
//! share one code path. [`KubeStore`] talks to the API server.

use async_trait::async_trait;
use kube::Client;
use kube::api::{
    Api, ApiResource, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::controller::error::{Error, Result};
use crate::resources::common::{FIELD_MANAGER, from_dynamic};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object, `None` when it does not exist
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>>;

    /// Create an object, failing with [`Error::AlreadyExists`] on a name clash
    async fn create(
        &self,
        resource: &ApiResource,
        namespace: &str,
        obj: &DynamicObject,
    ) -> Result<DynamicObject>;

    /// Apply an RFC 7386 JSON merge patch
    async fn merge_patch(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<DynamicObject>;

    /// Apply a JSON merge patch to the status subresource
    async fn merge_patch_status(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<()>;

    /// List objects matching a label selector
    async fn list(
        &self,
        resource: &ApiResource,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<DynamicObject>>;

    /// Delete an object, returning whether it existed
    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<bool>;
}

/// Fetch an object and convert it to its typed form
pub async fn get_typed<K: DeserializeOwned>(
    store: &dyn ObjectStore,
    resource: &ApiResource,
    namespace: &str,
    name: &str,
) -> Result<Option<K>> {
    match store.get(resource, namespace, name).await? {
        Some(obj) => Ok(Some(from_dynamic(obj)?)),
        None => Ok(None),
    }
}

/// [`ObjectStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }

    fn patch_params() -> PatchParams {
        PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

fn is_api_code(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == code)
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        Ok(self.api(resource, namespace).get_opt(name).await?)
    }

    async fn create(
        &self,
        resource: &ApiResource,
        namespace: &str,
        obj: &DynamicObject,
    ) -> Result<DynamicObject> {
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        match self.api(resource, namespace).create(&params, obj).await {
            Ok(created) => Ok(created),
            Err(e) if is_api_code(&e, 409) => Err(Error::AlreadyExists {
                kind: resource.kind.clone(),
                name: obj.metadata.name.clone().unwrap_or_default(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn merge_patch(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<DynamicObject> {
        Ok(self
            .api(resource, namespace)
            .patch(name, &Self::patch_params(), &Patch::Merge(patch))
            .await?)
    }

    async fn merge_patch_status(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<()> {
        self.api(resource, namespace)
            .patch_status(name, &Self::patch_params(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<DynamicObject>> {
        let params = ListParams::default().labels(label_selector);
        match self.api(resource, namespace).list(&params).await {
            Ok(list) => Ok(list.items),
            // The CRD is not installed, so there is nothing to list
            Err(e) if is_api_code(&e, 404) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<bool> {
        match self
            .api(resource, namespace)
            .delete(name, &DeleteParams::background())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_api_code(&e, 404) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
