//! [`LocalClient`] over the fleet cluster's `kube::Client`

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde_json::{json, Value};
use tracing::debug;

use crate::client::LocalClient;
use crate::controllers::lifecycle::FinalizerUpdate;
use crate::crd::{
    RemoteCluster, RemoteClusterStatus, RemoteObject, RemoteObjectPriorityClass,
    RemoteObjectStatus,
};
use crate::Result;

/// Field manager recorded on writes made by the operator
pub const FIELD_MANAGER: &str = "fleet-sync-operator";

pub struct KubeLocalClient {
    client: Client,
}

impl KubeLocalClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn patch_params() -> PatchParams {
        PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

/// Merge patch replacing `metadata.finalizers`.
///
/// The resourceVersion makes the API server reject the write with 409 when
/// someone else touched the record, so a concurrently added finalizer is
/// never dropped.
fn finalizer_patch(update: &FinalizerUpdate) -> Value {
    let mut metadata = json!({ "finalizers": update.finalizers });
    if let Some(rv) = &update.resource_version {
        metadata["resourceVersion"] = json!(rv);
    }
    json!({ "metadata": metadata })
}

#[async_trait]
impl LocalClient for KubeLocalClient {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(secrets.get_opt(name).await?)
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        Ok(namespaces.get_opt(name).await?)
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        Ok(namespaces.create(&params, namespace).await?)
    }

    async fn set_cluster_finalizers(&self, name: &str, update: FinalizerUpdate) -> Result<()> {
        let clusters: Api<RemoteCluster> = Api::all(self.client.clone());
        clusters
            .patch(name, &Self::patch_params(), &Patch::Merge(&finalizer_patch(&update)))
            .await?;
        debug!(cluster = name, finalizers = ?update.finalizers, "Updated RemoteCluster finalizers");
        Ok(())
    }

    async fn patch_cluster_status(&self, name: &str, status: &RemoteClusterStatus) -> Result<()> {
        let clusters: Api<RemoteCluster> = Api::all(self.client.clone());
        let patch = json!({ "status": status });
        clusters
            .patch_status(name, &Self::patch_params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn set_object_finalizers(
        &self,
        namespace: &str,
        name: &str,
        update: FinalizerUpdate,
    ) -> Result<()> {
        let objects: Api<RemoteObject> = Api::namespaced(self.client.clone(), namespace);
        objects
            .patch(name, &Self::patch_params(), &Patch::Merge(&finalizer_patch(&update)))
            .await?;
        debug!(namespace, object = name, finalizers = ?update.finalizers, "Updated RemoteObject finalizers");
        Ok(())
    }

    async fn patch_object_status(
        &self,
        namespace: &str,
        name: &str,
        status: &RemoteObjectStatus,
    ) -> Result<()> {
        let objects: Api<RemoteObject> = Api::namespaced(self.client.clone(), namespace);
        let patch = json!({ "status": status });
        objects
            .patch_status(name, &Self::patch_params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn get_priority_class(&self, name: &str) -> Result<Option<RemoteObjectPriorityClass>> {
        let classes: Api<RemoteObjectPriorityClass> = Api::all(self.client.clone());
        Ok(classes.get_opt(name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalizer_patch_pins_resource_version() {
        let patch = finalizer_patch(&FinalizerUpdate {
            finalizers: vec!["other".to_string(), "fleetsync.dev/cleanup".to_string()],
            resource_version: Some("812".to_string()),
        });
        assert_eq!(
            patch,
            json!({ "metadata": {
                "finalizers": ["other", "fleetsync.dev/cleanup"],
                "resourceVersion": "812",
            } })
        );
    }

    #[test]
    fn finalizer_patch_without_version_is_unconditional() {
        let patch = finalizer_patch(&FinalizerUpdate {
            finalizers: Vec::new(),
            resource_version: None,
        });
        assert_eq!(patch, json!({ "metadata": { "finalizers": [] } }));
    }
}
