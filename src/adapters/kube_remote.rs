//! Remote cluster clients built from kubeconfig material

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::{
    Api, DeleteParams, DynamicObject, GroupVersionKind, ListParams, Patch, PatchParams,
    PostParams,
};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::{self, Scope};
use kube::{Client, Config};
use tracing::{debug, info};

use crate::adapters::kube_local::FIELD_MANAGER;
use crate::client::{DiscoveryClient, RemoteClient, RemoteConnection, RemoteConnector};
use crate::{Error, Result};

/// Dynamic object client and discovery client for one remote cluster
pub struct KubeRemoteClient {
    client: Client,
}

impl KubeRemoteClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve the API endpoint for the object's kind and return it with the object name.
    async fn api_for(&self, obj: &DynamicObject) -> Result<(Api<DynamicObject>, String)> {
        let types = obj
            .types
            .as_ref()
            .ok_or_else(|| Error::ManifestError("object has no apiVersion/kind".to_string()))?;
        let name = obj
            .metadata
            .name
            .clone()
            .ok_or_else(|| Error::ManifestError("object has no metadata.name".to_string()))?;

        let (group, version) = types
            .api_version
            .split_once('/')
            .unwrap_or(("", types.api_version.as_str()));
        let gvk = GroupVersionKind::gvk(group, version, &types.kind);
        let (resource, capabilities) = discovery::pinned_kind(&self.client, &gvk).await?;

        let api = match capabilities.scope {
            Scope::Namespaced => Api::namespaced_with(
                self.client.clone(),
                obj.metadata.namespace.as_deref().unwrap_or("default"),
                &resource,
            ),
            Scope::Cluster => Api::all_with(self.client.clone(), &resource),
        };
        Ok((api, name))
    }

    fn kind_of(obj: &DynamicObject) -> String {
        obj.types
            .as_ref()
            .map(|t| t.kind.clone())
            .unwrap_or_default()
    }

    fn not_found(obj: &DynamicObject, name: &str) -> impl FnOnce(kube::Error) -> Error {
        let kind = Self::kind_of(obj);
        let name = name.to_string();
        move |e| match e {
            kube::Error::Api(response) if response.code == 404 => Error::not_found(kind, name),
            other => Error::KubeError(other),
        }
    }
}

#[async_trait]
impl RemoteClient for KubeRemoteClient {
    async fn get(&self, obj: &DynamicObject) -> Result<Option<DynamicObject>> {
        let (api, name) = self.api_for(obj).await?;
        Ok(api.get_opt(&name).await?)
    }

    async fn list(&self, obj: &DynamicObject) -> Result<Vec<DynamicObject>> {
        let (api, _) = self.api_for(obj).await?;
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn create(&self, obj: &DynamicObject) -> Result<DynamicObject> {
        let (api, name) = self.api_for(obj).await?;
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        let created = api.create(&params, obj).await?;
        info!(kind = %Self::kind_of(obj), name = %name, "Created remote object");
        Ok(created)
    }

    async fn update(&self, obj: &DynamicObject) -> Result<DynamicObject> {
        let (api, name) = self.api_for(obj).await?;
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        api.replace(&name, &params, obj)
            .await
            .map_err(Self::not_found(obj, &name))
    }

    async fn patch(&self, obj: &DynamicObject) -> Result<DynamicObject> {
        let (api, name) = self.api_for(obj).await?;
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        api.patch(&name, &params, &Patch::Merge(obj))
            .await
            .map_err(Self::not_found(obj, &name))
    }

    async fn delete(&self, obj: &DynamicObject) -> Result<()> {
        let (api, name) = self.api_for(obj).await?;
        api.delete(&name, &DeleteParams::default())
            .await
            .map_err(Self::not_found(obj, &name))?;
        debug!(kind = %Self::kind_of(obj), name = %name, "Deleted remote object");
        Ok(())
    }
}

#[async_trait]
impl DiscoveryClient for KubeRemoteClient {
    async fn server_version(&self) -> Result<String> {
        Ok(self.client.apiserver_version().await?.git_version)
    }
}

/// [`RemoteConnector`] that parses kubeconfig YAML with kube's config loader
#[derive(Default)]
pub struct KubeconfigConnector;

#[async_trait]
impl RemoteConnector for KubeconfigConnector {
    async fn connect(&self, kubeconfig: &str) -> Result<RemoteConnection> {
        let kubeconfig =
            Kubeconfig::from_yaml(kubeconfig).map_err(|e| Error::InvalidKubeconfig(e.to_string()))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| Error::InvalidKubeconfig(e.to_string()))?;

        let host = config.cluster_url.to_string();
        let client = Client::try_from(config)?;
        let remote = Arc::new(KubeRemoteClient::new(client));

        Ok(RemoteConnection {
            host,
            client: remote.clone(),
            discovery: remote,
        })
    }
}
