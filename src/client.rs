//! Capability traits the controllers depend on
//!
//! The controllers never touch `kube::Client` directly. Production
//! implementations live in [`crate::adapters`]; unit tests use the
//! `mockall` mocks generated here.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::DynamicObject;

#[cfg(test)]
use mockall::automock;

use crate::controllers::lifecycle::FinalizerUpdate;
use crate::crd::{RemoteClusterStatus, RemoteObjectPriorityClass, RemoteObjectStatus};
use crate::Result;

/// Operations against the fleet (local) API server
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LocalClient: Send + Sync {
    /// Get a Secret, `None` if it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    /// Get a Namespace, `None` if it does not exist
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>>;

    /// Create a Namespace and return the stored object
    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace>;

    /// Replace the finalizer list of a RemoteCluster.
    ///
    /// Fails with a conflict if the record changed since `update` was computed.
    async fn set_cluster_finalizers(&self, name: &str, update: FinalizerUpdate) -> Result<()>;

    /// Write the status subresource of a RemoteCluster
    async fn patch_cluster_status(&self, name: &str, status: &RemoteClusterStatus) -> Result<()>;

    /// Replace the finalizer list of a RemoteObject, with the same conflict check
    async fn set_object_finalizers(
        &self,
        namespace: &str,
        name: &str,
        update: FinalizerUpdate,
    ) -> Result<()>;

    /// Write the status subresource of a RemoteObject
    async fn patch_object_status(
        &self,
        namespace: &str,
        name: &str,
        status: &RemoteObjectStatus,
    ) -> Result<()>;

    /// Get a RemoteObjectPriorityClass, `None` if it does not exist
    async fn get_priority_class(&self, name: &str) -> Result<Option<RemoteObjectPriorityClass>>;
}

/// Structured-object client against a remote cluster.
///
/// Objects are addressed by their own apiVersion, kind, name and namespace.
/// A missing object is reported as [`crate::Error::NotFound`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn get(&self, obj: &DynamicObject) -> Result<Option<DynamicObject>>;

    /// List objects of the same kind in the object's namespace
    async fn list(&self, obj: &DynamicObject) -> Result<Vec<DynamicObject>>;

    async fn create(&self, obj: &DynamicObject) -> Result<DynamicObject>;

    async fn update(&self, obj: &DynamicObject) -> Result<DynamicObject>;

    /// JSON merge patch: only fields present in `obj` are written
    async fn patch(&self, obj: &DynamicObject) -> Result<DynamicObject>;

    async fn delete(&self, obj: &DynamicObject) -> Result<()>;
}

/// Version discovery against a remote cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    async fn server_version(&self) -> Result<String>;
}

/// An established connection to a remote cluster
#[derive(Clone)]
pub struct RemoteConnection {
    /// API server address
    pub host: String,
    pub client: Arc<dyn RemoteClient>,
    pub discovery: Arc<dyn DiscoveryClient>,
}

impl std::fmt::Debug for RemoteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConnection")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// Builds remote connections from kubeconfig material
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    /// Unusable kubeconfig material yields [`crate::Error::InvalidKubeconfig`].
    async fn connect(&self, kubeconfig: &str) -> Result<RemoteConnection>;
}
