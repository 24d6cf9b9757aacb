//! Kubernetes-backed implementations of the client seams

pub mod kube_local;
pub mod kube_remote;
pub mod secrets;

pub use kube_local::KubeLocalClient;
pub use kube_remote::{KubeRemoteClient, KubeconfigConnector};
