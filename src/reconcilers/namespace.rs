//! Get-or-create for a single Namespace

use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use tracing::debug;

use crate::client::LocalClient;
use crate::Result;

/// Return the existing namespace named like `desired`, creating it if absent.
///
/// An existing namespace is returned unmodified; namespaces carry no spec to
/// converge. Errors other than not-found propagate unchanged.
pub async fn ensure_namespace(client: &dyn LocalClient, desired: &Namespace) -> Result<Namespace> {
    let name = desired.name_any();

    if let Some(actual) = client.get_namespace(&name).await? {
        return Ok(actual);
    }

    debug!(namespace = %name, "Creating namespace");
    client.create_namespace(desired).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockLocalClient;
    use crate::Error;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::core::ErrorResponse;
    use std::collections::BTreeMap;

    fn namespace(name: &str) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creates_missing_namespace() {
        let mut client = MockLocalClient::new();
        client
            .expect_get_namespace()
            .withf(|name| name == "cluster-a")
            .returning(|_| Ok(None));
        client
            .expect_create_namespace()
            .withf(|ns| ns.name_any() == "cluster-a")
            .times(1)
            .returning(|ns| Ok(ns.clone()));

        let ns = ensure_namespace(&client, &namespace("cluster-a")).await.unwrap();
        assert_eq!(ns.name_any(), "cluster-a");
    }

    #[tokio::test]
    async fn returns_existing_namespace_unmodified() {
        let mut existing = namespace("cluster-a");
        existing.metadata.labels = Some(BTreeMap::from([("team".to_string(), "x".to_string())]));
        let returned = existing.clone();

        let mut client = MockLocalClient::new();
        client
            .expect_get_namespace()
            .returning(move |_| Ok(Some(returned.clone())));
        client.expect_create_namespace().never();

        let ns = ensure_namespace(&client, &namespace("cluster-a")).await.unwrap();
        assert_eq!(ns.labels().get("team").map(String::as_str), Some("x"));
    }

    #[tokio::test]
    async fn propagates_lookup_errors() {
        let mut client = MockLocalClient::new();
        client.expect_get_namespace().returning(|_| {
            Err(Error::KubeError(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: "etcd unavailable".to_string(),
                reason: "InternalError".to_string(),
                code: 500,
            })))
        });
        client.expect_create_namespace().never();

        let err = ensure_namespace(&client, &namespace("cluster-a"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("etcd unavailable"));
    }
}
