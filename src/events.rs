//! Kubernetes Event recording
//!
//! Events are fire-and-forget: a failed publish is logged and never fails a
//! reconcile.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

#[cfg(test)]
use mockall::automock;

/// Publishes Kubernetes Events about fleet records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        note: Option<String>,
    );
}

/// Publisher backed by `kube::runtime::events::Recorder`.
///
/// A recorder is bound to one object, so one is built per published event.
pub struct KubeEventPublisher {
    client: Client,
    reporter: Reporter,
}

impl KubeEventPublisher {
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self { client, reporter }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: actions::RECONCILE.to_string(),
            secondary: None,
        };
        let recorder = Recorder::new(
            self.client.clone(),
            self.reporter.clone(),
            resource_ref.clone(),
        );
        if let Err(e) = recorder.publish(event).await {
            warn!(reason, error = %e, "Failed to publish Kubernetes event");
        }
    }
}

/// Event reasons, shown in the REASON column of `kubectl get events`
pub mod reasons {
    /// Kubeconfig secret is missing, mistyped or unusable
    pub const INVALID_CONFIG: &str = "InvalidConfig";
    /// Referenced RemoteObjectPriorityClass does not exist
    pub const MISSING_PRIORITY_CLASS: &str = "MissingPriorityClass";
    /// No cached connection for the RemoteObject's namespace yet
    pub const WAITING_FOR_CLIENT: &str = "WaitingForClient";
}

pub mod actions {
    pub const RECONCILE: &str = "Reconcile";
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Request, Response};
    use kube::client::Body;

    #[tokio::test]
    async fn publishes_one_event_regarding_the_record() {
        let (service, mut handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let client = Client::new(service, "default");

        let api_server = tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("event request");
            assert_eq!(request.method(), Method::POST);
            assert_eq!(
                request.uri().path(),
                "/apis/events.k8s.io/v1/namespaces/cluster-east/events"
            );
            let body = request.into_body().collect_bytes().await.unwrap();
            let event: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(event["reason"], reasons::WAITING_FOR_CLIENT);
            assert_eq!(event["type"], "Normal");
            assert_eq!(event["regarding"]["name"], "web");
            assert_eq!(event["reportingController"], "remote-object-controller");
            send.send_response(Response::builder().body(Body::from(body.to_vec())).unwrap());
        });

        let publisher = KubeEventPublisher::new(client, "remote-object-controller");
        let reference = ObjectReference {
            api_version: Some("fleetsync.dev/v1alpha1".to_string()),
            kind: Some("RemoteObject".to_string()),
            name: Some("web".to_string()),
            namespace: Some("cluster-east".to_string()),
            ..Default::default()
        };
        publisher
            .publish(
                &reference,
                EventType::Normal,
                reasons::WAITING_FOR_CLIENT,
                Some("Waiting for RemoteCluster clients to become available".to_string()),
            )
            .await;

        api_server.await.unwrap();
    }
}
