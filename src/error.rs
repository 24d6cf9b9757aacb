//! Error types for the Fleet Sync Operator

use std::time::Duration;

use thiserror::Error;

/// Result type for the operator
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the operator
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error, local or remote
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// The addressed object does not exist
    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    /// Kubeconfig secret has the wrong type or lacks the credential key
    #[error("Invalid kubeconfig secret: {0}")]
    InvalidSecret(String),

    /// Kubeconfig material could not be turned into connection parameters
    #[error("Invalid kubeconfig: {0}")]
    InvalidKubeconfig(String),

    /// Embedded object manifest is not a usable Kubernetes object
    #[error("Manifest error: {0}")]
    ManifestError(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Reconcile exceeded its deadline
    #[error("Reconcile timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// True for a 404 from either the typed `NotFound` variant or a raw API response.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::KubeError(kube::Error::Api(response)) => response.code == 404,
            _ => false,
        }
    }

    /// Input that only a human edit can fix. Never surfaced from a reconcile.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Error::InvalidSecret(_) | Error::InvalidKubeconfig(_))
    }

    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    #[test]
    fn api_404_is_not_found() {
        let err = Error::KubeError(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "configmaps \"x\" not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        }));
        assert!(err.is_not_found());
        assert!(!err.is_misconfiguration());
    }

    #[test]
    fn secret_and_kubeconfig_errors_are_misconfiguration() {
        assert!(Error::InvalidSecret("wrong type".into()).is_misconfiguration());
        assert!(Error::InvalidKubeconfig("bad yaml".into()).is_misconfiguration());
        assert!(!Error::ManifestError("no kind".into()).is_misconfiguration());
    }
}
