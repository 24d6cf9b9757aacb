//! Kubeconfig secret validation

use k8s_openapi::api::core::v1::Secret;

use crate::crd::{SECRET_KUBECONFIG_KEY, SECRET_TYPE_KUBECONFIG};
use crate::{Error, Result};

/// Extract the kubeconfig document from a secret.
///
/// The secret must declare the kubeconfig secret type and carry the document
/// under the `kubeconfig` key. Violations are reported as
/// [`Error::InvalidSecret`].
pub fn kubeconfig_from_secret(secret: &Secret) -> Result<String> {
    let type_ = secret.type_.as_deref().unwrap_or_default();
    if type_ != SECRET_TYPE_KUBECONFIG {
        return Err(Error::InvalidSecret(format!(
            "invalid secret type {:?}, want {:?}",
            type_, SECRET_TYPE_KUBECONFIG
        )));
    }

    let value = secret
        .data
        .as_ref()
        .and_then(|data| data.get(SECRET_KUBECONFIG_KEY))
        .ok_or_else(|| {
            Error::InvalidSecret(format!(
                "missing {:?} key in kubeconfig secret",
                SECRET_KUBECONFIG_KEY
            ))
        })?;

    String::from_utf8(value.0.clone()).map_err(|e| {
        Error::InvalidSecret(format!(
            "invalid UTF-8 in secret key {:?}: {}",
            SECRET_KUBECONFIG_KEY, e
        ))
    })
}
