//! Initializer error types.

use oauth_secrets::EnsureError;
use thiserror::Error;

/// Errors that make the initializer exit non-zero.
#[derive(Debug, Error)]
pub enum InitError {
    /// Kubernetes client could not be built from kubeconfig or in-cluster config
    #[error("unable to create Kubernetes client: {0}")]
    Client(#[source] kube::Error),

    /// A secret could not be ensured; the error names the secret
    #[error("failed to ensure OAuth secrets: {0}")]
    Ensure(#[from] EnsureError),
}
