//! Controller-specific error types.

use kube::Error as KubeError;
use oauth_secrets::EnsureError;
use thiserror::Error;

/// Errors that can occur in the AutomotiveDevConfig Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// An OAuth proxy secret could not be ensured
    #[error("OAuth secrets error: {0}")]
    Secrets(#[from] EnsureError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
