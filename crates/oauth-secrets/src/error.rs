//! Secret bootstrap errors

use thiserror::Error;

/// The entropy source could not supply random bytes.
///
/// Fatal for the current pass; never retried.
#[derive(Debug, Error)]
#[error("failed to read random bytes from the entropy source: {0}")]
pub struct GenerationError(#[from] pub rand::Error);

/// Errors returned by a [`SecretStore`](crate::store::SecretStore)
///
/// `NotFound` is the only variant the orchestrator treats as expected; every
/// other variant is a store failure surfaced to the caller as-is.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The secret does not exist in the namespace
    #[error("secret {namespace}/{name} not found")]
    NotFound {
        /// Secret name
        name: String,
        /// Secret namespace
        namespace: String,
    },

    /// The API server rejected the request (auth, conflict, already exists, ...)
    #[error("API error ({code} {reason}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Machine-readable reason, e.g. `AlreadyExists` or `Conflict`
        reason: String,
        /// Human-readable message from the API server
        message: String,
    },

    /// Transport, TLS or decoding failure talking to the API server
    #[error("Kubernetes error: {0}")]
    Kube(#[source] kube::Error),

    /// The object to write has no name or namespace set
    #[error("secret is missing metadata.{0}")]
    MissingMetadata(&'static str),
}

impl StoreError {
    /// Whether this error is the store's "resource not found" condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Classify a kube client error for a request about `namespace/name`.
    pub(crate) fn from_kube(error: kube::Error, name: &str, namespace: &str) -> Self {
        match error {
            kube::Error::Api(ref response) if response.code == 404 => StoreError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
            kube::Error::Api(ref response) => StoreError::Api {
                code: response.code,
                reason: response.reason.clone(),
                message: response.message.clone(),
            },
            other => StoreError::Kube(other),
        }
    }
}

/// Errors that abort an ensure pass
///
/// Every variant names the secret whose processing failed.
#[derive(Debug, Error)]
pub enum EnsureError {
    /// Fetching the secret failed with anything other than "not found"
    #[error("failed to get secret {name}: {source}")]
    Get {
        /// Secret name
        name: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Generating a cookie secret failed
    #[error("failed to generate cookie secret for {name}: {source}")]
    Generate {
        /// Secret name
        name: String,
        /// Underlying entropy error
        #[source]
        source: GenerationError,
    },

    /// Creating the missing secret failed
    #[error("failed to create secret {name}: {source}")]
    Create {
        /// Secret name
        name: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Writing the repaired secret back failed
    #[error("failed to update secret {name}: {source}")]
    Update {
        /// Secret name
        name: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },
}

impl EnsureError {
    /// Name of the secret being processed when the pass stopped.
    #[must_use]
    pub fn secret_name(&self) -> &str {
        match self {
            EnsureError::Get { name, .. }
            | EnsureError::Generate { name, .. }
            | EnsureError::Create { name, .. }
            | EnsureError::Update { name, .. } => name,
        }
    }

    /// The store error behind this failure, if it came from the store.
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            EnsureError::Get { source, .. }
            | EnsureError::Create { source, .. }
            | EnsureError::Update { source, .. } => Some(source),
            EnsureError::Generate { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = StoreError::NotFound {
            name: "foo".to_string(),
            namespace: "ns".to_string(),
        };
        assert!(err.is_not_found());

        let err = StoreError::Api {
            code: 409,
            reason: "AlreadyExists".to_string(),
            message: "secrets \"foo\" already exists".to_string(),
        };
        assert!(!err.is_not_found());
        assert!(!StoreError::MissingMetadata("name").is_not_found());
    }

    #[test]
    fn test_ensure_error_carries_secret_name() {
        let err = EnsureError::Create {
            name: "ado-webui-oauth-proxy".to_string(),
            source: StoreError::Api {
                code: 403,
                reason: "Forbidden".to_string(),
                message: "secrets is forbidden".to_string(),
            },
        };

        assert_eq!(err.secret_name(), "ado-webui-oauth-proxy");
        assert!(err.to_string().contains("ado-webui-oauth-proxy"));
        assert!(err.to_string().contains("Forbidden"));
        assert!(matches!(err.store_error(), Some(StoreError::Api { code: 403, .. })));
    }
}
