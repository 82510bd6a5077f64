//! Secret descriptor catalog
//!
//! The catalog is plain data handed to the orchestrator, so callers and tests
//! can ensure any set of secrets.

use std::collections::BTreeMap;

/// Data key holding the OAuth proxy cookie secret.
pub const COOKIE_SECRET_KEY: &str = "cookie-secret";

/// Name of the web UI OAuth proxy secret.
pub const WEBUI_OAUTH_PROXY_SECRET: &str = "ado-webui-oauth-proxy";

/// Name of the build API OAuth proxy secret.
pub const BUILD_API_OAUTH_PROXY_SECRET: &str = "ado-build-api-oauth-proxy";

/// A secret that must exist, and the labels it is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretDescriptor {
    /// Secret name
    pub name: String,
    /// Labels applied when the secret is created
    pub labels: BTreeMap<String, String>,
}

impl SecretDescriptor {
    /// Descriptor with no labels.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Add a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// The OAuth proxy secrets used by the operator's web UI and build API.
#[must_use]
pub fn oauth_proxy_catalog() -> Vec<SecretDescriptor> {
    vec![
        SecretDescriptor::new(WEBUI_OAUTH_PROXY_SECRET)
            .with_label("app.kubernetes.io/name", "ado-webui")
            .with_label("app.kubernetes.io/part-of", "automotive-dev-operator"),
        SecretDescriptor::new(BUILD_API_OAUTH_PROXY_SECRET)
            .with_label("app.kubernetes.io/name", "automotive-dev-operator")
            .with_label("app.kubernetes.io/component", "build-api"),
    ]
}
