//! Command-line configuration.

use clap::Parser;

/// Namespace the secrets are created in when neither flag nor environment says otherwise
pub const DEFAULT_NAMESPACE: &str = "automotive-dev-operator-system";

/// Ensure the OAuth proxy cookie secrets exist.
#[derive(Debug, Parser)]
#[command(name = "init-secrets", version, about)]
pub struct Cli {
    /// The namespace to create secrets in (overridden by a non-empty POD_NAMESPACE)
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Target namespace: a non-empty `pod_namespace` wins over the flag.
    pub fn resolve_namespace(&self, pod_namespace: Option<String>) -> String {
        pod_namespace
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| self.namespace.clone())
    }
}
