//! OAuth Secrets Initializer
//!
//! Runs once (typically as an init container or Job) and makes sure the
//! OAuth proxy secrets of the web UI and build API exist with a random
//! `cookie-secret`. Exits non-zero if any secret cannot be ensured.

mod cli;
mod error;

use crate::cli::Cli;
use crate::error::InitError;
use clap::Parser;
use oauth_secrets::{ensure_secrets, oauth_proxy_catalog, KubeSecretStore, SecretStore};
use std::env;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str())),
        )
        .init();

    let namespace = cli.resolve_namespace(env::var("POD_NAMESPACE").ok());
    info!(namespace = %namespace, "Starting OAuth secrets initialization");

    let store = match connect().await {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&store, &namespace).await {
        Ok(()) => {
            info!("OAuth secrets initialization completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build a secret store from the ambient kubeconfig or in-cluster config.
async fn connect() -> Result<KubeSecretStore, InitError> {
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    let client = kube::Client::try_default().await.map_err(InitError::Client)?;
    Ok(KubeSecretStore::new(client))
}

/// Ensure the OAuth proxy catalog in `namespace`.
async fn run(store: &dyn SecretStore, namespace: &str) -> Result<(), InitError> {
    let ensured = ensure_secrets(store, namespace, &oauth_proxy_catalog()).await?;

    for secret in &ensured {
        info!(secret = %secret.name, outcome = %secret.outcome, "OAuth secret ready");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth_secrets::{MockSecretStore, COOKIE_SECRET_KEY, COOKIE_SECRET_LENGTH};

    #[tokio::test]
    async fn test_run_creates_both_oauth_secrets() {
        let store = MockSecretStore::new();

        run(&store, "automotive-dev-operator-system").await.unwrap();

        for name in ["ado-webui-oauth-proxy", "ado-build-api-oauth-proxy"] {
            let value = store
                .data_value(name, "automotive-dev-operator-system", COOKIE_SECRET_KEY)
                .unwrap();
            assert_eq!(value.len(), COOKIE_SECRET_LENGTH);
        }
    }

    #[tokio::test]
    async fn test_run_reports_failing_secret() {
        let store = MockSecretStore::new();
        store.fail_get("ado-webui-oauth-proxy", 403, "Forbidden");

        let err = run(&store, "ns").await.unwrap_err();

        assert!(err.to_string().contains("ado-webui-oauth-proxy"));
        assert!(store.is_empty());
    }
}
