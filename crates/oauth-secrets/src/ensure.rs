//! Ensure-secrets orchestration.
//!
//! For each descriptor, in catalog order:
//! 1. Get the secret
//! 2. Missing: generate a cookie secret and create the secret with the descriptor's labels
//! 3. Present with an absent or empty `cookie-secret`: generate one and update the secret
//! 4. Present with a non-empty `cookie-secret`: leave it alone
//!
//! The first failure stops the pass. Secrets earlier in the catalog keep
//! whatever was written for them; later ones are not touched.

use crate::catalog::{SecretDescriptor, COOKIE_SECRET_KEY};
use crate::error::{EnsureError, StoreError};
use crate::store::SecretStore;
use crate::token::{generate_cookie_secret_with, COOKIE_SECRET_LENGTH};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// What an ensure pass did to one secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretOutcome {
    /// The secret was missing and has been created
    Created,
    /// The secret existed without a cookie secret and one was added
    Repaired,
    /// The secret already had a cookie secret
    Unchanged,
}

impl fmt::Display for SecretOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SecretOutcome::Created => "created",
            SecretOutcome::Repaired => "repaired",
            SecretOutcome::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// Result of ensuring one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredSecret {
    /// Secret name
    pub name: String,
    /// What happened to it
    pub outcome: SecretOutcome,
}

/// Ensure every secret in `catalog` exists in `namespace` with a cookie secret.
///
/// Cookie secrets come from the OS CSPRNG. See [`ensure_secrets_with_rng`].
pub async fn ensure_secrets<S>(
    store: &S,
    namespace: &str,
    catalog: &[SecretDescriptor],
) -> Result<Vec<EnsuredSecret>, EnsureError>
where
    S: SecretStore + ?Sized,
{
    ensure_secrets_with_rng(store, &mut OsRng, namespace, catalog).await
}

/// Ensure every secret in `catalog` exists in `namespace`, drawing cookie
/// secrets from `rng`.
///
/// Returns one [`EnsuredSecret`] per descriptor, in catalog order, or the
/// first error encountered.
pub async fn ensure_secrets_with_rng<S, R>(
    store: &S,
    rng: &mut R,
    namespace: &str,
    catalog: &[SecretDescriptor],
) -> Result<Vec<EnsuredSecret>, EnsureError>
where
    S: SecretStore + ?Sized,
    R: RngCore + Send + ?Sized,
{
    let mut ensured = Vec::with_capacity(catalog.len());

    for descriptor in catalog {
        let outcome = ensure_secret(store, rng, namespace, descriptor).await?;
        ensured.push(EnsuredSecret {
            name: descriptor.name.clone(),
            outcome,
        });
    }

    Ok(ensured)
}

async fn ensure_secret<S, R>(
    store: &S,
    rng: &mut R,
    namespace: &str,
    descriptor: &SecretDescriptor,
) -> Result<SecretOutcome, EnsureError>
where
    S: SecretStore + ?Sized,
    R: RngCore + Send + ?Sized,
{
    let name = descriptor.name.as_str();

    match store.get(name, namespace).await {
        Err(StoreError::NotFound { .. }) => {
            let cookie_secret = new_cookie_secret(rng, name)?;
            let secret = new_secret(descriptor, namespace, cookie_secret);

            store.create(&secret).await.map_err(|source| EnsureError::Create {
                name: name.to_string(),
                source,
            })?;
            info!(secret = name, namespace, "Created OAuth secret with random cookie-secret");
            Ok(SecretOutcome::Created)
        }
        Err(source) => Err(EnsureError::Get {
            name: name.to_string(),
            source,
        }),
        Ok(mut secret) => {
            if has_cookie_secret(&secret) {
                debug!(secret = name, namespace, "OAuth secret already has cookie-secret");
                return Ok(SecretOutcome::Unchanged);
            }

            let cookie_secret = new_cookie_secret(rng, name)?;
            secret
                .data
                .get_or_insert_with(BTreeMap::new)
                .insert(COOKIE_SECRET_KEY.to_string(), ByteString(cookie_secret.into_bytes()));

            store.update(&secret).await.map_err(|source| EnsureError::Update {
                name: name.to_string(),
                source,
            })?;
            info!(secret = name, namespace, "Updated OAuth secret with random cookie-secret");
            Ok(SecretOutcome::Repaired)
        }
    }
}

fn new_cookie_secret<R>(rng: &mut R, name: &str) -> Result<String, EnsureError>
where
    R: RngCore + ?Sized,
{
    generate_cookie_secret_with(rng, COOKIE_SECRET_LENGTH).map_err(|source| EnsureError::Generate {
        name: name.to_string(),
        source,
    })
}

fn has_cookie_secret(secret: &Secret) -> bool {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(COOKIE_SECRET_KEY))
        .is_some_and(|value| !value.0.is_empty())
}

fn new_secret(descriptor: &SecretDescriptor, namespace: &str, cookie_secret: String) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(descriptor.name.clone()),
            namespace: Some(namespace.to_string()),
            labels: (!descriptor.labels.is_empty()).then(|| descriptor.labels.clone()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(BTreeMap::from([(
            COOKIE_SECRET_KEY.to_string(),
            ByteString(cookie_secret.into_bytes()),
        )])),
        ..Default::default()
    }
}
