//! OAuth Proxy Secret Bootstrap
//!
//! Guarantees that a fixed catalog of OAuth proxy cookie secrets exists in a
//! namespace, each carrying a non-empty random `cookie-secret` value. A value
//! that is already set is never replaced.
//!
//! # Example
//!
//! ```no_run
//! use oauth_secrets::{ensure_secrets, oauth_proxy_catalog, KubeSecretStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeSecretStore::new(client);
//!
//! let ensured = ensure_secrets(&store, "automotive-dev-operator-system", &oauth_proxy_catalog()).await?;
//! for secret in ensured {
//!     println!("{}: {}", secret.name, secret.outcome);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - **token**: cookie secret generation from the OS CSPRNG
//! - **catalog**: the descriptors of the secrets that must exist
//! - **store**: the Get/Create/Update gateway to the cluster (and a mock)
//! - **ensure**: the per-secret create/repair/leave-alone decision

pub mod catalog;
pub mod ensure;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod store;
pub mod token;

pub use catalog::{
    oauth_proxy_catalog, SecretDescriptor, BUILD_API_OAUTH_PROXY_SECRET, COOKIE_SECRET_KEY,
    WEBUI_OAUTH_PROXY_SECRET,
};
pub use ensure::{ensure_secrets, ensure_secrets_with_rng, EnsuredSecret, SecretOutcome};
pub use error::{EnsureError, GenerationError, StoreError};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockSecretStore, StoreCall};
pub use store::{KubeSecretStore, SecretStore};
pub use token::{
    generate_cookie_secret, generate_cookie_secret_with, COOKIE_SECRET_ALPHABET,
    COOKIE_SECRET_LENGTH,
};
