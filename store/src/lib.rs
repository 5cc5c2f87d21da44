/*!

`spawner-store` persists vendor credentials. A [`SecretStore`] is a region-scoped key/value secret
backend; the [`CredentialStore`] sits on top of it and speaks in typed [`Credentials`].

!*/

mod credentials;
mod directory;
mod error;
mod kubernetes;

pub use credentials::{credential_secret_name, CredentialStore};
pub use directory::DirectorySecretStore;
pub use error::{Error, Result};
pub use kubernetes::KubeSecretStore;

use spawner_model::{SecretData, SecretName};

/// A secret backend. Secrets are grouped by `region`; a write replaces the whole secret.
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    /// Get the key/value pairs of a secret, `None` if there is no such secret.
    async fn get_secret(&self, region: &str, name: &SecretName) -> Result<Option<SecretData>>;

    /// Create the secret or replace its entire contents.
    async fn put_secret(&self, region: &str, name: &SecretName, data: SecretData) -> Result<()>;
}
