use crate::error::{self, Result};
use crate::SecretStore;
use log::{debug, info};
use sha2::{Digest, Sha256};
use snafu::{ensure, OptionExt, ResultExt};
use spawner_model::{Credentials, Provider, SecretName};
use std::sync::Arc;

/// Longest account kept verbatim in a secret name, leaving room for the provider, the hash suffix
/// and the region prefix of the Kubernetes backend.
const MAX_ACCOUNT_LEN: usize = 200;
/// Bytes of the account's SHA-256 used as a suffix.
const HASH_LEN: usize = 8;

/// The name of the secret holding `account`'s credentials for `provider`: `{provider}-{account}`.
/// An account that cannot appear in a secret name as is gets lowercased, every other character
/// replaced by `-`, and a hash of the raw account appended, so that `Acme` and `acme` or
/// `acme_prod` and `acme-prod` never share a secret.
pub fn credential_secret_name(account: &str, provider: Provider) -> Result<SecretName> {
    if account.len() <= MAX_ACCOUNT_LEN {
        if let Ok(name) = SecretName::new(format!("{}-{}", provider, account)) {
            return Ok(name);
        }
    }
    let escaped: String = account
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9') => c,
            _ => '-',
        })
        .take(MAX_ACCOUNT_LEN)
        .collect();
    let escaped = escaped.trim_matches('-');
    let hash = hex::encode(&Sha256::digest(account.as_bytes())[..HASH_LEN]);
    let name = if escaped.is_empty() {
        format!("{}-{}", provider, hash)
    } else {
        format!("{}-{}-{}", provider, escaped, hash)
    };
    SecretName::new(name).context(error::NameSnafu)
}

/// Reads and writes typed vendor credentials, keyed by `(region, account, provider)`.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn SecretStore>,
}

impl CredentialStore {
    pub fn new<S>(backend: S) -> Self
    where
        S: SecretStore + 'static,
    {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Get the credentials stored for `account`, failing with `NotFound` if there are none.
    pub async fn read(
        &self,
        region: &str,
        account: &str,
        provider: Provider,
    ) -> Result<Credentials> {
        let name = credential_secret_name(account, provider)?;
        let data = self
            .backend
            .get_secret(region, &name)
            .await?
            .context(error::NotFoundSnafu {
                name: name.clone(),
                region,
            })?;
        let credentials =
            Credentials::from_secret_data(provider, &data).context(error::DecodeSnafu { name })?;
        debug!("Found '{}' credentials for account '{}'", provider, account);
        Ok(credentials)
    }

    /// Store `credentials` for `account`, replacing whatever was stored before.
    pub async fn write(
        &self,
        region: &str,
        account: &str,
        provider: Provider,
        credentials: &Credentials,
    ) -> Result<()> {
        ensure!(
            credentials.provider() == provider,
            error::ProviderMismatchSnafu {
                payload: credentials.provider().as_str(),
                provider: provider.as_str(),
            }
        );
        let name = credential_secret_name(account, provider)?;
        let mut credentials = credentials.clone();
        credentials.set_name(account);
        self.backend
            .put_secret(region, &name, credentials.to_secret_data())
            .await?;
        info!("Stored '{}' credentials for account '{}'", provider, account);
        Ok(())
    }
}
