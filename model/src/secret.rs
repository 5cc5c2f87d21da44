use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// The key/value pairs of a stored secret.
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// The name of a secret in a secret backend. Secret names are used as Kubernetes object names and
/// as directory names, so they are restricted to lowercase alphanumerics, `-` and `.`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecretName(String);

const MAX_LEN: usize = 253;

impl SecretName {
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("must not be empty".to_string())
        } else if name.len() > MAX_LEN {
            Some(format!("must be at most {} characters", MAX_LEN))
        } else if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        {
            Some("must contain only lowercase alphanumerics, '-' and '.'".to_string())
        } else if !name.starts_with(|c: char| c.is_ascii_alphanumeric())
            || !name.ends_with(|c: char| c.is_ascii_alphanumeric())
        {
            Some("must start and end with an alphanumeric character".to_string())
        } else {
            None
        };
        match reason {
            Some(reason) => Err(error::SecretNameSnafu { name, reason }.build().into()),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SecretName {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SecretName> for String {
    fn from(name: SecretName) -> Self {
        name.0
    }
}

impl Display for SecretName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl AsRef<str> for SecretName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[test]
fn secret_name_validation() {
    assert!(SecretName::new("aws-acme").is_ok());
    assert!(SecretName::new("azure-acme.prod").is_ok());
    assert!(SecretName::new("").is_err());
    assert!(SecretName::new("Acme").is_err());
    assert!(SecretName::new("acme/../etc").is_err());
    assert!(SecretName::new("-acme").is_err());
}
