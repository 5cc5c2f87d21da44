use crate::error::{self, Result};
use crate::{Provider, SecretData};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use std::fmt::{Debug, Formatter};

const NAME: &str = "name";
const PROVIDER: &str = "provider";
const ACCESS_KEY_ID: &str = "access-key-id";
const SECRET_ACCESS_KEY: &str = "secret-access-key";
const SESSION_TOKEN: &str = "session-token";
const SUBSCRIPTION_ID: &str = "subscription-id";
const TENANT_ID: &str = "tenant-id";
const CLIENT_ID: &str = "client-id";
const CLIENT_SECRET: &str = "client-secret";
const RESOURCE_GROUP: &str = "resource-group";

/// Vendor credentials for an account. There is one variant per provider that has credentials, so
/// every consumer has to say what it does with each of them.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Credentials {
    Aws(AwsCredential),
    Azure(AzureCredential),
}

#[derive(Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsCredential {
    #[serde(default)]
    pub name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

#[derive(Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureCredential {
    #[serde(default)]
    pub name: String,
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub resource_group: String,
}

impl Credentials {
    /// The provider this credential belongs to.
    pub fn provider(&self) -> Provider {
        match self {
            Credentials::Aws(_) => Provider::Aws,
            Credentials::Azure(_) => Provider::Azure,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Credentials::Aws(aws) => &aws.name,
            Credentials::Azure(azure) => &azure.name,
        }
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        match self {
            Credentials::Aws(aws) => aws.name = name.into(),
            Credentials::Azure(azure) => azure.name = name.into(),
        }
    }

    pub fn as_aws(&self) -> Option<&AwsCredential> {
        match self {
            Credentials::Aws(aws) => Some(aws),
            Credentials::Azure(_) => None,
        }
    }

    pub fn as_azure(&self) -> Option<&AzureCredential> {
        match self {
            Credentials::Aws(_) => None,
            Credentials::Azure(azure) => Some(azure),
        }
    }

    /// Flatten the credential into the key/value layout used by secret backends.
    pub fn to_secret_data(&self) -> SecretData {
        let mut data = SecretData::new();
        let mut put = |key: &str, value: &str| {
            data.insert(key.to_string(), value.as_bytes().to_vec());
        };
        put(PROVIDER, self.provider().as_str());
        match self {
            Credentials::Aws(aws) => {
                put(NAME, &aws.name);
                put(ACCESS_KEY_ID, &aws.access_key_id);
                put(SECRET_ACCESS_KEY, &aws.secret_access_key);
                if let Some(token) = &aws.session_token {
                    put(SESSION_TOKEN, token);
                }
            }
            Credentials::Azure(azure) => {
                put(NAME, &azure.name);
                put(SUBSCRIPTION_ID, &azure.subscription_id);
                put(TENANT_ID, &azure.tenant_id);
                put(CLIENT_ID, &azure.client_id);
                put(CLIENT_SECRET, &azure.client_secret);
                put(RESOURCE_GROUP, &azure.resource_group);
            }
        }
        data
    }

    /// Rebuild a credential of the `provider` variant from secret backend data. A record that was
    /// written for a different provider is rejected.
    pub fn from_secret_data(provider: Provider, data: &SecretData) -> Result<Self> {
        if let Some(stored) = optional(data, PROVIDER)? {
            if stored != provider.as_str() {
                return Err(error::CredentialProviderSnafu {
                    stored,
                    requested: provider.as_str(),
                }
                .build()
                .into());
            }
        }
        let name = optional(data, NAME)?.unwrap_or_default();
        match provider {
            Provider::Aws => Ok(Credentials::Aws(AwsCredential {
                name,
                access_key_id: required(data, ACCESS_KEY_ID)?,
                secret_access_key: required(data, SECRET_ACCESS_KEY)?,
                session_token: optional(data, SESSION_TOKEN)?,
            })),
            Provider::Azure => Ok(Credentials::Azure(AzureCredential {
                name,
                subscription_id: required(data, SUBSCRIPTION_ID)?,
                tenant_id: required(data, TENANT_ID)?,
                client_id: required(data, CLIENT_ID)?,
                client_secret: required(data, CLIENT_SECRET)?,
                resource_group: required(data, RESOURCE_GROUP)?,
            })),
            Provider::Gcp => Err(error::CredentialProviderSnafu {
                stored: "none",
                requested: provider.as_str(),
            }
            .build()
            .into()),
        }
    }
}

fn optional(data: &SecretData, key: &str) -> Result<Option<String>> {
    match data.get(key) {
        None => Ok(None),
        Some(bytes) => Ok(Some(
            String::from_utf8(bytes.to_owned()).context(error::CredentialEncodingSnafu { key })?,
        )),
    }
}

fn required(data: &SecretData, key: &str) -> Result<String> {
    optional(data, key)?.context(error::CredentialFieldSnafu { key }).map_err(Into::into)
}

const REDACTED: &str = "<redacted>";

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Aws(aws) => f.debug_tuple("Aws").field(aws).finish(),
            Credentials::Azure(azure) => f.debug_tuple("Azure").field(azure).finish(),
        }
    }
}

impl Debug for AwsCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredential")
            .field("name", &self.name)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .field("session_token", &self.session_token.as_ref().map(|_| REDACTED))
            .finish()
    }
}

impl Debug for AzureCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureCredential")
            .field("name", &self.name)
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &REDACTED)
            .field("resource_group", &self.resource_group)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    fn aws() -> Credentials {
        Credentials::Aws(AwsCredential {
            name: "acme".to_string(),
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
            session_token: None,
        })
    }

    #[test]
    fn secret_data_layout() {
        let data = aws().to_secret_data();
        assert_eq!(data.get("provider").unwrap(), b"aws");
        assert_eq!(data.get("access-key-id").unwrap(), b"AKIAEXAMPLE");
        assert!(!data.contains_key("session-token"));
        assert_eq!(
            Credentials::from_secret_data(Provider::Aws, &data).unwrap(),
            aws()
        );
    }

    #[test]
    fn provider_mismatch_is_invalid() {
        let data = aws().to_secret_data();
        let err = Credentials::from_secret_data(Provider::Azure, &data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredential);
    }

    #[test]
    fn missing_field_is_invalid() {
        let mut data = aws().to_secret_data();
        data.remove("secret-access-key");
        let err = Credentials::from_secret_data(Provider::Aws, &data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredential);
    }

    #[test]
    fn debug_hides_secrets() {
        let shown = format!("{:?}", aws());
        assert!(shown.contains("AKIAEXAMPLE"));
        assert!(!shown.contains("wJalrXUtnFEMI"));
    }

    #[test]
    fn wire_format_is_tagged_by_provider() {
        let json = r#"{"azure":{"subscriptionId":"s","tenantId":"t","clientId":"c","clientSecret":"x","resourceGroup":"rg"}}"#;
        let creds: Credentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.provider(), Provider::Azure);
        assert_eq!(creds.as_azure().unwrap().resource_group, "rg");
    }
}
