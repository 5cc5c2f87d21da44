use serde::{Deserialize, Serialize};
use snafu::Snafu;

#[derive(Debug, Snafu)]
pub struct Error(OpaqueError);
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum OpaqueError {
    #[snafu(display("Credential field '{}' is not valid UTF-8", key))]
    CredentialEncoding {
        key: String,
        source: std::string::FromUtf8Error,
    },

    #[snafu(display("Credential is missing the '{}' field", key))]
    CredentialField { key: String },

    #[snafu(display(
        "Credential stored for provider '{}' cannot be read as a '{}' credential",
        stored,
        requested
    ))]
    CredentialProvider { stored: String, requested: String },

    #[snafu(display("Invalid secret name '{}': {}", name, reason))]
    SecretName { name: String, reason: String },

    #[snafu(display("Parse error: {}", source))]
    SerdePlain { source: serde_plain::Error },
}

impl Error {
    /// The kind of failure a caller should see for this model error.
    pub fn kind(&self) -> ErrorKind {
        match &self.0 {
            OpaqueError::CredentialEncoding { .. }
            | OpaqueError::CredentialField { .. }
            | OpaqueError::CredentialProvider { .. } => ErrorKind::InvalidCredential,
            OpaqueError::SecretName { .. } | OpaqueError::SerdePlain { .. } => {
                ErrorKind::InvalidRequest
            }
        }
    }
}

/// The closed set of failure categories reported by every operation. Only `NotFound` and
/// `NoNodeGroup` are branched on by the engines, everything else is passed back to the caller.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Copy, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The request named a provider outside of `aws`, `azure` and `gcp`.
    ProviderNotFound,
    /// A vendor resource or a stored credential does not exist.
    NotFound,
    /// A node group with the requested name already exists in the cluster.
    NodeGroupExists,
    /// The cluster has no node group that could serve as a configuration template.
    NoNodeGroup,
    /// The cluster's control-plane endpoint is not available yet.
    ClusterUnreachable,
    /// A credential payload does not match the provider it is stored or requested for.
    InvalidCredential,
    /// The request is malformed.
    InvalidRequest,
    /// The provider does not implement the operation.
    Unsupported,
    /// A vendor API call failed.
    Vendor,
    /// Anything else, e.g. a local I/O failure.
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorKind);
serde_plain::derive_fromstr_from_deserialize!(ErrorKind, |e| -> Error {
    OpaqueError::SerdePlain { source: e }.into()
});

#[test]
fn error_kind_display() {
    assert_eq!(ErrorKind::NodeGroupExists.to_string(), "nodeGroupExists");
    assert_eq!(
        "clusterUnreachable".parse::<ErrorKind>().unwrap(),
        ErrorKind::ClusterUnreachable
    );
}
