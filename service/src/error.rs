use serde::Serialize;
use snafu::Snafu;
use spawner_model::ErrorKind;
use spawner_provider::ProviderError;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures while starting the service or reading a request, before any provider is involved.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Unable to read config '{}': {}", path.display(), source))]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to parse config '{}': {}", path.display(), source))]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[snafu(display("Unable to create a Kubernetes client: {}", source))]
    KubeClient { source: kube::Error },

    #[snafu(display("Unable to load kubeconfig: {}", source))]
    Kubeconfig {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to read kubeconfig '{}': {}", path.display(), source))]
    KubeconfigRead {
        path: PathBuf,
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to open the secret store: {}", source))]
    SecretStore { source: spawner_store::Error },

    #[snafu(display("A request is required, use '--request' or '--request-file'"))]
    MissingRequest,

    #[snafu(display("Unable to read request file '{}': {}", path.display(), source))]
    RequestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to parse request: {}", source))]
    RequestParse { source: serde_json::Error },

    #[snafu(display("Unable to serialize response: {}", source))]
    ResponseSerialize { source: serde_json::Error },

    #[snafu(display("Operation failed: {}", source))]
    Operation { source: ProviderError },
}

/// The document printed in place of a response when an operation fails.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ProviderError> for ErrorResponse {
    fn from(e: &ProviderError) -> Self {
        Self {
            error: ErrorBody {
                kind: e.kind(),
                message: e.message(),
            },
        }
    }
}

#[test]
fn error_response_shape() {
    let e = ProviderError::new_with_context(
        ErrorKind::ProviderNotFound,
        "provider not found, must be one of ['aws', 'azure', 'gcp'], got openstack",
    );
    let json = serde_json::to_value(ErrorResponse::from(&e)).unwrap();
    assert_eq!(json["error"]["kind"], "providerNotFound");
    assert_eq!(
        json["error"]["message"],
        "provider not found, must be one of ['aws', 'azure', 'gcp'], got openstack"
    );
}
