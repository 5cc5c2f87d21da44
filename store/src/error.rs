use snafu::Snafu;
use spawner_model::{ErrorKind, SecretName};
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to list contents of directory '{}': {}", directory.display(), source))]
    ListDirectory {
        directory: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to get filename from path '{}'", path.display()))]
    MissingFilename { path: PathBuf },

    #[snafu(display("Non-UTF8 filename in path '{}'", path.display()))]
    NonUtf8Filename { path: PathBuf },

    #[snafu(display("Unable to read file '{}': {}", path.display(), source))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to write '{}': {}", path.display(), source))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display(
        "Unable to {} secret '{}' in namespace '{}': {}",
        method,
        name,
        namespace,
        source
    ))]
    KubeApi {
        method: String,
        name: String,
        namespace: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to create Kubernetes client: {}", source))]
    KubeClient { source: kube::Error },

    #[snafu(display("No credentials stored for '{}' in region '{}'", name, region))]
    NotFound { name: SecretName, region: String },

    #[snafu(display("Stored credentials '{}' are invalid: {}", name, source))]
    Decode {
        name: SecretName,
        source: spawner_model::Error,
    },

    #[snafu(display(
        "A '{}' credential cannot be stored for provider '{}'",
        payload,
        provider
    ))]
    ProviderMismatch { payload: String, provider: String },

    #[snafu(display("Unable to name the credential secret: {}", source))]
    Name { source: spawner_model::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Decode { .. } | Error::ProviderMismatch { .. } => ErrorKind::InvalidCredential,
            Error::Name { .. } => ErrorKind::InvalidRequest,
            Error::KubeApi { .. } | Error::KubeClient { .. } => ErrorKind::Vendor,
            Error::ListDirectory { .. }
            | Error::MissingFilename { .. }
            | Error::NonUtf8Filename { .. }
            | Error::ReadFile { .. }
            | Error::WriteFile { .. } => ErrorKind::Internal,
        }
    }
}
