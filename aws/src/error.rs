use snafu::Snafu;

/// Failures while talking to a cluster's Kubernetes API.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum Error {
    #[snafu(display("Failed to decode base64 blob: {}", source))]
    Base64Decode { source: base64::DecodeError },

    #[snafu(display("Certificate authority contains no PEM certificates"))]
    EmptyCertificateBundle,

    #[snafu(display("Invalid API endpoint '{}': {}", endpoint, source))]
    Endpoint {
        endpoint: String,
        source: http::uri::InvalidUri,
    },

    #[snafu(display("Unable to build a client for '{}': {}", endpoint, source))]
    KubeClient {
        endpoint: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to list nodes: {}", source))]
    ListNodes { source: kube::Error },

    #[snafu(display("Unable to render kubeconfig: {}", source))]
    RenderKubeconfig { source: serde_yaml::Error },

    #[snafu(display("Unable to run '{}': {}", command, source))]
    TokenCommand {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("'{}' exited with {}: {}", command, status, stderr))]
    TokenCommandStatus {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[snafu(display("Unable to parse the token command output: {}", source))]
    TokenJson { source: serde_json::Error },

    #[snafu(display("The token command output has no 'status.token'"))]
    TokenMissing,

    #[snafu(display("Unable to resolve AWS credentials: {}", source))]
    ResolveCredentials {
        source: aws_credential_types::provider::error::CredentialsError,
    },
}
