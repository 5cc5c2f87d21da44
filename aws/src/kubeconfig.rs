use crate::api::{ControlPlane, KubeApi};
use crate::error::{self, Error};
use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::Api;
use log::debug;
use secrecy::SecretString;
use serde::Serialize;
use snafu::{ensure, OptionExt, ResultExt};
use spawner_model::ErrorKind;
use spawner_provider::{ProviderError, ProviderResult};
use tokio::process::Command;

const TOKEN_COMMAND: &str = "aws eks get-token";

/// Reaches EKS control planes with a bearer token from `aws eks get-token`. The AWS CLI is given
/// the same credentials as the session's SDK clients.
pub(crate) struct EksKube {
    region: String,
    credentials: Option<SharedCredentialsProvider>,
}

impl EksKube {
    pub(crate) fn new<S>(region: S, credentials: Option<SharedCredentialsProvider>) -> Self
    where
        S: Into<String>,
    {
        Self {
            region: region.into(),
            credentials,
        }
    }

    async fn fetch_token(&self, cluster_name: &str) -> Result<String, Error> {
        let mut command = Command::new("aws");
        command.args([
            "eks",
            "get-token",
            "--cluster-name",
            cluster_name,
            "--region",
            self.region.as_str(),
            "--output",
            "json",
        ]);
        if let Some(provider) = &self.credentials {
            let credentials = provider
                .provide_credentials()
                .await
                .context(error::ResolveCredentialsSnafu)?;
            command
                .env("AWS_ACCESS_KEY_ID", credentials.access_key_id())
                .env("AWS_SECRET_ACCESS_KEY", credentials.secret_access_key());
            match credentials.session_token() {
                Some(session_token) => command.env("AWS_SESSION_TOKEN", session_token),
                None => command.env_remove("AWS_SESSION_TOKEN"),
            };
        }

        debug!(
            "Running '{} --cluster-name {} --region {}'",
            TOKEN_COMMAND, cluster_name, self.region
        );
        let output = command.output().await.context(error::TokenCommandSnafu {
            command: TOKEN_COMMAND,
        })?;
        ensure!(
            output.status.success(),
            error::TokenCommandStatusSnafu {
                command: TOKEN_COMMAND,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
        );
        token_from_output(&output.stdout)
    }

    async fn client(&self, control_plane: &ControlPlane) -> Result<kube::Client, Error> {
        let token = self.fetch_token(&control_plane.cluster_name).await?;
        let mut config = kube::Config::new(control_plane.endpoint.parse().context(
            error::EndpointSnafu {
                endpoint: &control_plane.endpoint,
            },
        )?);
        config.root_cert = Some(der_certificates(&control_plane.certificate_authority)?);
        config.auth_info.token = Some(SecretString::new(token));
        kube::Client::try_from(config).context(error::KubeClientSnafu {
            endpoint: &control_plane.endpoint,
        })
    }
}

#[async_trait]
impl KubeApi for EksKube {
    async fn token(&self, control_plane: &ControlPlane) -> ProviderResult<String> {
        self.fetch_token(&control_plane.cluster_name)
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    ErrorKind::ClusterUnreachable,
                    format!(
                        "Unable to get a token for cluster '{}'",
                        control_plane.cluster_name
                    ),
                    e,
                )
            })
    }

    async fn list_nodes(&self, control_plane: &ControlPlane) -> ProviderResult<Vec<Node>> {
        let unreachable = |e: Error| {
            ProviderError::new_with_source_and_context(
                ErrorKind::ClusterUnreachable,
                format!(
                    "Unable to reach the Kubernetes API of cluster '{}'",
                    control_plane.cluster_name
                ),
                e,
            )
        };
        let client = self.client(control_plane).await.map_err(unreachable)?;
        let nodes = Api::<Node>::all(client)
            .list(&ListParams::default())
            .await
            .context(error::ListNodesSnafu)
            .map_err(unreachable)?;
        Ok(nodes.items)
    }
}

fn token_from_output(stdout: &[u8]) -> Result<String, Error> {
    let json: serde_json::Value =
        serde_json::from_slice(stdout).context(error::TokenJsonSnafu)?;
    json.get("status")
        .and_then(|status| status.get("token"))
        .and_then(|token| token.as_str())
        .map(str::to_string)
        .context(error::TokenMissingSnafu)
}

/// Decode the base64 PEM bundle EKS reports into the DER certificates it contains.
fn der_certificates(certificate_authority: &str) -> Result<Vec<Vec<u8>>, Error> {
    let pem = base64::decode(certificate_authority.trim()).context(error::Base64DecodeSnafu)?;
    let pem = String::from_utf8_lossy(&pem);
    let mut certificates = Vec::new();
    let mut body: Option<String> = None;
    for line in pem.lines().map(str::trim) {
        match line {
            "-----BEGIN CERTIFICATE-----" => body = Some(String::new()),
            "-----END CERTIFICATE-----" => {
                if let Some(body) = body.take() {
                    certificates.push(base64::decode(body).context(error::Base64DecodeSnafu)?);
                }
            }
            _ => {
                if let Some(body) = body.as_mut() {
                    body.push_str(line);
                }
            }
        }
    }
    ensure!(!certificates.is_empty(), error::EmptyCertificateBundleSnafu);
    Ok(certificates)
}

#[derive(Serialize)]
struct Kubeconfig {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    kind: &'static str,
    clusters: Vec<NamedCluster>,
    contexts: Vec<NamedContext>,
    #[serde(rename = "current-context")]
    current_context: String,
    users: Vec<NamedUser>,
}

#[derive(Serialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    certificate_authority_data: String,
}

#[derive(Serialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Serialize)]
struct ContextEntry {
    cluster: String,
    user: String,
}

#[derive(Serialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Serialize)]
struct UserEntry {
    token: String,
}

/// A single-context kubeconfig YAML document that authenticates to `control_plane` with `token`.
pub fn render_kubeconfig(control_plane: &ControlPlane, token: &str) -> ProviderResult<String> {
    let name = control_plane.cluster_name.clone();
    let kubeconfig = Kubeconfig {
        api_version: "v1",
        kind: "Config",
        clusters: vec![NamedCluster {
            name: name.clone(),
            cluster: ClusterEntry {
                server: control_plane.endpoint.clone(),
                certificate_authority_data: control_plane.certificate_authority.clone(),
            },
        }],
        contexts: vec![NamedContext {
            name: name.clone(),
            context: ContextEntry {
                cluster: name.clone(),
                user: name.clone(),
            },
        }],
        current_context: name.clone(),
        users: vec![NamedUser {
            name,
            user: UserEntry {
                token: token.to_string(),
            },
        }],
    };
    serde_yaml::to_string(&kubeconfig)
        .context(error::RenderKubeconfigSnafu)
        .map_err(|e| ProviderError::new_with_source(ErrorKind::Internal, e))
}
