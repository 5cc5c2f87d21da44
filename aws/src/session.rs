use crate::api::{ControlPlane, Ec2Api, EksApi, EksCluster, IamApi, KubeApi};
use crate::kubeconfig::EksKube;
use crate::sdk::{SdkEc2, SdkEks, SdkIam};
use async_trait::async_trait;
use aws_config::default_provider::credentials::default_provider;
use aws_config::sts::AssumeRoleProvider;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials as AwsCredentials;
use aws_smithy_types::retry::RetryConfig;
use aws_types::region::Region;
use aws_types::SdkConfig;
use k8s_openapi::api::core::v1::Node;
use log::{debug, info};
use spawner_model::constants::DEFAULT_ACCOUNT;
use spawner_model::{Credentials, ErrorKind, Provider};
use spawner_provider::{ProviderError, ProviderResult};
use spawner_store::CredentialStore;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ASSUME_ROLE_SESSION_DURATION: Duration = Duration::from_secs(3600);

/// Opens a [`Session`] for a region, acting as an account.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, region: &str, account_name: &str) -> ProviderResult<Session>;
}

/// The clients for one region and one identity. Sessions are opened per request and never cached.
pub struct Session {
    region: String,
    eks: Arc<dyn EksApi>,
    iam: Arc<dyn IamApi>,
    ec2: Arc<dyn Ec2Api>,
    kube: Arc<dyn KubeApi>,
}

impl Session {
    pub fn new<S>(
        region: S,
        eks: Arc<dyn EksApi>,
        iam: Arc<dyn IamApi>,
        ec2: Arc<dyn Ec2Api>,
        kube: Arc<dyn KubeApi>,
    ) -> Self
    where
        S: Into<String>,
    {
        Self {
            region: region.into(),
            eks,
            iam,
            ec2,
            kube,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn cluster_client(&self) -> &dyn EksApi {
        self.eks.as_ref()
    }

    pub fn identity_client(&self) -> &dyn IamApi {
        self.iam.as_ref()
    }

    pub fn compute_client(&self) -> &dyn Ec2Api {
        self.ec2.as_ref()
    }

    /// A client for `cluster`'s Kubernetes API. Fails with `ClusterUnreachable` until EKS has
    /// published the control plane's endpoint.
    pub fn kubernetes_client(&self, cluster: &EksCluster) -> ProviderResult<KubernetesClient<'_>> {
        Ok(KubernetesClient {
            control_plane: ControlPlane::from_cluster(cluster)?,
            api: self.kube.as_ref(),
        })
    }
}

pub struct KubernetesClient<'a> {
    control_plane: ControlPlane,
    api: &'a dyn KubeApi,
}

impl KubernetesClient<'_> {
    pub fn control_plane(&self) -> &ControlPlane {
        &self.control_plane
    }

    pub async fn token(&self) -> ProviderResult<String> {
        self.api.token(&self.control_plane).await
    }

    pub async fn list_nodes(&self) -> ProviderResult<Vec<Node>> {
        self.api.list_nodes(&self.control_plane).await
    }
}

/// Opens sessions backed by the AWS SDK. The default account uses the host's credential chain;
/// other accounts use the AWS credentials stored for them in the secret host region.
pub struct AwsSessionFactory {
    credentials: CredentialStore,
    secret_region: String,
    assume_role: Option<String>,
    assume_role_session_duration: Duration,
}

impl AwsSessionFactory {
    pub fn new<S>(credentials: CredentialStore, secret_region: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            credentials,
            secret_region: secret_region.into(),
            assume_role: None,
            assume_role_session_duration: DEFAULT_ASSUME_ROLE_SESSION_DURATION,
        }
    }

    /// Assume `role_arn` on top of whichever credentials a session resolves.
    pub fn with_assume_role<S>(mut self, role_arn: S, session_duration: Option<Duration>) -> Self
    where
        S: Into<String>,
    {
        self.assume_role = Some(role_arn.into());
        if let Some(session_duration) = session_duration {
            self.assume_role_session_duration = session_duration;
        }
        self
    }

    async fn base_provider(&self, account_name: &str) -> ProviderResult<SharedCredentialsProvider> {
        if account_name.is_empty() || account_name == DEFAULT_ACCOUNT {
            debug!("Using the default credential chain");
            return Ok(SharedCredentialsProvider::new(default_provider().await));
        }
        let credentials = self
            .credentials
            .read(&self.secret_region, account_name, Provider::Aws)
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    e.kind(),
                    format!("Unable to load credentials for account '{}'", account_name),
                    e,
                )
            })?;
        match credentials {
            Credentials::Aws(aws) => {
                info!("Using stored credentials of account '{}'", account_name);
                Ok(SharedCredentialsProvider::new(AwsCredentials::new(
                    aws.access_key_id,
                    aws.secret_access_key,
                    aws.session_token,
                    None,
                    "spawner_credential_store",
                )))
            }
            Credentials::Azure(_) => Err(ProviderError::new_with_context(
                ErrorKind::InvalidCredential,
                format!(
                    "Credentials stored for account '{}' are not AWS credentials",
                    account_name
                ),
            )),
        }
    }

    async fn sdk_config(&self, region: &str, account_name: &str) -> ProviderResult<SdkConfig> {
        let base_provider = self.base_provider(account_name).await?;
        let provider = match &self.assume_role {
            Some(role_arn) => {
                info!("Assuming role '{}'", role_arn);
                SharedCredentialsProvider::new(
                    AssumeRoleProvider::builder(role_arn)
                        .region(Region::new(region.to_string()))
                        .session_name("spawner")
                        .session_length(self.assume_role_session_duration)
                        .build(base_provider),
                )
            }
            None => base_provider,
        };
        // Vendor errors, throttling included, are surfaced to the caller without retrying.
        Ok(aws_config::from_env()
            .retry_config(RetryConfig::disabled())
            .credentials_provider(provider)
            .region(Region::new(region.to_string()))
            .load()
            .await)
    }
}

#[async_trait]
impl SessionFactory for AwsSessionFactory {
    async fn open(&self, region: &str, account_name: &str) -> ProviderResult<Session> {
        debug!(
            "Opening a session in '{}' for account '{}'",
            region, account_name
        );
        let config = self.sdk_config(region, account_name).await?;
        Ok(Session::new(
            region,
            Arc::new(SdkEks::new(&config)),
            Arc::new(SdkIam::new(&config)),
            Arc::new(SdkEc2::new(&config)),
            Arc::new(EksKube::new(region, config.credentials_provider().cloned())),
        ))
    }
}
