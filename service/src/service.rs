use crate::config::{SecretStoreConfig, SpawnerConfig};
use crate::dispatcher::{parse_provider, ProviderTable};
use crate::error::{self, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use log::info;
use snafu::ResultExt;
use spawner_aws::{AwsController, AwsSessionFactory, AwsSettings};
use spawner_model::requests::{
    ClusterDeleteRequest, ClusterDeleteResponse, ClusterRequest, ClusterResponse,
    ClusterStatusRequest, ClusterStatusResponse, CreateSnapshotAndDeleteRequest,
    CreateSnapshotAndDeleteResponse, CreateSnapshotRequest, CreateSnapshotResponse,
    CreateVolumeRequest, CreateVolumeResponse, DeleteVolumeRequest, DeleteVolumeResponse,
    GetClusterRequest, GetClustersRequest, GetClustersResponse, GetKubeConfigRequest,
    GetKubeConfigResponse, GetTokenRequest, GetTokenResponse, NodeDeleteRequest,
    NodeDeleteResponse, NodeSpawnRequest, NodeSpawnResponse, ReadCredentialRequest,
    ReadCredentialResponse, TagNodeInstanceRequest, TagNodeInstanceResponse,
    WriteCredentialRequest, WriteCredentialResponse,
};
use spawner_model::{ClusterSpec, Provider};
use spawner_provider::{ProviderError, ProviderResult, UnavailableController};
use spawner_store::{CredentialStore, DirectorySecretStore, KubeSecretStore};
use std::path::Path;

/// Every operation of the system. Cluster, node and volume operations are routed to the engine of
/// the request's provider; credential operations are served from the credential store in the
/// secret host region.
pub struct SpawnerService {
    providers: ProviderTable,
    credentials: CredentialStore,
    secret_host_region: String,
}

impl SpawnerService {
    pub fn new<S>(
        providers: ProviderTable,
        credentials: CredentialStore,
        secret_host_region: S,
    ) -> Self
    where
        S: Into<String>,
    {
        Self {
            providers,
            credentials,
            secret_host_region: secret_host_region.into(),
        }
    }

    /// Build the credential store and the provider table described by `config`. `kubeconfig` is
    /// only read when secrets are kept in Kubernetes.
    pub async fn from_config(config: &SpawnerConfig, kubeconfig: Option<&Path>) -> Result<Self> {
        let credentials = match &config.secret_store {
            SecretStoreConfig::Directory { path } => {
                info!("Reading credentials from '{}'", path.display());
                CredentialStore::new(DirectorySecretStore::new(path))
            }
            SecretStoreConfig::Kubernetes { namespace } => {
                info!("Reading credentials from namespace '{}'", namespace);
                let store = match kubeconfig {
                    Some(path) => KubeSecretStore::new(kube_client(path).await?, namespace),
                    None => KubeSecretStore::try_default(namespace)
                        .await
                        .context(error::SecretStoreSnafu)?,
                };
                CredentialStore::new(store)
            }
        };

        let mut sessions =
            AwsSessionFactory::new(credentials.clone(), &config.secret_host_region);
        if let Some(role_arn) = &config.aws.assume_role {
            sessions =
                sessions.with_assume_role(role_arn, config.aws.assume_role_session_duration());
        }
        let mut settings = AwsSettings::default();
        if let Some(version) = &config.aws.kubernetes_version {
            settings.kubernetes_version = version.clone();
        }

        let providers = ProviderTable::new(
            AwsController::new(sessions, settings),
            UnavailableController::new(Provider::Azure),
            UnavailableController::new(Provider::Gcp),
        );
        Ok(Self::new(providers, credentials, &config.secret_host_region))
    }

    pub async fn create_cluster(&self, request: ClusterRequest) -> ProviderResult<ClusterResponse> {
        self.providers
            .resolve(&request.provider)?
            .create_cluster(request)
            .await
    }

    pub async fn get_cluster(&self, request: GetClusterRequest) -> ProviderResult<ClusterSpec> {
        self.providers
            .resolve(&request.provider)?
            .get_cluster(request)
            .await
    }

    pub async fn get_clusters(
        &self,
        request: GetClustersRequest,
    ) -> ProviderResult<GetClustersResponse> {
        self.providers
            .resolve(&request.provider)?
            .get_clusters(request)
            .await
    }

    pub async fn cluster_status(
        &self,
        request: ClusterStatusRequest,
    ) -> ProviderResult<ClusterStatusResponse> {
        self.providers
            .resolve(&request.provider)?
            .cluster_status(request)
            .await
    }

    pub async fn add_node(&self, request: NodeSpawnRequest) -> ProviderResult<NodeSpawnResponse> {
        self.providers
            .resolve(&request.provider)?
            .add_node(request)
            .await
    }

    pub async fn delete_cluster(
        &self,
        request: ClusterDeleteRequest,
    ) -> ProviderResult<ClusterDeleteResponse> {
        self.providers
            .resolve(&request.provider)?
            .delete_cluster(request)
            .await
    }

    pub async fn delete_node(
        &self,
        request: NodeDeleteRequest,
    ) -> ProviderResult<NodeDeleteResponse> {
        self.providers
            .resolve(&request.provider)?
            .delete_node(request)
            .await
    }

    pub async fn get_token(&self, request: GetTokenRequest) -> ProviderResult<GetTokenResponse> {
        self.providers
            .resolve(&request.provider)?
            .get_token(request)
            .await
    }

    pub async fn get_kube_config(
        &self,
        request: GetKubeConfigRequest,
    ) -> ProviderResult<GetKubeConfigResponse> {
        self.providers
            .resolve(&request.provider)?
            .get_kube_config(request)
            .await
    }

    pub async fn create_volume(
        &self,
        request: CreateVolumeRequest,
    ) -> ProviderResult<CreateVolumeResponse> {
        self.providers
            .resolve(&request.provider)?
            .create_volume(request)
            .await
    }

    pub async fn delete_volume(
        &self,
        request: DeleteVolumeRequest,
    ) -> ProviderResult<DeleteVolumeResponse> {
        self.providers
            .resolve(&request.provider)?
            .delete_volume(request)
            .await
    }

    pub async fn create_snapshot(
        &self,
        request: CreateSnapshotRequest,
    ) -> ProviderResult<CreateSnapshotResponse> {
        self.providers
            .resolve(&request.provider)?
            .create_snapshot(request)
            .await
    }

    pub async fn create_snapshot_and_delete(
        &self,
        request: CreateSnapshotAndDeleteRequest,
    ) -> ProviderResult<CreateSnapshotAndDeleteResponse> {
        self.providers
            .resolve(&request.provider)?
            .create_snapshot_and_delete(request)
            .await
    }

    pub async fn tag_node_instance(
        &self,
        request: TagNodeInstanceRequest,
    ) -> ProviderResult<TagNodeInstanceResponse> {
        self.providers
            .resolve(&request.provider)?
            .tag_node_instance(request)
            .await
    }

    /// Store credentials for an account, replacing any stored before. The payload must be for the
    /// provider the request names.
    pub async fn write_credential(
        &self,
        request: WriteCredentialRequest,
    ) -> ProviderResult<WriteCredentialResponse> {
        let provider = parse_provider(&request.provider)?;
        self.credentials
            .write(
                &self.secret_host_region,
                &request.account,
                provider,
                &request.credentials,
            )
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    e.kind(),
                    format!(
                        "Unable to store credentials of account '{}'",
                        request.account
                    ),
                    e,
                )
            })?;
        Ok(WriteCredentialResponse {})
    }

    pub async fn read_credential(
        &self,
        request: ReadCredentialRequest,
    ) -> ProviderResult<ReadCredentialResponse> {
        let provider = parse_provider(&request.provider)?;
        let credentials = self
            .credentials
            .read(&self.secret_host_region, &request.account, provider)
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    e.kind(),
                    format!(
                        "Unable to read credentials of account '{}'",
                        request.account
                    ),
                    e,
                )
            })?;
        Ok(ReadCredentialResponse {
            account: request.account,
            credentials,
        })
    }
}

async fn kube_client(path: &Path) -> Result<kube::Client> {
    let kubeconfig = Kubeconfig::read_from(path).context(error::KubeconfigReadSnafu { path })?;
    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .context(error::KubeconfigSnafu)?;
    kube::Client::try_from(config).context(error::KubeClientSnafu)
}
