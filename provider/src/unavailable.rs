use crate::{Controller, ProviderError, ProviderResult};
use log::warn;
use spawner_model::requests::{
    ClusterDeleteRequest, ClusterDeleteResponse, ClusterRequest, ClusterResponse,
    ClusterStatusRequest, ClusterStatusResponse, CreateSnapshotAndDeleteRequest,
    CreateSnapshotAndDeleteResponse, CreateSnapshotRequest, CreateSnapshotResponse,
    CreateVolumeRequest, CreateVolumeResponse, DeleteVolumeRequest, DeleteVolumeResponse,
    GetClusterRequest, GetClustersRequest, GetClustersResponse, GetKubeConfigRequest,
    GetKubeConfigResponse, GetTokenRequest, GetTokenResponse, NodeDeleteRequest,
    NodeDeleteResponse, NodeSpawnRequest, NodeSpawnResponse, TagNodeInstanceRequest,
    TagNodeInstanceResponse,
};
use spawner_model::{ClusterSpec, ErrorKind, Provider};

/// The engine for a provider whose vendor SDK is not linked into this build. Every operation fails
/// with [`ErrorKind::Unsupported`], which keeps the provider addressable with the same contract.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableController {
    provider: Provider,
}

impl UnavailableController {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    fn unsupported<T>(&self, operation: &str) -> ProviderResult<T> {
        warn!(
            "'{}' was requested for provider '{}' which has no engine in this build",
            operation, self.provider
        );
        Err(ProviderError::new_with_context(
            ErrorKind::Unsupported,
            format!(
                "operation '{}' is not supported for provider '{}'",
                operation, self.provider
            ),
        ))
    }
}

#[async_trait::async_trait]
impl Controller for UnavailableController {
    async fn create_cluster(&self, _: ClusterRequest) -> ProviderResult<ClusterResponse> {
        self.unsupported("CreateCluster")
    }

    async fn get_cluster(&self, _: GetClusterRequest) -> ProviderResult<ClusterSpec> {
        self.unsupported("GetCluster")
    }

    async fn get_clusters(&self, _: GetClustersRequest) -> ProviderResult<GetClustersResponse> {
        self.unsupported("GetClusters")
    }

    async fn cluster_status(
        &self,
        _: ClusterStatusRequest,
    ) -> ProviderResult<ClusterStatusResponse> {
        self.unsupported("ClusterStatus")
    }

    async fn add_node(&self, _: NodeSpawnRequest) -> ProviderResult<NodeSpawnResponse> {
        self.unsupported("AddNode")
    }

    async fn delete_cluster(
        &self,
        _: ClusterDeleteRequest,
    ) -> ProviderResult<ClusterDeleteResponse> {
        self.unsupported("DeleteCluster")
    }

    async fn delete_node(&self, _: NodeDeleteRequest) -> ProviderResult<NodeDeleteResponse> {
        self.unsupported("DeleteNode")
    }

    async fn get_token(&self, _: GetTokenRequest) -> ProviderResult<GetTokenResponse> {
        self.unsupported("GetToken")
    }

    async fn get_kube_config(
        &self,
        _: GetKubeConfigRequest,
    ) -> ProviderResult<GetKubeConfigResponse> {
        self.unsupported("GetKubeConfig")
    }

    async fn create_volume(&self, _: CreateVolumeRequest) -> ProviderResult<CreateVolumeResponse> {
        self.unsupported("CreateVolume")
    }

    async fn delete_volume(&self, _: DeleteVolumeRequest) -> ProviderResult<DeleteVolumeResponse> {
        self.unsupported("DeleteVolume")
    }

    async fn create_snapshot(
        &self,
        _: CreateSnapshotRequest,
    ) -> ProviderResult<CreateSnapshotResponse> {
        self.unsupported("CreateSnapshot")
    }

    async fn create_snapshot_and_delete(
        &self,
        _: CreateSnapshotAndDeleteRequest,
    ) -> ProviderResult<CreateSnapshotAndDeleteResponse> {
        self.unsupported("CreateSnapshotAndDelete")
    }

    async fn tag_node_instance(
        &self,
        _: TagNodeInstanceRequest,
    ) -> ProviderResult<TagNodeInstanceResponse> {
        self.unsupported("TagNodeInstance")
    }
}
