use crate::ProviderResult;
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
use spawner_model::ClusterSpec;

/// You implement the [`Controller`] trait to manage clusters, node groups and volumes on one cloud
/// vendor. The dispatcher holds one instance per provider for the life of the process and calls it
/// concurrently, so an implementation must not keep per-request state in `self`.
///
/// Every operation is one-shot: the vendor call sequence is issued, the vendor's answer is mapped
/// to the response, and long-running vendor work (cluster creation, deletion) is left for the
/// caller to poll with [`Controller::cluster_status`].
#[async_trait::async_trait]
pub trait Controller: Send + Sync {
    /// Create the cluster unless it already exists. Returns as soon as the vendor has accepted the
    /// create request.
    async fn create_cluster(&self, request: ClusterRequest) -> ProviderResult<ClusterResponse>;

    /// Describe a cluster and the nodes registered with its Kubernetes API.
    async fn get_cluster(&self, request: GetClusterRequest) -> ProviderResult<ClusterSpec>;

    /// List every cluster in a region together with its node groups.
    async fn get_clusters(&self, request: GetClustersRequest)
        -> ProviderResult<GetClustersResponse>;

    async fn cluster_status(
        &self,
        request: ClusterStatusRequest,
    ) -> ProviderResult<ClusterStatusResponse>;

    /// Add a node group to an existing cluster.
    async fn add_node(&self, request: NodeSpawnRequest) -> ProviderResult<NodeSpawnResponse>;

    async fn delete_cluster(
        &self,
        request: ClusterDeleteRequest,
    ) -> ProviderResult<ClusterDeleteResponse>;

    async fn delete_node(&self, request: NodeDeleteRequest) -> ProviderResult<NodeDeleteResponse>;

    /// A bearer token and the connection details for the cluster's Kubernetes API.
    async fn get_token(&self, request: GetTokenRequest) -> ProviderResult<GetTokenResponse>;

    async fn get_kube_config(
        &self,
        request: GetKubeConfigRequest,
    ) -> ProviderResult<GetKubeConfigResponse>;

    async fn create_volume(
        &self,
        request: CreateVolumeRequest,
    ) -> ProviderResult<CreateVolumeResponse>;

    async fn delete_volume(
        &self,
        request: DeleteVolumeRequest,
    ) -> ProviderResult<DeleteVolumeResponse>;

    async fn create_snapshot(
        &self,
        request: CreateSnapshotRequest,
    ) -> ProviderResult<CreateSnapshotResponse>;

    async fn create_snapshot_and_delete(
        &self,
        request: CreateSnapshotAndDeleteRequest,
    ) -> ProviderResult<CreateSnapshotAndDeleteResponse>;

    /// Copy labels onto the vendor instances backing a node group.
    async fn tag_node_instance(
        &self,
        request: TagNodeInstanceRequest,
    ) -> ProviderResult<TagNodeInstanceResponse>;
}
