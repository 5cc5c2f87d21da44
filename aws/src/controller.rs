use crate::api::{ClusterConfig, EksCluster, VolumeConfig};
use crate::iam::{ensure_cluster_role, ensure_nodegroup_role};
use crate::kubeconfig::render_kubeconfig;
use crate::nodegroup::{config_from_cluster, config_from_default, default_nodegroup};
use crate::nodes::node_spec_from_node;
use crate::session::{Session, SessionFactory};
use log::{debug, error, info, warn};
use spawner_model::constants::{CREATOR_LABEL, SPAWNER_SERVICE_LABEL};
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
use spawner_model::{ClusterSpec, ErrorKind, NodeSpec, NodeState, Provider};
use spawner_provider::{Controller, IntoProviderError, ProviderError, ProviderResult};
use std::collections::BTreeMap;

/// The EKS control plane version used when none is configured.
pub const DEFAULT_KUBERNETES_VERSION: &str = "1.24";
/// Volume type used when a create volume request does not name one.
pub const DEFAULT_VOLUME_TYPE: &str = "gp2";

#[derive(Clone, Debug)]
pub struct AwsSettings {
    /// Kubernetes version of new clusters.
    pub kubernetes_version: String,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            kubernetes_version: DEFAULT_KUBERNETES_VERSION.to_string(),
        }
    }
}

/// The EKS engine. Every operation opens a fresh session through `F`, issues its vendor calls
/// and returns without waiting for EKS to finish.
pub struct AwsController<F> {
    sessions: F,
    settings: AwsSettings,
}

impl<F> AwsController<F>
where
    F: SessionFactory,
{
    pub fn new(sessions: F, settings: AwsSettings) -> Self {
        Self { sessions, settings }
    }

    async fn describe_existing(&self, session: &Session, name: &str) -> ProviderResult<EksCluster> {
        session
            .cluster_client()
            .describe_cluster(name)
            .await?
            .context(
                ErrorKind::NotFound,
                format!(
                    "Cluster '{}' does not exist in region '{}'",
                    name,
                    session.region()
                ),
            )
    }

    async fn create_eks_cluster(
        &self,
        session: &Session,
        cluster_name: &str,
        request: &ClusterRequest,
    ) -> ProviderResult<EksCluster> {
        let role = ensure_cluster_role(session.identity_client()).await?;
        let subnet_ids = session.compute_client().default_subnets().await?;
        if subnet_ids.is_empty() {
            return Err(ProviderError::new_with_context(
                ErrorKind::NotFound,
                format!(
                    "The default VPC of region '{}' has no subnets",
                    session.region()
                ),
            ));
        }
        let mut tags = request.labels.clone();
        tags.insert(CREATOR_LABEL.to_string(), SPAWNER_SERVICE_LABEL.to_string());

        info!(
            "Creating cluster '{}' in region '{}' with role '{}'",
            cluster_name,
            session.region(),
            role.name
        );
        let cluster = session
            .cluster_client()
            .create_cluster(&ClusterConfig {
                name: cluster_name.to_string(),
                role_arn: role.arn,
                subnet_ids,
                version: Some(self.settings.kubernetes_version.clone()),
                tags,
            })
            .await?;
        for node_spec in &request.node_specs {
            info!(
                "Nodegroup '{}' ({}) can be added to cluster '{}' once it is ACTIVE",
                node_spec.name, node_spec.instance_type, cluster_name
            );
        }
        Ok(cluster)
    }

    /// The node groups of `cluster_name`, best effort: failures are logged and the affected
    /// node groups left out.
    async fn nodegroup_specs(&self, session: &Session, cluster_name: &str) -> Vec<NodeSpec> {
        let eks = session.cluster_client();
        let names = match eks.list_nodegroups(cluster_name).await {
            Ok(names) => names,
            Err(e) => {
                error!("Failed to list the nodegroups of '{}': {}", cluster_name, e);
                return Vec::new();
            }
        };
        let mut node_specs = Vec::with_capacity(names.len());
        for name in names {
            match eks.describe_nodegroup(cluster_name, &name).await {
                Ok(nodegroup) => node_specs.push(NodeSpec {
                    name,
                    instance_type: nodegroup
                        .instance_types
                        .first()
                        .cloned()
                        .unwrap_or_default(),
                    disk_size_mb: nodegroup
                        .disk_size
                        .map(|gib| i64::from(gib) * 1024)
                        .unwrap_or_default(),
                    labels: nodegroup.labels,
                    state: if nodegroup.status == "ACTIVE" {
                        NodeState::Active
                    } else {
                        NodeState::Inactive
                    },
                    ..Default::default()
                }),
                Err(e) => error!(
                    "Failed to describe nodegroup '{}' of '{}', leaving it out: {}",
                    name, cluster_name, e
                ),
            }
        }
        node_specs
    }
}

#[async_trait::async_trait]
impl<F> Controller for AwsController<F>
where
    F: SessionFactory,
{
    async fn create_cluster(&self, request: ClusterRequest) -> ProviderResult<ClusterResponse> {
        let cluster_name = if request.cluster_name.is_empty() {
            format!("{}-{}", Provider::Aws, request.region)
        } else {
            request.cluster_name.clone()
        };
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;

        debug!(
            "Checking whether cluster '{}' exists in region '{}'",
            cluster_name, request.region
        );
        if let Some(existing) = session.cluster_client().describe_cluster(&cluster_name).await? {
            info!(
                "Cluster '{}' already exists with status '{}'",
                existing.name, existing.status
            );
            return Ok(ClusterResponse {
                cluster_name: existing.name,
            });
        }

        let cluster = self
            .create_eks_cluster(&session, &cluster_name, &request)
            .await?;
        info!(
            "Cluster '{}' is '{}'. Creation takes several minutes, poll its status to follow it",
            cluster.name, cluster.status
        );
        Ok(ClusterResponse {
            cluster_name: cluster.name,
        })
    }

    async fn get_cluster(&self, request: GetClusterRequest) -> ProviderResult<ClusterSpec> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        debug!(
            "Fetching cluster '{}' in region '{}'",
            request.cluster_name, request.region
        );
        let cluster = self
            .describe_existing(&session, &request.cluster_name)
            .await?;
        let nodes = session.kubernetes_client(&cluster)?.list_nodes().await?;
        Ok(ClusterSpec {
            name: cluster.name,
            provider: Provider::Aws.to_string(),
            region: request.region,
            account_name: request.account_name,
            node_specs: nodes.iter().map(node_spec_from_node).collect(),
        })
    }

    async fn get_clusters(
        &self,
        request: GetClustersRequest,
    ) -> ProviderResult<GetClustersResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let names = session.cluster_client().list_clusters().await?;
        let mut clusters = Vec::with_capacity(names.len());
        for name in names {
            let node_specs = self.nodegroup_specs(&session, &name).await;
            clusters.push(ClusterSpec {
                name,
                provider: Provider::Aws.to_string(),
                region: request.region.clone(),
                account_name: request.account_name.clone(),
                node_specs,
            });
        }
        Ok(GetClustersResponse { clusters })
    }

    async fn cluster_status(
        &self,
        request: ClusterStatusRequest,
    ) -> ProviderResult<ClusterStatusResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let cluster = self
            .describe_existing(&session, &request.cluster_name)
            .await?;
        Ok(ClusterStatusResponse {
            status: cluster.status,
        })
    }

    async fn add_node(&self, request: NodeSpawnRequest) -> ProviderResult<NodeSpawnResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let cluster_name = &request.cluster_name;
        let node_spec = &request.node_spec;

        info!(
            "Querying the default nodegroup of cluster '{}' in region '{}'",
            cluster_name, request.region
        );
        let config = match default_nodegroup(
            session.cluster_client(),
            cluster_name,
            &node_spec.name,
        )
        .await
        {
            Ok(donor) => {
                info!(
                    "Copying the settings of nodegroup '{}' for '{}'",
                    donor.name, node_spec.name
                );
                config_from_default(&donor, cluster_name, node_spec)
            }
            Err(e) if e.kind() == ErrorKind::NoNodeGroup => {
                info!(
                    "Cluster '{}' has no nodegroups, deriving '{}' from the cluster",
                    cluster_name, node_spec.name
                );
                let cluster = self.describe_existing(&session, cluster_name).await?;
                let node_role = ensure_nodegroup_role(session.identity_client()).await?;
                config_from_cluster(&cluster, &node_role, node_spec)
            }
            Err(e) => return Err(e),
        };

        let nodegroup = session.cluster_client().create_nodegroup(&config).await?;
        info!(
            "Nodegroup '{}' is '{}'. Creation takes several minutes, poll the cluster to follow it",
            nodegroup.name, nodegroup.status
        );
        Ok(NodeSpawnResponse {})
    }

    async fn delete_cluster(
        &self,
        request: ClusterDeleteRequest,
    ) -> ProviderResult<ClusterDeleteResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let eks = session.cluster_client();
        if request.force_delete {
            for name in eks.list_nodegroups(&request.cluster_name).await? {
                let nodegroup = eks.delete_nodegroup(&request.cluster_name, &name).await?;
                info!(
                    "Requested deletion of nodegroup '{}', status '{}'",
                    nodegroup.name, nodegroup.status
                );
            }
        }
        let cluster = eks.delete_cluster(&request.cluster_name).await?;
        info!(
            "Requested deletion of cluster '{}', status '{}'. Deletion takes several minutes",
            cluster.name, cluster.status
        );
        Ok(ClusterDeleteResponse {})
    }

    async fn delete_node(&self, request: NodeDeleteRequest) -> ProviderResult<NodeDeleteResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let nodegroup = session
            .cluster_client()
            .delete_nodegroup(&request.cluster_name, &request.node_group_name)
            .await?;
        info!(
            "Requested deletion of nodegroup '{}', status '{}'. Deletion takes several minutes",
            nodegroup.name, nodegroup.status
        );
        Ok(NodeDeleteResponse {})
    }

    async fn get_token(&self, request: GetTokenRequest) -> ProviderResult<GetTokenResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let cluster = self
            .describe_existing(&session, &request.cluster_name)
            .await?;
        let kubernetes = session.kubernetes_client(&cluster)?;
        let token = kubernetes.token().await?;
        let control_plane = kubernetes.control_plane();
        Ok(GetTokenResponse {
            token,
            ca_data: control_plane.certificate_authority.clone(),
            endpoint: control_plane.endpoint.clone(),
        })
    }

    async fn get_kube_config(
        &self,
        request: GetKubeConfigRequest,
    ) -> ProviderResult<GetKubeConfigResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let cluster = self
            .describe_existing(&session, &request.cluster_name)
            .await?;
        let kubernetes = session.kubernetes_client(&cluster)?;
        let token = kubernetes.token().await?;
        Ok(GetKubeConfigResponse {
            config: render_kubeconfig(kubernetes.control_plane(), &token)?,
            cluster_name: cluster.name,
        })
    }

    async fn create_volume(
        &self,
        request: CreateVolumeRequest,
    ) -> ProviderResult<CreateVolumeResponse> {
        if request.availability_zone.is_empty() || request.size <= 0 {
            return Err(ProviderError::new_with_context(
                ErrorKind::InvalidRequest,
                format!(
                    "A volume needs an availability zone and a positive size, got '{}' and {}",
                    request.availability_zone, request.size
                ),
            ));
        }
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let volume_type = if request.volume_type.is_empty() {
            DEFAULT_VOLUME_TYPE.to_string()
        } else {
            request.volume_type
        };
        let volume_id = session
            .compute_client()
            .create_volume(&VolumeConfig {
                availability_zone: request.availability_zone,
                volume_type,
                size: request.size,
                snapshot_id: request.snapshot_id,
                tags: creator_tags(request.labels),
            })
            .await?;
        info!("Created volume '{}'", volume_id);
        Ok(CreateVolumeResponse { volume_id })
    }

    async fn delete_volume(
        &self,
        request: DeleteVolumeRequest,
    ) -> ProviderResult<DeleteVolumeResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        session
            .compute_client()
            .delete_volume(&request.volume_id)
            .await?;
        info!("Deleted volume '{}'", request.volume_id);
        Ok(DeleteVolumeResponse { deleted: true })
    }

    async fn create_snapshot(
        &self,
        request: CreateSnapshotRequest,
    ) -> ProviderResult<CreateSnapshotResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let snapshot_id = session
            .compute_client()
            .create_snapshot(&request.volume_id, &creator_tags(request.labels))
            .await?;
        info!(
            "Started snapshot '{}' of volume '{}'",
            snapshot_id, request.volume_id
        );
        Ok(CreateSnapshotResponse { snapshot_id })
    }

    async fn create_snapshot_and_delete(
        &self,
        request: CreateSnapshotAndDeleteRequest,
    ) -> ProviderResult<CreateSnapshotAndDeleteResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let ec2 = session.compute_client();
        let snapshot_id = ec2
            .create_snapshot(&request.volume_id, &creator_tags(request.labels))
            .await?;
        info!(
            "Started snapshot '{}' of volume '{}'",
            snapshot_id, request.volume_id
        );
        if let Err(e) = ec2.delete_volume(&request.volume_id).await {
            warn!(
                "Snapshot '{}' was created but volume '{}' was not deleted",
                snapshot_id, request.volume_id
            );
            return Err(ProviderError::new_with_source_and_context(
                e.kind(),
                format!(
                    "Snapshot '{}' was created but volume '{}' was not deleted",
                    snapshot_id, request.volume_id
                ),
                e,
            ));
        }
        info!("Deleted volume '{}'", request.volume_id);
        Ok(CreateSnapshotAndDeleteResponse {
            snapshot_id,
            volume_deleted: true,
        })
    }

    async fn tag_node_instance(
        &self,
        request: TagNodeInstanceRequest,
    ) -> ProviderResult<TagNodeInstanceResponse> {
        let session = self
            .sessions
            .open(&request.region, &request.account_name)
            .await?;
        let ec2 = session.compute_client();
        let instance_ids = ec2
            .nodegroup_instances(&request.cluster_name, &request.node_group_name)
            .await?;
        if instance_ids.is_empty() {
            return Err(ProviderError::new_with_context(
                ErrorKind::NotFound,
                format!(
                    "Nodegroup '{}' of cluster '{}' has no running instances",
                    request.node_group_name, request.cluster_name
                ),
            ));
        }
        ec2.create_tags(&instance_ids, &request.labels).await?;
        info!(
            "Tagged instances {:?} of nodegroup '{}'",
            instance_ids, request.node_group_name
        );
        Ok(TagNodeInstanceResponse {})
    }
}

fn creator_tags(mut labels: BTreeMap<String, String>) -> BTreeMap<String, String> {
    labels.insert(CREATOR_LABEL.to_string(), SPAWNER_SERVICE_LABEL.to_string());
    labels
}
