//! The vendor calls the EKS engine makes, grouped by service. Each trait returns plain structs so
//! that the engine never touches SDK types and can be driven by in-memory doubles.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use spawner_model::ErrorKind;
use spawner_provider::{IntoProviderError, ProviderResult};
use std::collections::BTreeMap;

/// An EKS cluster as returned by `DescribeCluster`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EksCluster {
    pub name: String,
    pub status: String,
    pub endpoint: Option<String>,
    /// Base64 encoded PEM bundle of the control plane's certificate authority.
    pub certificate_authority: Option<String>,
    pub subnet_ids: Vec<String>,
    pub version: Option<String>,
}

/// The parameters of an EKS `CreateCluster` call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClusterConfig {
    pub name: String,
    pub role_arn: String,
    pub subnet_ids: Vec<String>,
    pub version: Option<String>,
    pub tags: BTreeMap<String, String>,
}

/// An EKS managed node group as returned by `DescribeNodegroup`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EksNodegroup {
    pub name: String,
    pub status: String,
    pub ami_type: Option<String>,
    pub capacity_type: Option<String>,
    pub node_role: Option<String>,
    pub subnets: Vec<String>,
    pub release_version: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub instance_types: Vec<String>,
    /// GiB
    pub disk_size: Option<i32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScalingConfig {
    pub desired_size: i32,
    pub min_size: i32,
    pub max_size: i32,
}

/// The parameters of an EKS `CreateNodegroup` call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodegroupConfig {
    pub cluster_name: String,
    pub nodegroup_name: String,
    pub ami_type: Option<String>,
    pub capacity_type: Option<String>,
    pub node_role: Option<String>,
    pub release_version: Option<String>,
    pub subnets: Vec<String>,
    pub instance_types: Vec<String>,
    /// GiB
    pub disk_size: Option<i32>,
    pub labels: BTreeMap<String, String>,
    pub scaling: ScalingConfig,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IamRole {
    pub name: String,
    pub arn: String,
}

/// The parameters of an EC2 `CreateVolume` call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VolumeConfig {
    pub availability_zone: String,
    pub volume_type: String,
    /// GiB
    pub size: i32,
    pub snapshot_id: Option<String>,
    pub tags: BTreeMap<String, String>,
}

/// Where a cluster's Kubernetes API lives and how to trust it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControlPlane {
    pub cluster_name: String,
    pub endpoint: String,
    /// Base64 encoded PEM bundle, as EKS reports it.
    pub certificate_authority: String,
}

impl ControlPlane {
    /// The control plane of `cluster`, `ClusterUnreachable` while EKS has not published an
    /// endpoint or certificate authority for it.
    pub fn from_cluster(cluster: &EksCluster) -> ProviderResult<Self> {
        let endpoint = cluster
            .endpoint
            .clone()
            .filter(|endpoint| !endpoint.is_empty())
            .context(
                ErrorKind::ClusterUnreachable,
                format!(
                    "Cluster '{}' has no API endpoint (status '{}')",
                    cluster.name, cluster.status
                ),
            )?;
        let certificate_authority = cluster
            .certificate_authority
            .clone()
            .filter(|ca| !ca.is_empty())
            .context(
                ErrorKind::ClusterUnreachable,
                format!(
                    "Cluster '{}' has no certificate authority (status '{}')",
                    cluster.name, cluster.status
                ),
            )?;
        Ok(Self {
            cluster_name: cluster.name.clone(),
            endpoint,
            certificate_authority,
        })
    }
}

#[async_trait]
pub trait EksApi: Send + Sync {
    /// `None` if the cluster does not exist.
    async fn describe_cluster(&self, name: &str) -> ProviderResult<Option<EksCluster>>;

    async fn create_cluster(&self, config: &ClusterConfig) -> ProviderResult<EksCluster>;

    async fn delete_cluster(&self, name: &str) -> ProviderResult<EksCluster>;

    /// Every cluster name in the region, all pages.
    async fn list_clusters(&self) -> ProviderResult<Vec<String>>;

    /// Every node group name of `cluster`, all pages.
    async fn list_nodegroups(&self, cluster: &str) -> ProviderResult<Vec<String>>;

    async fn describe_nodegroup(&self, cluster: &str, nodegroup: &str)
        -> ProviderResult<EksNodegroup>;

    async fn create_nodegroup(&self, config: &NodegroupConfig) -> ProviderResult<EksNodegroup>;

    async fn delete_nodegroup(&self, cluster: &str, nodegroup: &str)
        -> ProviderResult<EksNodegroup>;
}

#[async_trait]
pub trait IamApi: Send + Sync {
    /// `None` if there is no role by that name.
    async fn get_role(&self, name: &str) -> ProviderResult<Option<IamRole>>;

    async fn create_role(
        &self,
        name: &str,
        description: &str,
        assume_role_policy: &str,
    ) -> ProviderResult<IamRole>;

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> ProviderResult<()>;
}

#[async_trait]
pub trait Ec2Api: Send + Sync {
    /// The subnets of the region's default VPC.
    async fn default_subnets(&self) -> ProviderResult<Vec<String>>;

    /// Returns the new volume's id.
    async fn create_volume(&self, config: &VolumeConfig) -> ProviderResult<String>;

    async fn delete_volume(&self, volume_id: &str) -> ProviderResult<()>;

    /// Returns the new snapshot's id.
    async fn create_snapshot(
        &self,
        volume_id: &str,
        tags: &BTreeMap<String, String>,
    ) -> ProviderResult<String>;

    /// Ids of the live instances launched for a node group.
    async fn nodegroup_instances(&self, cluster: &str, nodegroup: &str)
        -> ProviderResult<Vec<String>>;

    async fn create_tags(
        &self,
        resource_ids: &[String],
        tags: &BTreeMap<String, String>,
    ) -> ProviderResult<()>;
}

/// Access to a cluster's Kubernetes API.
#[async_trait]
pub trait KubeApi: Send + Sync {
    /// A short-lived bearer token for the cluster.
    async fn token(&self, control_plane: &ControlPlane) -> ProviderResult<String>;

    async fn list_nodes(&self, control_plane: &ControlPlane) -> ProviderResult<Vec<Node>>;
}
