//! Request and response shapes of the operations, one pair per operation. Every request names the
//! `provider` it is routed to; the provider is kept as a string so that an unknown value can be
//! reported by the dispatcher instead of failing deserialization.

use crate::{ClusterSpec, Credentials, NodeSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterRequest {
    pub provider: String,
    pub region: String,
    pub account_name: String,
    /// Defaults to `{provider}-{region}` when empty.
    pub cluster_name: String,
    pub node_specs: Vec<NodeSpec>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterResponse {
    pub cluster_name: String,
}

/// Addresses a single cluster. Used by GetCluster, ClusterStatus, GetToken and GetKubeConfig.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterRef {
    pub provider: String,
    pub region: String,
    pub account_name: String,
    pub cluster_name: String,
}

pub type GetClusterRequest = ClusterRef;
pub type ClusterStatusRequest = ClusterRef;
pub type GetTokenRequest = ClusterRef;
pub type GetKubeConfigRequest = ClusterRef;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetClustersRequest {
    pub provider: String,
    pub region: String,
    pub account_name: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetClustersResponse {
    pub clusters: Vec<ClusterSpec>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterStatusResponse {
    pub status: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSpawnRequest {
    pub provider: String,
    pub region: String,
    pub account_name: String,
    pub cluster_name: String,
    pub node_spec: NodeSpec,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NodeSpawnResponse {}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterDeleteRequest {
    pub provider: String,
    pub region: String,
    pub account_name: String,
    pub cluster_name: String,
    /// Delete the cluster's node groups before the cluster itself.
    pub force_delete: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClusterDeleteResponse {}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeDeleteRequest {
    pub provider: String,
    pub region: String,
    pub account_name: String,
    pub cluster_name: String,
    pub node_group_name: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NodeDeleteResponse {}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetTokenResponse {
    pub token: String,
    pub ca_data: String,
    pub endpoint: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetKubeConfigResponse {
    pub cluster_name: String,
    /// A kubeconfig YAML document.
    pub config: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateVolumeRequest {
    pub provider: String,
    pub region: String,
    pub account_name: String,
    pub availability_zone: String,
    pub volume_type: String,
    /// Size in GiB.
    pub size: i32,
    pub snapshot_id: Option<String>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateVolumeResponse {
    pub volume_id: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteVolumeRequest {
    pub provider: String,
    pub region: String,
    pub account_name: String,
    pub volume_id: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteVolumeResponse {
    pub deleted: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSnapshotRequest {
    pub provider: String,
    pub region: String,
    pub account_name: String,
    pub volume_id: String,
    pub labels: BTreeMap<String, String>,
}

pub type CreateSnapshotAndDeleteRequest = CreateSnapshotRequest;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSnapshotResponse {
    pub snapshot_id: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSnapshotAndDeleteResponse {
    pub snapshot_id: String,
    pub volume_deleted: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagNodeInstanceRequest {
    pub provider: String,
    pub region: String,
    pub account_name: String,
    pub cluster_name: String,
    pub node_group_name: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TagNodeInstanceResponse {}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteCredentialRequest {
    pub account: String,
    pub provider: String,
    pub credentials: Credentials,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct WriteCredentialResponse {}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadCredentialRequest {
    pub account: String,
    pub provider: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadCredentialResponse {
    pub account: String,
    pub credentials: Credentials,
}
