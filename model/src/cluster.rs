use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The canonical description of a cluster and its nodes. Identified by `(provider, region, name)`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_name: String,
    #[serde(default)]
    pub node_specs: Vec<NodeSpec>,
}

/// A node, or a node group when it is the subject of a create or delete request.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSpec {
    pub name: String,
    pub instance_type: String,
    /// Disk size in MiB. Vendors that size disks in GiB round up at their boundary.
    #[serde(rename = "diskSizeMB")]
    pub disk_size_mb: i64,
    pub gpu_enabled: bool,
    pub labels: BTreeMap<String, String>,
    pub host_name: String,
    pub ip_addr: String,
    pub uuid: String,
    pub availability_zone: String,
    pub state: NodeState,
}

/// Whether a node is serving. Derived from the vendor's view of the node, never stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Active,
    Inactive,
}

impl Default for NodeState {
    fn default() -> Self {
        Self::Inactive
    }
}

serde_plain::derive_display_from_serialize!(NodeState);

impl NodeSpec {
    /// Disk size rounded up to whole GiB, `None` when no size was requested.
    pub fn disk_size_gib(&self) -> Option<i32> {
        if self.disk_size_mb <= 0 {
            return None;
        }
        let gib = (self.disk_size_mb + 1023) / 1024;
        Some(i32::try_from(gib).unwrap_or(i32::MAX))
    }
}
