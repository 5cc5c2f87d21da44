//! Derivation of EKS node group creation payloads from a requested [`NodeSpec`].

use crate::api::{EksApi, EksCluster, EksNodegroup, IamRole, NodegroupConfig, ScalingConfig};
use log::debug;
use spawner_model::constants::{
    CREATOR_LABEL, INSTANCE_LABEL, NODEGROUP_TYPE, NODE_LABEL_SELECTOR_LABEL, NODE_NAME_LABEL,
    SPAWNER_SERVICE_LABEL, TYPE_LABEL,
};
use spawner_model::{ErrorKind, NodeSpec};
use spawner_provider::{ProviderError, ProviderResult};
use std::collections::BTreeMap;

/// Amazon Linux 2 for instances without GPUs.
pub const AMI_TYPE: &str = "AL2_x86_64";
/// Amazon Linux 2 with GPU drivers.
pub const GPU_AMI_TYPE: &str = "AL2_x86_64_GPU";
pub const CAPACITY_TYPE: &str = "ON_DEMAND";

/// Node groups are not autoscaled.
pub const SCALING: ScalingConfig = ScalingConfig {
    desired_size: 1,
    min_size: 1,
    max_size: 1,
};

pub fn ami_type(node_spec: &NodeSpec) -> &'static str {
    if node_spec.gpu_enabled {
        GPU_AMI_TYPE
    } else {
        AMI_TYPE
    }
}

/// The labels every node group created here carries.
pub fn system_labels(node_spec: &NodeSpec) -> BTreeMap<String, String> {
    [
        (CREATOR_LABEL, SPAWNER_SERVICE_LABEL),
        (NODE_NAME_LABEL, node_spec.name.as_str()),
        (NODE_LABEL_SELECTOR_LABEL, node_spec.name.as_str()),
        (INSTANCE_LABEL, node_spec.instance_type.as_str()),
        (TYPE_LABEL, NODEGROUP_TYPE),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

/// System labels, overlaid by the donor's labels, overlaid by the caller's labels.
pub fn merge_labels(
    node_spec: &NodeSpec,
    donor: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut labels = system_labels(node_spec);
    if let Some(donor) = donor {
        labels.extend(donor.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    labels.extend(
        node_spec
            .labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    labels
}

/// Find the node group a new node group named `nodegroup_name` copies its settings from.
///
/// Fails with `NoNodeGroup` if the cluster has no node groups and with `NodeGroupExists` if one
/// is already named `nodegroup_name`. Otherwise the first node group EKS lists is described and
/// returned; EKS does not define the listing order, so which group that is may vary.
pub async fn default_nodegroup(
    eks: &dyn EksApi,
    cluster_name: &str,
    nodegroup_name: &str,
) -> ProviderResult<EksNodegroup> {
    let nodegroups = eks.list_nodegroups(cluster_name).await?;
    debug!(
        "Cluster '{}' has nodegroups {:?}",
        cluster_name, nodegroups
    );
    if nodegroups.iter().any(|name| name == nodegroup_name) {
        return Err(ProviderError::new_with_context(
            ErrorKind::NodeGroupExists,
            format!(
                "Nodegroup '{}' already exists in cluster '{}'",
                nodegroup_name, cluster_name
            ),
        ));
    }
    let first = nodegroups.first().ok_or_else(|| {
        ProviderError::new_with_context(
            ErrorKind::NoNodeGroup,
            format!("Cluster '{}' has no nodegroups", cluster_name),
        )
    })?;
    eks.describe_nodegroup(cluster_name, first).await
}

/// A node group configuration built from the cluster's own network settings.
pub fn config_from_cluster(
    cluster: &EksCluster,
    node_role: &IamRole,
    node_spec: &NodeSpec,
) -> NodegroupConfig {
    NodegroupConfig {
        cluster_name: cluster.name.clone(),
        nodegroup_name: node_spec.name.clone(),
        ami_type: Some(ami_type(node_spec).to_string()),
        capacity_type: Some(CAPACITY_TYPE.to_string()),
        node_role: Some(node_role.arn.clone()),
        release_version: None,
        subnets: cluster.subnet_ids.clone(),
        instance_types: vec![node_spec.instance_type.clone()],
        disk_size: node_spec.disk_size_gib(),
        labels: merge_labels(node_spec, None),
        scaling: SCALING,
    }
}

/// A node group configuration copied from `donor`, with only the name, instance type, disk size
/// and labels taken from `node_spec`.
pub fn config_from_default(
    donor: &EksNodegroup,
    cluster_name: &str,
    node_spec: &NodeSpec,
) -> NodegroupConfig {
    NodegroupConfig {
        cluster_name: cluster_name.to_string(),
        nodegroup_name: node_spec.name.clone(),
        ami_type: donor.ami_type.clone(),
        capacity_type: donor.capacity_type.clone(),
        node_role: donor.node_role.clone(),
        release_version: donor.release_version.clone(),
        subnets: donor.subnets.clone(),
        instance_types: vec![node_spec.instance_type.clone()],
        disk_size: node_spec.disk_size_gib(),
        labels: merge_labels(node_spec, Some(&donor.labels)),
        scaling: SCALING,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use maplit::btreemap;

    fn node_spec() -> NodeSpec {
        NodeSpec {
            name: "gpu-pool".to_string(),
            instance_type: "p3.2xlarge".to_string(),
            disk_size_mb: 40 * 1024,
            gpu_enabled: true,
            labels: btreemap! {
                "b".to_string() => "9".to_string(),
                "c".to_string() => "3".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn caller_labels_win_over_donor() {
        let donor = btreemap! {
            "a".to_string() => "1".to_string(),
            "b".to_string() => "2".to_string(),
        };
        let labels = merge_labels(&node_spec(), Some(&donor));
        assert_eq!(labels["a"], "1");
        assert_eq!(labels["b"], "9");
        assert_eq!(labels["c"], "3");
        assert_eq!(labels[CREATOR_LABEL], SPAWNER_SERVICE_LABEL);
        assert_eq!(labels[NODE_NAME_LABEL], "gpu-pool");
        assert_eq!(labels[NODE_LABEL_SELECTOR_LABEL], "gpu-pool");
        assert_eq!(labels[INSTANCE_LABEL], "p3.2xlarge");
        assert_eq!(labels[TYPE_LABEL], NODEGROUP_TYPE);
        assert_eq!(labels.len(), 8);
    }

    #[test]
    fn cluster_config_uses_cluster_subnets_and_gpu_image() {
        let cluster = EksCluster {
            name: "aws-us-east-1".to_string(),
            subnet_ids: vec!["subnet-1".to_string(), "subnet-2".to_string()],
            ..Default::default()
        };
        let role = IamRole {
            name: "node-role".to_string(),
            arn: "arn:aws:iam::123456789012:role/node-role".to_string(),
        };
        let config = config_from_cluster(&cluster, &role, &node_spec());
        assert_eq!(config.ami_type.as_deref(), Some(GPU_AMI_TYPE));
        assert_eq!(config.capacity_type.as_deref(), Some(CAPACITY_TYPE));
        assert_eq!(config.node_role.as_deref(), Some(role.arn.as_str()));
        assert_eq!(config.subnets, cluster.subnet_ids);
        assert_eq!(config.disk_size, Some(40));
        assert_eq!(config.scaling, SCALING);
    }

    #[test]
    fn default_config_copies_donor() {
        let donor = EksNodegroup {
            name: "default".to_string(),
            ami_type: Some(AMI_TYPE.to_string()),
            capacity_type: Some("SPOT".to_string()),
            node_role: Some("arn:aws:iam::123456789012:role/donor".to_string()),
            subnets: vec!["subnet-9".to_string()],
            release_version: Some("1.24.7-20221222".to_string()),
            instance_types: vec!["m5.large".to_string()],
            disk_size: Some(20),
            ..Default::default()
        };
        let config = config_from_default(&donor, "aws-us-east-1", &node_spec());
        assert_eq!(config.nodegroup_name, "gpu-pool");
        assert_eq!(config.ami_type, donor.ami_type);
        assert_eq!(config.capacity_type.as_deref(), Some("SPOT"));
        assert_eq!(config.node_role, donor.node_role);
        assert_eq!(config.subnets, donor.subnets);
        assert_eq!(config.release_version, donor.release_version);
        assert_eq!(config.instance_types, vec!["p3.2xlarge".to_string()]);
        assert_eq!(config.disk_size, Some(40));
    }
}
