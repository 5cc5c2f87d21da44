/*!

This test module provides an in-memory stand-in for EKS, IAM, EC2 and the clusters' Kubernetes APIs
so that the EKS engine can be tested without an AWS account. Every mutating call is recorded so
tests can assert on what would have been sent to AWS.

!*/

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use spawner_aws::api::{
    ClusterConfig, ControlPlane, Ec2Api, EksApi, EksCluster, EksNodegroup, IamApi, IamRole,
    KubeApi, NodegroupConfig, VolumeConfig,
};
use spawner_aws::{Session, SessionFactory};
use spawner_model::ErrorKind;
use spawner_provider::{ProviderError, ProviderResult};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "k8s-aws-v1.mock";

#[derive(Default)]
pub struct CloudState {
    /// Clusters in listing order.
    pub clusters: Vec<EksCluster>,
    /// Nodegroups of each cluster in listing order.
    pub nodegroups: BTreeMap<String, Vec<EksNodegroup>>,
    pub roles: BTreeMap<String, IamRole>,
    pub nodes: BTreeMap<String, Vec<Node>>,
    pub instances: BTreeMap<(String, String), Vec<String>>,

    /// `(cluster, nodegroup)` pairs whose describe call fails.
    pub broken_nodegroups: HashSet<(String, String)>,
    /// Clusters whose nodegroup listing fails.
    pub broken_listings: HashSet<String>,
    pub fail_volume_delete: bool,
    /// Every cluster describe fails with a vendor error.
    pub fail_describe_cluster: bool,
    /// Attaching this policy fails.
    pub failing_policy: Option<String>,

    pub cluster_creates: Vec<ClusterConfig>,
    pub nodegroup_creates: Vec<NodegroupConfig>,
    pub role_creates: Vec<String>,
    /// `(role, policy)` pairs.
    pub policy_attachments: Vec<(String, String)>,
    pub deleted_clusters: Vec<String>,
    pub deleted_nodegroups: Vec<(String, String)>,
    pub volume_creates: Vec<VolumeConfig>,
    pub deleted_volumes: Vec<String>,
    pub snapshots: Vec<(String, BTreeMap<String, String>)>,
    pub tagged: Vec<(Vec<String>, BTreeMap<String, String>)>,
    /// `(region, account)` of every opened session.
    pub sessions: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub struct MockCloud {
    state: Arc<Mutex<CloudState>>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect or seed the cloud.
    pub fn with<R>(&self, f: impl FnOnce(&mut CloudState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add_cluster(&self, cluster: EksCluster) {
        self.with(|state| {
            state.nodegroups.entry(cluster.name.clone()).or_default();
            state.clusters.push(cluster);
        })
    }

    pub fn add_nodegroup(&self, cluster: &str, nodegroup: EksNodegroup) {
        self.with(|state| {
            state
                .nodegroups
                .entry(cluster.to_string())
                .or_default()
                .push(nodegroup)
        })
    }

    pub fn sessions(&self) -> MockSessions {
        MockSessions {
            cloud: self.clone(),
        }
    }
}

/// An active cluster with a reachable control plane.
pub fn active_cluster(name: &str) -> EksCluster {
    EksCluster {
        name: name.to_string(),
        status: "ACTIVE".to_string(),
        endpoint: Some(format!("https://{}.gr7.us-east-1.eks.amazonaws.com", name)),
        certificate_authority: Some("Q0E=".to_string()),
        subnet_ids: vec!["subnet-a".to_string(), "subnet-b".to_string()],
        version: Some("1.24".to_string()),
    }
}

pub fn nodegroup(name: &str, labels: BTreeMap<String, String>) -> EksNodegroup {
    EksNodegroup {
        name: name.to_string(),
        status: "ACTIVE".to_string(),
        ami_type: Some("AL2_x86_64".to_string()),
        capacity_type: Some("SPOT".to_string()),
        node_role: Some("arn:aws:iam::123456789012:role/donor".to_string()),
        subnets: vec!["subnet-donor".to_string()],
        release_version: Some("1.24.7-20221222".to_string()),
        labels,
        instance_types: vec!["m5.large".to_string()],
        disk_size: Some(20),
    }
}

fn vendor_error(message: String) -> ProviderError {
    ProviderError::new_with_context(ErrorKind::Vendor, message)
}

fn not_found(message: String) -> ProviderError {
    ProviderError::new_with_context(ErrorKind::NotFound, message)
}

#[async_trait]
impl EksApi for MockCloud {
    async fn describe_cluster(&self, name: &str) -> ProviderResult<Option<EksCluster>> {
        self.with(|state| {
            if state.fail_describe_cluster {
                return Err(vendor_error(format!("describe '{}' throttled", name)));
            }
            Ok(state.clusters.iter().find(|c| c.name == name).cloned())
        })
    }

    async fn create_cluster(&self, config: &ClusterConfig) -> ProviderResult<EksCluster> {
        let cluster = EksCluster {
            name: config.name.clone(),
            status: "CREATING".to_string(),
            subnet_ids: config.subnet_ids.clone(),
            version: config.version.clone(),
            ..Default::default()
        };
        self.with(|state| {
            state.cluster_creates.push(config.clone());
            state.clusters.push(cluster.clone());
        });
        Ok(cluster)
    }

    async fn delete_cluster(&self, name: &str) -> ProviderResult<EksCluster> {
        self.with(|state| -> ProviderResult<EksCluster> {
            state.deleted_clusters.push(name.to_string());
            let cluster = state
                .clusters
                .iter()
                .find(|c| c.name == name)
                .cloned()
                .ok_or_else(|| vendor_error(format!("No cluster found for name: {}.", name)))?;
            Ok(EksCluster {
                status: "DELETING".to_string(),
                ..cluster
            })
        })
    }

    async fn list_clusters(&self) -> ProviderResult<Vec<String>> {
        Ok(self.with(|state| state.clusters.iter().map(|c| c.name.clone()).collect()))
    }

    async fn list_nodegroups(&self, cluster: &str) -> ProviderResult<Vec<String>> {
        self.with(|state| {
            if state.broken_listings.contains(cluster) {
                return Err(vendor_error(format!("listing '{}' failed", cluster)));
            }
            if !state.clusters.iter().any(|c| c.name == cluster) {
                return Err(not_found(format!("No cluster found for name: {}.", cluster)));
            }
            Ok(state
                .nodegroups
                .get(cluster)
                .map(|groups| groups.iter().map(|g| g.name.clone()).collect())
                .unwrap_or_default())
        })
    }

    async fn describe_nodegroup(
        &self,
        cluster: &str,
        nodegroup: &str,
    ) -> ProviderResult<EksNodegroup> {
        self.with(|state| {
            if state
                .broken_nodegroups
                .contains(&(cluster.to_string(), nodegroup.to_string()))
            {
                return Err(vendor_error(format!("describe '{}' failed", nodegroup)));
            }
            state
                .nodegroups
                .get(cluster)
                .and_then(|groups| groups.iter().find(|g| g.name == nodegroup))
                .cloned()
                .ok_or_else(|| {
                    vendor_error(format!("No node group found for name: {}.", nodegroup))
                })
        })
    }

    async fn create_nodegroup(&self, config: &NodegroupConfig) -> ProviderResult<EksNodegroup> {
        let nodegroup = EksNodegroup {
            name: config.nodegroup_name.clone(),
            status: "CREATING".to_string(),
            labels: config.labels.clone(),
            instance_types: config.instance_types.clone(),
            disk_size: config.disk_size,
            ..Default::default()
        };
        self.with(|state| {
            state.nodegroup_creates.push(config.clone());
            state
                .nodegroups
                .entry(config.cluster_name.clone())
                .or_default()
                .push(nodegroup.clone());
        });
        Ok(nodegroup)
    }

    async fn delete_nodegroup(
        &self,
        cluster: &str,
        nodegroup: &str,
    ) -> ProviderResult<EksNodegroup> {
        self.with(|state| {
            let exists = state
                .nodegroups
                .get(cluster)
                .map(|groups| groups.iter().any(|g| g.name == nodegroup))
                .unwrap_or(false);
            if !exists {
                return Err(not_found(format!(
                    "No node group found for name: {}.",
                    nodegroup
                )));
            }
            state
                .deleted_nodegroups
                .push((cluster.to_string(), nodegroup.to_string()));
            Ok(EksNodegroup {
                name: nodegroup.to_string(),
                status: "DELETING".to_string(),
                ..Default::default()
            })
        })
    }
}

#[async_trait]
impl IamApi for MockCloud {
    async fn get_role(&self, name: &str) -> ProviderResult<Option<IamRole>> {
        Ok(self.with(|state| state.roles.get(name).cloned()))
    }

    async fn create_role(
        &self,
        name: &str,
        _description: &str,
        _assume_role_policy: &str,
    ) -> ProviderResult<IamRole> {
        let role = IamRole {
            name: name.to_string(),
            arn: format!("arn:aws:iam::123456789012:role/{}", name),
        };
        self.with(|state| {
            state.role_creates.push(name.to_string());
            state.roles.insert(name.to_string(), role.clone());
        });
        Ok(role)
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> ProviderResult<()> {
        self.with(|state| {
            if state.failing_policy.as_deref() == Some(policy_arn) {
                return Err(vendor_error(format!("attach '{}' throttled", policy_arn)));
            }
            state
                .policy_attachments
                .push((role_name.to_string(), policy_arn.to_string()));
            Ok(())
        })
    }
}

#[async_trait]
impl Ec2Api for MockCloud {
    async fn default_subnets(&self) -> ProviderResult<Vec<String>> {
        Ok(vec!["subnet-default-1".to_string(), "subnet-default-2".to_string()])
    }

    async fn create_volume(&self, config: &VolumeConfig) -> ProviderResult<String> {
        Ok(self.with(|state| {
            state.volume_creates.push(config.clone());
            format!("vol-{:04}", state.volume_creates.len())
        }))
    }

    async fn delete_volume(&self, volume_id: &str) -> ProviderResult<()> {
        self.with(|state| {
            if state.fail_volume_delete {
                return Err(vendor_error(format!("volume '{}' is in use", volume_id)));
            }
            state.deleted_volumes.push(volume_id.to_string());
            Ok(())
        })
    }

    async fn create_snapshot(
        &self,
        volume_id: &str,
        tags: &BTreeMap<String, String>,
    ) -> ProviderResult<String> {
        Ok(self.with(|state| {
            state.snapshots.push((volume_id.to_string(), tags.clone()));
            format!("snap-{:04}", state.snapshots.len())
        }))
    }

    async fn nodegroup_instances(
        &self,
        cluster: &str,
        nodegroup: &str,
    ) -> ProviderResult<Vec<String>> {
        Ok(self.with(|state| {
            state
                .instances
                .get(&(cluster.to_string(), nodegroup.to_string()))
                .cloned()
                .unwrap_or_default()
        }))
    }

    async fn create_tags(
        &self,
        resource_ids: &[String],
        tags: &BTreeMap<String, String>,
    ) -> ProviderResult<()> {
        self.with(|state| state.tagged.push((resource_ids.to_vec(), tags.clone())));
        Ok(())
    }
}

#[async_trait]
impl KubeApi for MockCloud {
    async fn token(&self, _control_plane: &ControlPlane) -> ProviderResult<String> {
        Ok(TOKEN.to_string())
    }

    async fn list_nodes(&self, control_plane: &ControlPlane) -> ProviderResult<Vec<Node>> {
        Ok(self.with(|state| {
            state
                .nodes
                .get(&control_plane.cluster_name)
                .cloned()
                .unwrap_or_default()
        }))
    }
}

/// Opens sessions that all talk to the same [`MockCloud`].
pub struct MockSessions {
    cloud: MockCloud,
}

#[async_trait]
impl SessionFactory for MockSessions {
    async fn open(&self, region: &str, account_name: &str) -> ProviderResult<Session> {
        self.cloud.with(|state| {
            state
                .sessions
                .push((region.to_string(), account_name.to_string()))
        });
        let cloud = Arc::new(self.cloud.clone());
        Ok(Session::new(
            region,
            cloud.clone(),
            cloud.clone(),
            cloud.clone(),
            cloud,
        ))
    }
}
