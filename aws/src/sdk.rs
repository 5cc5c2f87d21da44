use crate::api::{
    ClusterConfig, Ec2Api, EksApi, EksCluster, EksNodegroup, IamApi, IamRole, NodegroupConfig,
    VolumeConfig,
};
use async_trait::async_trait;
use aws_sdk_ec2::model::{Filter, ResourceType, Tag, TagSpecification, VolumeType};
use aws_sdk_eks::error::{
    DeleteNodegroupError, DeleteNodegroupErrorKind, DescribeClusterError,
    DescribeClusterErrorKind, ListNodegroupsError, ListNodegroupsErrorKind,
};
use aws_sdk_eks::model::{
    AmiTypes, CapacityTypes, Cluster, Nodegroup, NodegroupScalingConfig, VpcConfigRequest,
};
use aws_sdk_eks::output::DescribeClusterOutput;
use aws_sdk_eks::types::SdkError;
use aws_sdk_iam::error::GetRoleErrorKind;
use aws_sdk_iam::model::Role;
use aws_types::SdkConfig;
use log::trace;
use spawner_model::ErrorKind;
use spawner_provider::{IntoProviderError, ProviderError, ProviderResult};
use std::collections::BTreeMap;

pub(crate) struct SdkEks {
    client: aws_sdk_eks::Client,
}

impl SdkEks {
    pub(crate) fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_eks::Client::new(config),
        }
    }
}

#[async_trait]
impl EksApi for SdkEks {
    async fn describe_cluster(&self, name: &str) -> ProviderResult<Option<EksCluster>> {
        let describe_cluster_result = self.client.describe_cluster().name(name).send().await;
        if not_found(&describe_cluster_result) {
            return Ok(None);
        }
        let cluster = describe_cluster_result
            .context(
                ErrorKind::Vendor,
                format!("Unable to describe cluster '{}'", name),
            )?
            .cluster
            .context(
                ErrorKind::Vendor,
                format!("Response for cluster '{}' is missing the cluster", name),
            )?;
        Ok(Some(eks_cluster(cluster)))
    }

    async fn create_cluster(&self, config: &ClusterConfig) -> ProviderResult<EksCluster> {
        let cluster = self
            .client
            .create_cluster()
            .name(&config.name)
            .role_arn(&config.role_arn)
            .resources_vpc_config(
                VpcConfigRequest::builder()
                    .set_subnet_ids(Some(config.subnet_ids.clone()))
                    .build(),
            )
            .set_version(config.version.clone())
            .set_tags(Some(config.tags.clone().into_iter().collect()))
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!("Unable to create cluster '{}'", config.name),
            )?
            .cluster
            .context(
                ErrorKind::Vendor,
                format!("Create response for '{}' is missing the cluster", config.name),
            )?;
        Ok(eks_cluster(cluster))
    }

    async fn delete_cluster(&self, name: &str) -> ProviderResult<EksCluster> {
        let cluster = self
            .client
            .delete_cluster()
            .name(name)
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!("Unable to delete cluster '{}'", name),
            )?
            .cluster
            .context(
                ErrorKind::Vendor,
                format!("Delete response for '{}' is missing the cluster", name),
            )?;
        Ok(eks_cluster(cluster))
    }

    async fn list_clusters(&self) -> ProviderResult<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .list_clusters()
                .set_next_token(next_token.take())
                .send()
                .await
                .context(ErrorKind::Vendor, "Unable to list clusters")?;
            names.extend(output.clusters.unwrap_or_default());
            match output.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(names)
    }

    async fn list_nodegroups(&self, cluster: &str) -> ProviderResult<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .list_nodegroups()
                .cluster_name(cluster)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| {
                    ProviderError::new_with_source_and_context(
                        list_nodegroups_error_kind(&e),
                        format!("Unable to list nodegroups of cluster '{}'", cluster),
                        e,
                    )
                })?;
            names.extend(output.nodegroups.unwrap_or_default());
            match output.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(names)
    }

    async fn describe_nodegroup(
        &self,
        cluster: &str,
        nodegroup: &str,
    ) -> ProviderResult<EksNodegroup> {
        let nodegroup = self
            .client
            .describe_nodegroup()
            .cluster_name(cluster)
            .nodegroup_name(nodegroup)
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!(
                    "Unable to describe nodegroup '{}' of cluster '{}'",
                    nodegroup, cluster
                ),
            )?
            .nodegroup
            .context(
                ErrorKind::Vendor,
                format!("Response for nodegroup '{}' is missing the nodegroup", nodegroup),
            )?;
        Ok(eks_nodegroup(nodegroup))
    }

    async fn create_nodegroup(&self, config: &NodegroupConfig) -> ProviderResult<EksNodegroup> {
        trace!("Creating nodegroup with {:?}", config);
        let nodegroup = self
            .client
            .create_nodegroup()
            .cluster_name(&config.cluster_name)
            .nodegroup_name(&config.nodegroup_name)
            .set_ami_type(config.ami_type.as_deref().map(AmiTypes::from))
            .set_capacity_type(config.capacity_type.as_deref().map(CapacityTypes::from))
            .set_node_role(config.node_role.clone())
            .set_release_version(config.release_version.clone())
            .set_subnets(Some(config.subnets.clone()))
            .set_instance_types(Some(config.instance_types.clone()))
            .set_disk_size(config.disk_size)
            .set_labels(Some(config.labels.clone().into_iter().collect()))
            .scaling_config(
                NodegroupScalingConfig::builder()
                    .desired_size(config.scaling.desired_size)
                    .min_size(config.scaling.min_size)
                    .max_size(config.scaling.max_size)
                    .build(),
            )
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!(
                    "Unable to create nodegroup '{}' in cluster '{}'",
                    config.nodegroup_name, config.cluster_name
                ),
            )?
            .nodegroup
            .context(
                ErrorKind::Vendor,
                format!(
                    "Create response for '{}' is missing the nodegroup",
                    config.nodegroup_name
                ),
            )?;
        Ok(eks_nodegroup(nodegroup))
    }

    async fn delete_nodegroup(
        &self,
        cluster: &str,
        nodegroup: &str,
    ) -> ProviderResult<EksNodegroup> {
        let nodegroup = self
            .client
            .delete_nodegroup()
            .cluster_name(cluster)
            .nodegroup_name(nodegroup)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    delete_nodegroup_error_kind(&e),
                    format!(
                        "Unable to delete nodegroup '{}' of cluster '{}'",
                        nodegroup, cluster
                    ),
                    e,
                )
            })?
            .nodegroup
            .context(
                ErrorKind::Vendor,
                format!("Delete response for '{}' is missing the nodegroup", nodegroup),
            )?;
        Ok(eks_nodegroup(nodegroup))
    }
}

fn not_found(
    result: &std::result::Result<DescribeClusterOutput, SdkError<DescribeClusterError>>,
) -> bool {
    if let Err(SdkError::ServiceError(service_error)) = result {
        if matches!(
            &service_error.err().kind,
            DescribeClusterErrorKind::ResourceNotFoundException(_)
        ) {
            return true;
        }
    }
    false
}

/// `NotFound` when EKS does not know the cluster.
fn list_nodegroups_error_kind(error: &SdkError<ListNodegroupsError>) -> ErrorKind {
    match error {
        SdkError::ServiceError(service_error)
            if matches!(
                &service_error.err().kind,
                ListNodegroupsErrorKind::ResourceNotFoundException(_)
            ) =>
        {
            ErrorKind::NotFound
        }
        _ => ErrorKind::Vendor,
    }
}

/// `NotFound` when EKS does not know the cluster or the nodegroup.
fn delete_nodegroup_error_kind(error: &SdkError<DeleteNodegroupError>) -> ErrorKind {
    match error {
        SdkError::ServiceError(service_error)
            if matches!(
                &service_error.err().kind,
                DeleteNodegroupErrorKind::ResourceNotFoundException(_)
            ) =>
        {
            ErrorKind::NotFound
        }
        _ => ErrorKind::Vendor,
    }
}

fn eks_cluster(cluster: Cluster) -> EksCluster {
    EksCluster {
        name: cluster.name.unwrap_or_default(),
        status: cluster
            .status
            .map(|status| status.as_str().to_string())
            .unwrap_or_default(),
        endpoint: cluster.endpoint,
        certificate_authority: cluster.certificate_authority.and_then(|ca| ca.data),
        subnet_ids: cluster
            .resources_vpc_config
            .and_then(|vpc| vpc.subnet_ids)
            .unwrap_or_default(),
        version: cluster.version,
    }
}

fn eks_nodegroup(nodegroup: Nodegroup) -> EksNodegroup {
    EksNodegroup {
        name: nodegroup.nodegroup_name.unwrap_or_default(),
        status: nodegroup
            .status
            .map(|status| status.as_str().to_string())
            .unwrap_or_default(),
        ami_type: nodegroup.ami_type.map(|ami| ami.as_str().to_string()),
        capacity_type: nodegroup
            .capacity_type
            .map(|capacity| capacity.as_str().to_string()),
        node_role: nodegroup.node_role,
        subnets: nodegroup.subnets.unwrap_or_default(),
        release_version: nodegroup.release_version,
        labels: nodegroup.labels.unwrap_or_default().into_iter().collect(),
        instance_types: nodegroup.instance_types.unwrap_or_default(),
        disk_size: nodegroup.disk_size,
    }
}

pub(crate) struct SdkIam {
    client: aws_sdk_iam::Client,
}

impl SdkIam {
    pub(crate) fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_iam::Client::new(config),
        }
    }
}

#[async_trait]
impl IamApi for SdkIam {
    async fn get_role(&self, name: &str) -> ProviderResult<Option<IamRole>> {
        match self.client.get_role().role_name(name).send().await {
            Ok(output) => {
                let role = output.role.context(
                    ErrorKind::Vendor,
                    format!("Response for role '{}' is missing the role", name),
                )?;
                Ok(Some(iam_role(role)))
            }
            Err(SdkError::ServiceError(service_error))
                if matches!(
                    &service_error.err().kind,
                    GetRoleErrorKind::NoSuchEntityException(_)
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e).context(ErrorKind::Vendor, format!("Unable to get role '{}'", name)),
        }
    }

    async fn create_role(
        &self,
        name: &str,
        description: &str,
        assume_role_policy: &str,
    ) -> ProviderResult<IamRole> {
        let role = self
            .client
            .create_role()
            .role_name(name)
            .description(description)
            .assume_role_policy_document(assume_role_policy)
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!("Unable to create role '{}'", name),
            )?
            .role
            .context(
                ErrorKind::Vendor,
                format!("Create response for role '{}' is missing the role", name),
            )?;
        Ok(iam_role(role))
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> ProviderResult<()> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!(
                    "Unable to attach policy '{}' to role '{}'",
                    policy_arn, role_name
                ),
            )?;
        Ok(())
    }
}

fn iam_role(role: Role) -> IamRole {
    IamRole {
        name: role.role_name.unwrap_or_default(),
        arn: role.arn.unwrap_or_default(),
    }
}

pub(crate) struct SdkEc2 {
    client: aws_sdk_ec2::Client,
}

impl SdkEc2 {
    pub(crate) fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ec2::Client::new(config),
        }
    }
}

#[async_trait]
impl Ec2Api for SdkEc2 {
    async fn default_subnets(&self) -> ProviderResult<Vec<String>> {
        let vpc_id = self
            .client
            .describe_vpcs()
            .filters(Filter::builder().name("isDefault").values("true").build())
            .send()
            .await
            .context(ErrorKind::Vendor, "Unable to list VPCs")?
            .vpcs
            .unwrap_or_default()
            .into_iter()
            .find_map(|vpc| vpc.vpc_id)
            .context(ErrorKind::NotFound, "The region has no default VPC")?;
        let subnets = self
            .client
            .describe_subnets()
            .filters(Filter::builder().name("vpc-id").values(&vpc_id).build())
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!("Unable to get the subnets of VPC '{}'", vpc_id),
            )?
            .subnets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|subnet| subnet.subnet_id)
            .collect();
        Ok(subnets)
    }

    async fn create_volume(&self, config: &VolumeConfig) -> ProviderResult<String> {
        self.client
            .create_volume()
            .availability_zone(&config.availability_zone)
            .volume_type(VolumeType::from(config.volume_type.as_str()))
            .size(config.size)
            .set_snapshot_id(config.snapshot_id.clone())
            .tag_specifications(tag_specification(ResourceType::Volume, &config.tags))
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!(
                    "Unable to create a volume in '{}'",
                    config.availability_zone
                ),
            )?
            .volume_id
            .context(ErrorKind::Vendor, "Create response is missing the volume id")
    }

    async fn delete_volume(&self, volume_id: &str) -> ProviderResult<()> {
        self.client
            .delete_volume()
            .volume_id(volume_id)
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!("Unable to delete volume '{}'", volume_id),
            )?;
        Ok(())
    }

    async fn create_snapshot(
        &self,
        volume_id: &str,
        tags: &BTreeMap<String, String>,
    ) -> ProviderResult<String> {
        self.client
            .create_snapshot()
            .volume_id(volume_id)
            .tag_specifications(tag_specification(ResourceType::Snapshot, tags))
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!("Unable to snapshot volume '{}'", volume_id),
            )?
            .snapshot_id
            .context(ErrorKind::Vendor, "Create response is missing the snapshot id")
    }

    async fn nodegroup_instances(
        &self,
        cluster: &str,
        nodegroup: &str,
    ) -> ProviderResult<Vec<String>> {
        let mut instance_ids = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .describe_instances()
                .filters(
                    Filter::builder()
                        .name("tag:eks:cluster-name")
                        .values(cluster)
                        .build(),
                )
                .filters(
                    Filter::builder()
                        .name("tag:eks:nodegroup-name")
                        .values(nodegroup)
                        .build(),
                )
                .filters(
                    Filter::builder()
                        .name("instance-state-name")
                        .values("pending")
                        .values("running")
                        .build(),
                )
                .set_next_token(next_token.take())
                .send()
                .await
                .context(
                    ErrorKind::Vendor,
                    format!("Unable to list the instances of nodegroup '{}'", nodegroup),
                )?;
            instance_ids.extend(
                output
                    .reservations
                    .unwrap_or_default()
                    .into_iter()
                    .flat_map(|reservation| reservation.instances.unwrap_or_default())
                    .filter_map(|instance| instance.instance_id),
            );
            match output.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(instance_ids)
    }

    async fn create_tags(
        &self,
        resource_ids: &[String],
        tags: &BTreeMap<String, String>,
    ) -> ProviderResult<()> {
        self.client
            .create_tags()
            .set_resources(Some(resource_ids.to_vec()))
            .set_tags(Some(ec2_tags(tags)))
            .send()
            .await
            .context(
                ErrorKind::Vendor,
                format!("Unable to tag {}", resource_ids.join(", ")),
            )?;
        Ok(())
    }
}

fn ec2_tags(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag::builder().key(key).value(value).build())
        .collect()
}

fn tag_specification(
    resource_type: ResourceType,
    tags: &BTreeMap<String, String>,
) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(resource_type)
        .set_tags(Some(ec2_tags(tags)))
        .build()
}
