//! The IAM roles EKS clusters and their node groups run as.

use crate::api::{IamApi, IamRole};
use log::info;
use serde_json::json;
use spawner_provider::ProviderResult;

/// Role assumed by the EKS control plane.
pub const CLUSTER_ROLE_NAME: &str = "spawner-AWS-ServiceRoleForEKS";
/// Role assumed by node group instances.
pub const NODEGROUP_ROLE_NAME: &str = "spawner-AWS-NodeGroupInstanceRole";

pub const EKS_CLUSTER_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonEKSClusterPolicy";
pub const EKS_SERVICE_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonEKSServicePolicy";
pub const EKS_WORKER_NODE_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonEKSWorkerNodePolicy";
pub const ECR_READ_ONLY_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/AmazonEC2ContainerRegistryReadOnly";
pub const EKS_CNI_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonEKS_CNI_Policy";

pub const CLUSTER_POLICY_ARNS: [&str; 2] = [EKS_CLUSTER_POLICY_ARN, EKS_SERVICE_POLICY_ARN];
pub const NODEGROUP_POLICY_ARNS: [&str; 3] = [
    EKS_WORKER_NODE_POLICY_ARN,
    ECR_READ_ONLY_POLICY_ARN,
    EKS_CNI_POLICY_ARN,
];

/// A trust policy that lets `service` assume the role.
pub fn assume_role_policy(service: &str) -> String {
    json!({"Version": "2012-10-17", "Statement": [{
        "Effect": "Allow",
        "Principal": {
            "Service": [service]
        },
        "Action": ["sts:AssumeRole"]
    }]})
    .to_string()
}

/// Get the role named `role_name`, creating it with `assume_role_policy` if it does not exist.
/// The returned flag is `true` when the role was created by this call.
pub async fn ensure_role(
    iam: &dyn IamApi,
    role_name: &str,
    description: &str,
    assume_role_policy: &str,
) -> ProviderResult<(IamRole, bool)> {
    if let Some(role) = iam.get_role(role_name).await? {
        info!("Using existing role '{}'", role.name);
        return Ok((role, false));
    }
    info!("'{}' role does not exist, creating the role", role_name);
    let role = iam
        .create_role(role_name, description, assume_role_policy)
        .await?;
    Ok((role, true))
}

pub async fn attach_policy(
    iam: &dyn IamApi,
    role_name: &str,
    policy_arn: &str,
) -> ProviderResult<()> {
    iam.attach_role_policy(role_name, policy_arn).await?;
    info!("Attached policy '{}' to role '{}'", policy_arn, role_name);
    Ok(())
}

/// Ensure the role exists. Policies are attached only when the role is created here; an existing
/// role is used as-is. A failed attachment leaves the created role in place.
pub async fn ensure_role_with_policies(
    iam: &dyn IamApi,
    role_name: &str,
    description: &str,
    service: &str,
    policy_arns: &[&str],
) -> ProviderResult<IamRole> {
    let (role, created) =
        ensure_role(iam, role_name, description, &assume_role_policy(service)).await?;
    if created {
        for policy_arn in policy_arns {
            attach_policy(iam, &role.name, policy_arn).await?;
        }
    }
    Ok(role)
}

/// The control plane role, with the EKS cluster and service policies.
pub async fn ensure_cluster_role(iam: &dyn IamApi) -> ProviderResult<IamRole> {
    ensure_role_with_policies(
        iam,
        CLUSTER_ROLE_NAME,
        "Allows EKS to manage clusters created by spawner",
        "eks.amazonaws.com",
        &CLUSTER_POLICY_ARNS,
    )
    .await
}

/// The node instance role, with the worker node, ECR read-only and CNI policies.
pub async fn ensure_nodegroup_role(iam: &dyn IamApi) -> ProviderResult<IamRole> {
    ensure_role_with_policies(
        iam,
        NODEGROUP_ROLE_NAME,
        "Allows nodegroup instances created by spawner to join EKS clusters",
        "ec2.amazonaws.com",
        &NODEGROUP_POLICY_ARNS,
    )
    .await
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trust_policy_names_service() {
        let policy: serde_json::Value =
            serde_json::from_str(&assume_role_policy("eks.amazonaws.com")).unwrap();
        assert_eq!(
            policy["Statement"][0]["Principal"]["Service"][0],
            "eks.amazonaws.com"
        );
        assert_eq!(policy["Statement"][0]["Action"][0], "sts:AssumeRole");
        assert_eq!(policy["Version"], "2012-10-17");
    }
}
