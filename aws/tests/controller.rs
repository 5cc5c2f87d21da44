pub(crate) mod mock;

use k8s_openapi::api::core::v1::{Node, NodeCondition, NodeStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use maplit::btreemap;
use mock::{active_cluster, nodegroup, MockCloud, TOKEN};
use spawner_aws::iam::{
    CLUSTER_POLICY_ARNS, CLUSTER_ROLE_NAME, NODEGROUP_POLICY_ARNS, NODEGROUP_ROLE_NAME,
};
use spawner_aws::nodegroup::{AMI_TYPE, GPU_AMI_TYPE, SCALING};
use spawner_aws::{AwsController, AwsSettings};
use spawner_model::constants::{CREATOR_LABEL, NODE_NAME_LABEL, SPAWNER_SERVICE_LABEL};
use spawner_model::requests::{
    ClusterDeleteRequest, ClusterRef, ClusterRequest, CreateSnapshotRequest, CreateVolumeRequest,
    GetClustersRequest, NodeDeleteRequest, NodeSpawnRequest, TagNodeInstanceRequest,
};
use spawner_model::{ErrorKind, NodeSpec, NodeState};
use spawner_provider::Controller;

fn controller(cloud: &MockCloud) -> AwsController<mock::MockSessions> {
    AwsController::new(cloud.sessions(), AwsSettings::default())
}

fn cluster_ref(cluster_name: &str) -> ClusterRef {
    ClusterRef {
        provider: "aws".to_string(),
        region: "us-east-1".to_string(),
        account_name: "acme".to_string(),
        cluster_name: cluster_name.to_string(),
    }
}

fn spawn_request(cluster_name: &str, node_spec: NodeSpec) -> NodeSpawnRequest {
    NodeSpawnRequest {
        provider: "aws".to_string(),
        region: "us-east-1".to_string(),
        account_name: "acme".to_string(),
        cluster_name: cluster_name.to_string(),
        node_spec,
    }
}

fn node_spec(name: &str) -> NodeSpec {
    NodeSpec {
        name: name.to_string(),
        instance_type: "p3.2xlarge".to_string(),
        disk_size_mb: 100 * 1024,
        ..Default::default()
    }
}

/// Creating a cluster without a name derives it from provider and region, and a second identical
/// request finds the cluster instead of creating it again.
#[tokio::test]
async fn create_cluster_is_idempotent() {
    let cloud = MockCloud::new();
    let controller = controller(&cloud);
    let request = ClusterRequest {
        provider: "aws".to_string(),
        region: "us-east-1".to_string(),
        account_name: "acme".to_string(),
        labels: btreemap! {"team".to_string() => "ml".to_string()},
        ..Default::default()
    };

    let first = controller.create_cluster(request.clone()).await.unwrap();
    let second = controller.create_cluster(request).await.unwrap();
    assert_eq!(first.cluster_name, "aws-us-east-1");
    assert_eq!(second.cluster_name, "aws-us-east-1");

    cloud.with(|state| {
        assert_eq!(state.cluster_creates.len(), 1);
        let create = &state.cluster_creates[0];
        assert_eq!(create.name, "aws-us-east-1");
        assert_eq!(create.version.as_deref(), Some("1.24"));
        assert_eq!(
            create.subnet_ids,
            vec!["subnet-default-1".to_string(), "subnet-default-2".to_string()]
        );
        assert_eq!(create.tags["team"], "ml");
        assert_eq!(create.tags[CREATOR_LABEL], SPAWNER_SERVICE_LABEL);
        assert!(create.role_arn.ends_with(CLUSTER_ROLE_NAME));
        assert_eq!(state.role_creates, vec![CLUSTER_ROLE_NAME.to_string()]);
        assert_eq!(state.policy_attachments.len(), CLUSTER_POLICY_ARNS.len());
        assert_eq!(
            state.sessions,
            vec![
                ("us-east-1".to_string(), "acme".to_string()),
                ("us-east-1".to_string(), "acme".to_string())
            ]
        );
    });
}

#[tokio::test]
async fn create_cluster_keeps_existing_cluster() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    let response = controller(&cloud)
        .create_cluster(ClusterRequest {
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            cluster_name: "training".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(response.cluster_name, "training");
    cloud.with(|state| {
        assert!(state.cluster_creates.is_empty());
        assert!(state.role_creates.is_empty());
    });
}

/// Only a missing cluster leads to a create; any other describe failure is returned as is.
#[tokio::test]
async fn create_cluster_returns_describe_failure() {
    let cloud = MockCloud::new();
    cloud.with(|state| state.fail_describe_cluster = true);
    let err = controller(&cloud)
        .create_cluster(ClusterRequest {
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            account_name: "acme".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Vendor);
    cloud.with(|state| {
        assert!(state.cluster_creates.is_empty());
        assert!(state.role_creates.is_empty());
    });
}

/// A policy that cannot be attached to a new cluster role stops the create. The role is left in
/// place with the policies attached so far.
#[tokio::test]
async fn create_cluster_stops_on_policy_failure() {
    let cloud = MockCloud::new();
    cloud.with(|state| state.failing_policy = Some(CLUSTER_POLICY_ARNS[1].to_string()));
    let err = controller(&cloud)
        .create_cluster(ClusterRequest {
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            account_name: "acme".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Vendor);
    cloud.with(|state| {
        assert!(state.cluster_creates.is_empty());
        assert_eq!(state.role_creates, vec![CLUSTER_ROLE_NAME.to_string()]);
        assert_eq!(
            state.policy_attachments,
            vec![(
                CLUSTER_ROLE_NAME.to_string(),
                CLUSTER_POLICY_ARNS[0].to_string()
            )]
        );
    });
}

/// Without nodegroups the configuration comes from the cluster, and the node role's policies are
/// attached once, when the role is created.
#[tokio::test]
async fn add_first_nodegroup_creates_node_role() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    let controller = controller(&cloud);

    let mut gpu = node_spec("gpu-pool");
    gpu.gpu_enabled = true;
    controller
        .add_node(spawn_request("training", gpu))
        .await
        .unwrap();

    cloud.with(|state| {
        assert_eq!(state.role_creates, vec![NODEGROUP_ROLE_NAME.to_string()]);
        let attached: Vec<&str> = state
            .policy_attachments
            .iter()
            .map(|(role, policy)| {
                assert_eq!(role, NODEGROUP_ROLE_NAME);
                policy.as_str()
            })
            .collect();
        assert_eq!(attached, NODEGROUP_POLICY_ARNS.to_vec());

        let config = &state.nodegroup_creates[0];
        assert_eq!(config.nodegroup_name, "gpu-pool");
        assert_eq!(config.ami_type.as_deref(), Some(GPU_AMI_TYPE));
        assert_eq!(config.subnets, vec!["subnet-a".to_string(), "subnet-b".to_string()]);
        assert!(config
            .node_role
            .as_deref()
            .unwrap()
            .ends_with(NODEGROUP_ROLE_NAME));
        assert_eq!(config.disk_size, Some(100));
        assert_eq!(config.scaling, SCALING);
    });
}

#[tokio::test]
async fn add_first_nodegroup_reuses_node_role() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    cloud.with(|state| {
        state.roles.insert(
            NODEGROUP_ROLE_NAME.to_string(),
            spawner_aws::api::IamRole {
                name: NODEGROUP_ROLE_NAME.to_string(),
                arn: "arn:aws:iam::123456789012:role/existing".to_string(),
            },
        )
    });

    controller(&cloud)
        .add_node(spawn_request("training", node_spec("cpu-pool")))
        .await
        .unwrap();

    cloud.with(|state| {
        assert!(state.role_creates.is_empty());
        assert!(state.policy_attachments.is_empty());
        let config = &state.nodegroup_creates[0];
        assert_eq!(config.ami_type.as_deref(), Some(AMI_TYPE));
        assert_eq!(
            config.node_role.as_deref(),
            Some("arn:aws:iam::123456789012:role/existing")
        );
    });
}

/// A node role whose policies cannot all be attached stops the nodegroup create, and a later call
/// reuses the role without attaching again.
#[tokio::test]
async fn add_first_nodegroup_stops_on_policy_failure() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    cloud.with(|state| state.failing_policy = Some(NODEGROUP_POLICY_ARNS[1].to_string()));
    let controller = controller(&cloud);

    let err = controller
        .add_node(spawn_request("training", node_spec("cpu-pool")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Vendor);
    cloud.with(|state| {
        assert!(state.nodegroup_creates.is_empty());
        assert_eq!(state.role_creates, vec![NODEGROUP_ROLE_NAME.to_string()]);
        assert_eq!(state.policy_attachments.len(), 1);
        state.failing_policy = None;
    });

    controller
        .add_node(spawn_request("training", node_spec("cpu-pool")))
        .await
        .unwrap();
    cloud.with(|state| {
        assert_eq!(state.role_creates.len(), 1);
        assert_eq!(state.policy_attachments.len(), 1);
        assert_eq!(state.nodegroup_creates.len(), 1);
    });
}

#[tokio::test]
async fn add_nodegroup_without_cluster_is_not_found() {
    let cloud = MockCloud::new();
    let err = controller(&cloud)
        .add_node(spawn_request("missing", node_spec("cpu-pool")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    cloud.with(|state| assert!(state.nodegroup_creates.is_empty()));
}

/// A donor's labels are overridden by the caller's on collision; system labels are always present.
#[tokio::test]
async fn add_nodegroup_copies_donor() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    cloud.add_nodegroup(
        "training",
        nodegroup(
            "default",
            btreemap! {"a".to_string() => "1".to_string(), "b".to_string() => "2".to_string()},
        ),
    );

    let mut spec = node_spec("gpu-pool");
    spec.labels = btreemap! {
        "b".to_string() => "9".to_string(),
        "c".to_string() => "3".to_string(),
    };
    controller(&cloud)
        .add_node(spawn_request("training", spec))
        .await
        .unwrap();

    cloud.with(|state| {
        assert!(state.role_creates.is_empty());
        let config = &state.nodegroup_creates[0];
        assert_eq!(config.labels["a"], "1");
        assert_eq!(config.labels["b"], "9");
        assert_eq!(config.labels["c"], "3");
        assert_eq!(config.labels[CREATOR_LABEL], SPAWNER_SERVICE_LABEL);
        assert_eq!(config.labels[NODE_NAME_LABEL], "gpu-pool");
        assert_eq!(config.capacity_type.as_deref(), Some("SPOT"));
        assert_eq!(config.subnets, vec!["subnet-donor".to_string()]);
        assert_eq!(
            config.release_version.as_deref(),
            Some("1.24.7-20221222")
        );
        assert_eq!(config.instance_types, vec!["p3.2xlarge".to_string()]);
        assert_eq!(config.disk_size, Some(100));
    });
}

#[tokio::test]
async fn add_existing_nodegroup_fails() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    cloud.add_nodegroup("training", nodegroup("gpu-pool", Default::default()));

    let err = controller(&cloud)
        .add_node(spawn_request("training", node_spec("gpu-pool")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NodeGroupExists);
    cloud.with(|state| assert!(state.nodegroup_creates.is_empty()));
}

/// A nodegroup that cannot be described is left out; the other nodegroups and clusters are listed.
#[tokio::test]
async fn get_clusters_tolerates_nodegroup_failures() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("alpha"));
    cloud.add_cluster(active_cluster("beta"));
    cloud.add_cluster(active_cluster("gamma"));
    cloud.add_nodegroup("alpha", nodegroup("ok", Default::default()));
    cloud.add_nodegroup("alpha", nodegroup("broken", Default::default()));
    cloud.add_nodegroup("beta", nodegroup("cpu", Default::default()));
    cloud.with(|state| {
        state
            .broken_nodegroups
            .insert(("alpha".to_string(), "broken".to_string()));
        state.broken_listings.insert("gamma".to_string());
    });

    let response = controller(&cloud)
        .get_clusters(GetClustersRequest {
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            account_name: "acme".to_string(),
        })
        .await
        .unwrap();

    let names: Vec<&str> = response.clusters.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    let alpha: Vec<&str> = response.clusters[0]
        .node_specs
        .iter()
        .map(|n| n.name.as_str())
        .collect();
    assert_eq!(alpha, vec!["ok"]);
    let beta = &response.clusters[1].node_specs[0];
    assert_eq!(beta.instance_type, "m5.large");
    assert_eq!(beta.disk_size_mb, 20 * 1024);
    assert_eq!(beta.state, NodeState::Active);
    assert!(response.clusters[2].node_specs.is_empty());
}

#[tokio::test]
async fn get_cluster_lists_kubernetes_nodes() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    cloud.with(|state| {
        state.nodes.insert(
            "training".to_string(),
            vec![Node {
                metadata: ObjectMeta {
                    name: Some("ip-10-0-1-17.ec2.internal".to_string()),
                    ..Default::default()
                },
                status: Some(NodeStatus {
                    conditions: Some(vec![NodeCondition {
                        type_: "Ready".to_string(),
                        status: "True".to_string(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
                ..Default::default()
            }],
        )
    });

    let cluster = controller(&cloud)
        .get_cluster(cluster_ref("training"))
        .await
        .unwrap();
    assert_eq!(cluster.name, "training");
    assert_eq!(cluster.provider, "aws");
    assert_eq!(cluster.node_specs.len(), 1);
    assert_eq!(cluster.node_specs[0].state, NodeState::Active);
}

#[tokio::test]
async fn get_cluster_without_endpoint_is_unreachable() {
    let cloud = MockCloud::new();
    let mut creating = active_cluster("training");
    creating.status = "CREATING".to_string();
    creating.endpoint = None;
    cloud.add_cluster(creating);

    let controller = controller(&cloud);
    let err = controller
        .get_cluster(cluster_ref("training"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClusterUnreachable);
    let err = controller
        .get_token(cluster_ref("training"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClusterUnreachable);
}

#[tokio::test]
async fn cluster_status() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    let controller = controller(&cloud);
    let status = controller
        .cluster_status(cluster_ref("training"))
        .await
        .unwrap();
    assert_eq!(status.status, "ACTIVE");
    let err = controller
        .cluster_status(cluster_ref("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn token_and_kubeconfig() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    let controller = controller(&cloud);

    let token = controller.get_token(cluster_ref("training")).await.unwrap();
    assert_eq!(token.token, TOKEN);
    assert_eq!(token.ca_data, "Q0E=");
    assert_eq!(
        token.endpoint,
        "https://training.gr7.us-east-1.eks.amazonaws.com"
    );

    let kubeconfig = controller
        .get_kube_config(cluster_ref("training"))
        .await
        .unwrap();
    assert_eq!(kubeconfig.cluster_name, "training");
    assert!(kubeconfig.config.contains(TOKEN));
}

#[tokio::test]
async fn force_delete_removes_nodegroups_first() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    cloud.add_nodegroup("training", nodegroup("cpu", Default::default()));
    cloud.add_nodegroup("training", nodegroup("gpu", Default::default()));
    let controller = controller(&cloud);

    controller
        .delete_cluster(ClusterDeleteRequest {
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            account_name: "acme".to_string(),
            cluster_name: "training".to_string(),
            force_delete: true,
        })
        .await
        .unwrap();

    cloud.with(|state| {
        assert_eq!(
            state.deleted_nodegroups,
            vec![
                ("training".to_string(), "cpu".to_string()),
                ("training".to_string(), "gpu".to_string())
            ]
        );
        assert_eq!(state.deleted_clusters, vec!["training".to_string()]);
    });
}

#[tokio::test]
async fn delete_without_force_leaves_nodegroups() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    cloud.add_nodegroup("training", nodegroup("cpu", Default::default()));

    controller(&cloud)
        .delete_cluster(ClusterDeleteRequest {
            cluster_name: "training".to_string(),
            region: "us-east-1".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    cloud.with(|state| {
        assert!(state.deleted_nodegroups.is_empty());
        assert_eq!(state.deleted_clusters, vec!["training".to_string()]);
    });
}

#[tokio::test]
async fn delete_node() {
    let cloud = MockCloud::new();
    cloud.add_cluster(active_cluster("training"));
    cloud.add_nodegroup("training", nodegroup("cpu", Default::default()));
    let controller = controller(&cloud);
    let request = NodeDeleteRequest {
        provider: "aws".to_string(),
        region: "us-east-1".to_string(),
        account_name: "acme".to_string(),
        cluster_name: "training".to_string(),
        node_group_name: "cpu".to_string(),
    };

    controller.delete_node(request.clone()).await.unwrap();
    cloud.with(|state| {
        assert_eq!(
            state.deleted_nodegroups,
            vec![("training".to_string(), "cpu".to_string())]
        );
        assert!(state.deleted_clusters.is_empty());
    });

    let err = controller
        .delete_node(NodeDeleteRequest {
            node_group_name: "gpu".to_string(),
            ..request
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    cloud.with(|state| assert_eq!(state.deleted_nodegroups.len(), 1));
}

#[tokio::test]
async fn volumes_are_tagged_with_creator() {
    let cloud = MockCloud::new();
    let controller = controller(&cloud);
    let volume = controller
        .create_volume(CreateVolumeRequest {
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            availability_zone: "us-east-1a".to_string(),
            size: 50,
            labels: btreemap! {"dataset".to_string() => "imagenet".to_string()},
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(volume.volume_id, "vol-0001");
    cloud.with(|state| {
        let config = &state.volume_creates[0];
        assert_eq!(config.volume_type, "gp2");
        assert_eq!(config.tags["dataset"], "imagenet");
        assert_eq!(config.tags[CREATOR_LABEL], SPAWNER_SERVICE_LABEL);
    });

    let err = controller
        .create_volume(CreateVolumeRequest {
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            availability_zone: "us-east-1a".to_string(),
            size: 0,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn snapshot_and_delete_reports_snapshot_on_delete_failure() {
    let cloud = MockCloud::new();
    let controller = controller(&cloud);
    let request = CreateSnapshotRequest {
        provider: "aws".to_string(),
        region: "us-east-1".to_string(),
        volume_id: "vol-0042".to_string(),
        ..Default::default()
    };

    let response = controller
        .create_snapshot_and_delete(request.clone())
        .await
        .unwrap();
    assert_eq!(response.snapshot_id, "snap-0001");
    assert!(response.volume_deleted);

    cloud.with(|state| state.fail_volume_delete = true);
    let err = controller
        .create_snapshot_and_delete(request)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Vendor);
    assert!(err.to_string().contains("snap-0002"));
    cloud.with(|state| assert_eq!(state.deleted_volumes, vec!["vol-0042".to_string()]));
}

#[tokio::test]
async fn tag_node_instance() {
    let cloud = MockCloud::new();
    cloud.with(|state| {
        state.instances.insert(
            ("training".to_string(), "gpu-pool".to_string()),
            vec!["i-0abc".to_string(), "i-0def".to_string()],
        )
    });
    let controller = controller(&cloud);
    let request = TagNodeInstanceRequest {
        provider: "aws".to_string(),
        region: "us-east-1".to_string(),
        cluster_name: "training".to_string(),
        node_group_name: "gpu-pool".to_string(),
        labels: btreemap! {"owner".to_string() => "research".to_string()},
        ..Default::default()
    };

    controller.tag_node_instance(request.clone()).await.unwrap();
    cloud.with(|state| {
        assert_eq!(
            state.tagged[0].0,
            vec!["i-0abc".to_string(), "i-0def".to_string()]
        );
        assert_eq!(state.tagged[0].1["owner"], "research");
    });

    let err = controller
        .tag_node_instance(TagNodeInstanceRequest {
            node_group_name: "empty".to_string(),
            ..request
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
