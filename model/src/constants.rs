//! Label and tag keys written on the resources this system creates.

/// The value of [`CREATOR_LABEL`] on everything created here.
pub const SPAWNER_SERVICE_LABEL: &str = "spawner-service";

pub const CREATOR_LABEL: &str = "creator";
pub const NODE_NAME_LABEL: &str = "node-name";
pub const NODE_LABEL_SELECTOR_LABEL: &str = "node-label-selector";
pub const INSTANCE_LABEL: &str = "instance-type";
pub const TYPE_LABEL: &str = "type";
pub const NODEGROUP_TYPE: &str = "nodegroup";

/// Account name that selects the host's own identity instead of stored credentials.
pub const DEFAULT_ACCOUNT: &str = "default";

// Well-known Kubernetes node labels
pub const K8S_INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";
pub const K8S_ZONE_LABEL: &str = "topology.kubernetes.io/zone";
