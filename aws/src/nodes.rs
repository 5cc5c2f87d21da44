use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use spawner_model::constants::{K8S_INSTANCE_TYPE_LABEL, K8S_ZONE_LABEL};
use spawner_model::{NodeSpec, NodeState};

const EPHEMERAL_STORAGE: &str = "ephemeral-storage";
const NVIDIA_GPU: &str = "nvidia.com/gpu";

/// Describe a Kubernetes node in canonical terms. Disk size is the node's ephemeral storage
/// capacity in MiB; the node is active when its `Ready` condition is `True`.
pub fn node_spec_from_node(node: &Node) -> NodeSpec {
    let name = node.metadata.name.clone().unwrap_or_default();
    let labels = node.metadata.labels.clone().unwrap_or_default();
    let status = node.status.as_ref();

    let mut host_name = name.clone();
    let mut ip_addr = String::new();
    for address in status
        .and_then(|status| status.addresses.as_ref())
        .into_iter()
        .flatten()
    {
        match address.type_.as_str() {
            "InternalIP" => ip_addr = address.address.clone(),
            "Hostname" => host_name = address.address.clone(),
            _ => {}
        }
    }

    let ready = status
        .and_then(|status| status.conditions.as_ref())
        .into_iter()
        .flatten()
        .any(|condition| condition.type_ == "Ready" && condition.status == "True");

    let capacity = status.and_then(|status| status.capacity.as_ref());
    let capacity_of = |resource: &str| {
        capacity
            .and_then(|capacity| capacity.get(resource))
            .and_then(parse_quantity)
            .unwrap_or_default()
    };

    NodeSpec {
        instance_type: labels
            .get(K8S_INSTANCE_TYPE_LABEL)
            .cloned()
            .unwrap_or_default(),
        availability_zone: labels.get(K8S_ZONE_LABEL).cloned().unwrap_or_default(),
        disk_size_mb: capacity_of(EPHEMERAL_STORAGE) / 1024 / 1024,
        gpu_enabled: capacity_of(NVIDIA_GPU) > 0,
        host_name,
        ip_addr,
        uuid: node.metadata.uid.clone().unwrap_or_default(),
        state: if ready {
            NodeState::Active
        } else {
            NodeState::Inactive
        },
        labels,
        name,
    }
}

/// The value of a Kubernetes resource quantity, rounded up to a whole number. `None` if the
/// quantity is malformed.
pub fn parse_quantity(quantity: &Quantity) -> Option<i64> {
    let text = quantity.0.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(text.len());
    let (number, suffix) = text.split_at(split);
    let number: f64 = number.parse().ok()?;
    let multiplier = match suffix {
        "" => 1f64,
        "Ki" => 2f64.powi(10),
        "Mi" => 2f64.powi(20),
        "Gi" => 2f64.powi(30),
        "Ti" => 2f64.powi(40),
        "Pi" => 2f64.powi(50),
        "Ei" => 2f64.powi(60),
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        exponent if exponent.starts_with(['e', 'E']) => {
            10f64.powi(exponent[1..].parse::<i32>().ok()?)
        }
        _ => return None,
    };
    let value = (number * multiplier).ceil();
    if value.is_finite() && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}
