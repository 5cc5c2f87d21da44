/*!

`spawner-aws` is the EKS engine. It opens a [`Session`] per request, provisions the IAM roles a
cluster and its node groups need, derives node group configurations, and translates EKS, EC2 and
Kubernetes node shapes into the canonical model.

The vendor APIs are reached through the traits in [`api`]; [`AwsSessionFactory`] wires them to the
AWS SDK, and tests wire them to in-memory doubles.

!*/

pub mod api;
mod controller;
mod error;
pub mod iam;
mod kubeconfig;
pub mod nodegroup;
mod nodes;
mod sdk;
mod session;

pub use controller::{AwsController, AwsSettings};
pub use kubeconfig::render_kubeconfig;
pub use nodes::{node_spec_from_node, parse_quantity};
pub use session::{AwsSessionFactory, KubernetesClient, Session, SessionFactory};
