/*!

This library provides the vendor-neutral data model shared by the spawner crates: the provider
identifiers, the canonical cluster and node representation, the credential sum type, and the
request/response shapes of every operation.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use cluster::{ClusterSpec, NodeSpec, NodeState};
pub use credentials::{AwsCredential, AzureCredential, Credentials};
pub use error::{Error, ErrorKind, Result};
pub use provider::Provider;
pub use secret::{SecretData, SecretName};

mod cluster;
pub mod constants;
mod credentials;
mod error;
mod provider;
pub mod requests;
mod secret;
