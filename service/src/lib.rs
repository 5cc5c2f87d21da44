/*!

`spawner-service` is the boundary of the system. It loads the [`SpawnerConfig`], builds the
[`ProviderTable`] once, and exposes every operation through [`SpawnerService`], which routes a
request to the engine of the provider it names.

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

mod config;
mod dispatcher;
pub mod error;
mod service;

pub use config::{AwsConfig, SecretStoreConfig, SpawnerConfig, CONFIG_ENV};
pub use dispatcher::ProviderTable;
pub use error::{Error, ErrorResponse, Result};
pub use service::SpawnerService;
