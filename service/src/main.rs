/*!

`spawner` runs one operation against the configured providers. The request is a JSON document
passed with `--request` or `--request-file`; the response is printed to stdout as JSON. A failed
operation prints `{"error": {"kind": ..., "message": ...}}` instead and exits with status 1.

!*/

use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;
use spawner_provider::ProviderResult;
use spawner_service::error::{self, Error, ErrorResponse, Result};
use spawner_service::{SpawnerConfig, SpawnerService};
use std::future::Future;
use std::path::PathBuf;

/// Create and manage Kubernetes clusters, node groups and volumes across cloud providers.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to the service config. Also can be passed with the SPAWNER_CONFIG environment
    /// variable.
    #[clap(long = "config")]
    config: Option<PathBuf>,
    /// Path to the kubeconfig file used when credentials are kept in Kubernetes secrets.
    #[clap(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Create a cluster unless it already exists.
    CreateCluster(RequestInput),
    /// Describe a cluster and its nodes.
    GetCluster(RequestInput),
    /// List the clusters of a region.
    GetClusters(RequestInput),
    /// Get the status of a cluster.
    ClusterStatus(RequestInput),
    /// Add a node group to a cluster.
    AddNode(RequestInput),
    /// Delete a cluster.
    DeleteCluster(RequestInput),
    /// Delete a node group.
    DeleteNode(RequestInput),
    /// Get a bearer token for a cluster.
    GetToken(RequestInput),
    /// Get a kubeconfig for a cluster.
    GetKubeConfig(RequestInput),
    /// Create a block volume.
    CreateVolume(RequestInput),
    /// Delete a block volume.
    DeleteVolume(RequestInput),
    /// Snapshot a block volume.
    CreateSnapshot(RequestInput),
    /// Snapshot a block volume, then delete it.
    CreateSnapshotAndDelete(RequestInput),
    /// Tag the instances of a node group.
    TagNodeInstance(RequestInput),
    /// Store the credentials of an account.
    WriteCredential(RequestInput),
    /// Read the stored credentials of an account.
    ReadCredential(RequestInput),
}

#[derive(Debug, Parser)]
struct RequestInput {
    /// The request as a JSON document.
    #[clap(long, conflicts_with = "request_file")]
    request: Option<String>,
    /// A file holding the request as a JSON document.
    #[clap(long = "request-file")]
    request_file: Option<PathBuf>,
}

impl RequestInput {
    async fn parse<T: DeserializeOwned>(self) -> Result<T> {
        let document = match (self.request, self.request_file) {
            (Some(request), _) => request,
            (None, Some(path)) => tokio::fs::read_to_string(&path)
                .await
                .context(error::RequestReadSnafu { path })?,
            (None, None) => return error::MissingRequestSnafu.fail(),
        };
        serde_json::from_str(&document).context(error::RequestParseSnafu)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    match run(args).await {
        Ok(()) => {}
        Err(Error::Operation { source }) => {
            match serde_json::to_string_pretty(&ErrorResponse::from(&source)) {
                Ok(json) => println!("{}", json),
                Err(_) => eprintln!("{}", source),
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = SpawnerConfig::load(args.config.as_deref())?;
    let service = SpawnerService::from_config(&config, args.kubeconfig.as_deref()).await?;
    let s = &service;
    match args.command {
        Command::CreateCluster(input) => call(input, |r| s.create_cluster(r)).await,
        Command::GetCluster(input) => call(input, |r| s.get_cluster(r)).await,
        Command::GetClusters(input) => call(input, |r| s.get_clusters(r)).await,
        Command::ClusterStatus(input) => call(input, |r| s.cluster_status(r)).await,
        Command::AddNode(input) => call(input, |r| s.add_node(r)).await,
        Command::DeleteCluster(input) => call(input, |r| s.delete_cluster(r)).await,
        Command::DeleteNode(input) => call(input, |r| s.delete_node(r)).await,
        Command::GetToken(input) => call(input, |r| s.get_token(r)).await,
        Command::GetKubeConfig(input) => call(input, |r| s.get_kube_config(r)).await,
        Command::CreateVolume(input) => call(input, |r| s.create_volume(r)).await,
        Command::DeleteVolume(input) => call(input, |r| s.delete_volume(r)).await,
        Command::CreateSnapshot(input) => call(input, |r| s.create_snapshot(r)).await,
        Command::CreateSnapshotAndDelete(input) => {
            call(input, |r| s.create_snapshot_and_delete(r)).await
        }
        Command::TagNodeInstance(input) => call(input, |r| s.tag_node_instance(r)).await,
        Command::WriteCredential(input) => call(input, |r| s.write_credential(r)).await,
        Command::ReadCredential(input) => call(input, |r| s.read_credential(r)).await,
    }
}

/// Parse the request, run the operation and print its response.
async fn call<Req, Resp, F, Fut>(input: RequestInput, operation: F) -> Result<()>
where
    Req: DeserializeOwned,
    Resp: Serialize,
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = ProviderResult<Resp>>,
{
    let request = input.parse::<Req>().await?;
    let response = operation(request)
        .await
        .context(error::OperationSnafu)?;
    let json = serde_json::to_string_pretty(&response)
        .context(error::ResponseSerializeSnafu)?;
    println!("{}", json);
    Ok(())
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // Vendor SDK crates stay at error; every spawner crate logs at `level`.
            Builder::new()
                .filter_level(LevelFilter::Error)
                .filter(Some("spawner"), level)
                .init();
        }
    }
}
