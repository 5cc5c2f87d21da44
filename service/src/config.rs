use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file when `--config` is not given.
pub const CONFIG_ENV: &str = "SPAWNER_CONFIG";

pub const DEFAULT_SECRET_HOST_REGION: &str = "us-west-2";
pub const DEFAULT_SECRET_DIRECTORY: &str = "/secrets";

/// The service configuration, read once at start-up.
///
/// ```toml
/// secretHostRegion = "us-west-2"
///
/// [secretStore]
/// type = "kubernetes"
/// namespace = "spawner"
///
/// [aws]
/// kubernetesVersion = "1.24"
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnerConfig {
    /// The region whose secret backend holds account credentials.
    pub secret_host_region: String,
    pub secret_store: SecretStoreConfig,
    pub aws: AwsConfig,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            secret_host_region: DEFAULT_SECRET_HOST_REGION.to_string(),
            secret_store: SecretStoreConfig::default(),
            aws: AwsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SecretStoreConfig {
    /// Secrets as directories of files, e.g. mounted Kubernetes secrets.
    Directory { path: PathBuf },
    /// Secrets as Kubernetes `Secret` objects in a namespace.
    Kubernetes { namespace: String },
}

impl Default for SecretStoreConfig {
    fn default() -> Self {
        Self::Directory {
            path: PathBuf::from(DEFAULT_SECRET_DIRECTORY),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsConfig {
    /// Kubernetes version of new EKS clusters.
    pub kubernetes_version: Option<String>,
    /// A role to assume for every AWS session.
    pub assume_role: Option<String>,
    /// Seconds.
    pub assume_role_session_duration: Option<u64>,
}

impl AwsConfig {
    pub fn assume_role_session_duration(&self) -> Option<Duration> {
        self.assume_role_session_duration.map(Duration::from_secs)
    }
}

impl SpawnerConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).context(error::ConfigReadSnafu { path })?;
        toml::from_str(&contents).context(error::ConfigParseSnafu { path })
    }

    /// Read the config from `path`, or from the file named by `SPAWNER_CONFIG`, or fall back to
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config: SpawnerConfig = toml::from_str("").unwrap();
        assert_eq!(config, SpawnerConfig::default());
        assert_eq!(config.secret_host_region, "us-west-2");
        assert_eq!(
            config.secret_store,
            SecretStoreConfig::Directory {
                path: PathBuf::from("/secrets")
            }
        );
    }

    #[test]
    fn config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
secretHostRegion = "eu-west-1"

[secretStore]
type = "kubernetes"
namespace = "spawner"

[aws]
kubernetesVersion = "1.23"
assumeRole = "arn:aws:iam::123456789012:role/spawner"
assumeRoleSessionDuration = 900
"#
        )
        .unwrap();

        let config = SpawnerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.secret_host_region, "eu-west-1");
        assert_eq!(
            config.secret_store,
            SecretStoreConfig::Kubernetes {
                namespace: "spawner".to_string()
            }
        );
        assert_eq!(config.aws.kubernetes_version.as_deref(), Some("1.23"));
        assert_eq!(
            config.aws.assume_role_session_duration(),
            Some(Duration::from_secs(900))
        );
    }

    #[test]
    fn unknown_store_type_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[secretStore]\ntype = \"vault\"\n").unwrap();
        assert!(SpawnerConfig::from_path(file.path()).is_err());
    }
}
