use crate::error::{self, Result};
use crate::SecretStore;
use log::trace;
use snafu::{OptionExt, ResultExt};
use spawner_model::{SecretData, SecretName};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each secret as a directory with one file per key, the layout Kubernetes uses when it
/// mounts a generic/[opaque] secret into a container. Secrets live under `{root}/{region}/{name}`.
/// [opaque]: https://kubernetes.io/docs/concepts/configuration/secret/#opaque-secrets
#[derive(Debug, Clone)]
pub struct DirectorySecretStore {
    /// The directory holding one subdirectory per region.
    root: PathBuf,
}

impl DirectorySecretStore {
    pub fn new<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { root: root.into() }
    }

    fn secret_dir(&self, region: &str, name: &SecretName) -> PathBuf {
        self.root.join(region).join(name.as_str())
    }

    fn read_dir(directory: &Path) -> Result<Option<SecretData>> {
        let read_dir = match fs::read_dir(directory) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).context(error::ListDirectorySnafu { directory });
            }
        };
        let mut map = SecretData::new();
        for entry in read_dir {
            let entry = entry.context(error::ListDirectorySnafu { directory })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let key = path
                .file_name()
                .context(error::MissingFilenameSnafu { path: &path })?
                .to_str()
                .context(error::NonUtf8FilenameSnafu { path: &path })?
                .to_string();
            let value = fs::read(&path).context(error::ReadFileSnafu { path: &path })?;
            map.insert(key, value);
        }
        Ok(Some(map))
    }
}

#[async_trait::async_trait]
impl SecretStore for DirectorySecretStore {
    async fn get_secret(&self, region: &str, name: &SecretName) -> Result<Option<SecretData>> {
        let directory = self.secret_dir(region, name);
        trace!("Reading secret '{}' from '{}'", name, directory.display());
        Self::read_dir(&directory)
    }

    async fn put_secret(&self, region: &str, name: &SecretName, data: SecretData) -> Result<()> {
        let directory = self.secret_dir(region, name);
        // Stage the new contents next to the old ones so a reader never sees a mix of both.
        let staging = self
            .root
            .join(region)
            .join(format!(".{}.staging", name.as_str()));
        if staging.exists() {
            fs::remove_dir_all(&staging).context(error::WriteFileSnafu { path: &staging })?;
        }
        fs::create_dir_all(&staging).context(error::WriteFileSnafu { path: &staging })?;
        for (key, value) in &data {
            let path = staging.join(key);
            fs::write(&path, value).context(error::WriteFileSnafu { path: &path })?;
        }
        if directory.exists() {
            fs::remove_dir_all(&directory).context(error::WriteFileSnafu { path: &directory })?;
        }
        fs::rename(&staging, &directory).context(error::WriteFileSnafu { path: &directory })?;
        trace!("Wrote secret '{}' to '{}'", name, directory.display());
        Ok(())
    }
}
