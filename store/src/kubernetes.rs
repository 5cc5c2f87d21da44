use crate::error::{self, Result};
use crate::SecretStore;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{ObjectMeta, PostParams};
use kube::Api;
use log::trace;
use snafu::ResultExt;
use spawner_model::{SecretData, SecretName};
use std::collections::BTreeMap;

const REGION_LABEL: &str = "spawner.io/region";

/// Stores secrets as Kubernetes `Secret` objects in one namespace. The region is folded into the
/// object name (`{region}.{name}`) and recorded as a label.
#[derive(Clone)]
pub struct KubeSecretStore {
    client: kube::Client,
    namespace: String,
}

impl KubeSecretStore {
    pub fn new<S: Into<String>>(client: kube::Client, namespace: S) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Use the in-cluster service account or `KUBECONFIG`.
    pub async fn try_default<S: Into<String>>(namespace: S) -> Result<Self> {
        let client = kube::Client::try_default()
            .await
            .context(error::KubeClientSnafu)?;
        Ok(Self::new(client, namespace))
    }

    fn api(&self) -> Api<Secret> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn object_name(region: &str, name: &SecretName) -> String {
        format!("{}.{}", region, name)
    }
}

#[async_trait::async_trait]
impl SecretStore for KubeSecretStore {
    async fn get_secret(&self, region: &str, name: &SecretName) -> Result<Option<SecretData>> {
        let object_name = Self::object_name(region, name);
        trace!("Getting secret '{}/{}'", self.namespace, object_name);
        let secret = self
            .api()
            .get_opt(&object_name)
            .await
            .context(error::KubeApiSnafu {
                method: "get",
                name: &object_name,
                namespace: &self.namespace,
            })?;
        Ok(secret.map(|secret| {
            secret
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, value.0))
                .collect()
        }))
    }

    async fn put_secret(&self, region: &str, name: &SecretName, data: SecretData) -> Result<()> {
        let object_name = Self::object_name(region, name);
        let api = self.api();
        let existing = api
            .get_opt(&object_name)
            .await
            .context(error::KubeApiSnafu {
                method: "get",
                name: &object_name,
                namespace: &self.namespace,
            })?;

        let mut labels = BTreeMap::new();
        labels.insert(REGION_LABEL.to_string(), region.to_string());
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(object_name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels),
                resource_version: existing
                    .as_ref()
                    .and_then(|existing| existing.metadata.resource_version.clone()),
                ..Default::default()
            },
            data: Some(
                data.into_iter()
                    .map(|(key, value)| (key, ByteString(value)))
                    .collect(),
            ),
            type_: Some("Opaque".to_string()),
            ..Default::default()
        };

        // A replace swaps the whole `data` map, a merge patch would keep keys that were dropped.
        match existing {
            Some(_) => api
                .replace(&object_name, &PostParams::default(), &secret)
                .await
                .context(error::KubeApiSnafu {
                    method: "replace",
                    name: &object_name,
                    namespace: &self.namespace,
                })?,
            None => api
                .create(&PostParams::default(), &secret)
                .await
                .context(error::KubeApiSnafu {
                    method: "create",
                    name: &object_name,
                    namespace: &self.namespace,
                })?,
        };
        trace!("Stored secret '{}/{}'", self.namespace, object_name);
        Ok(())
    }
}
