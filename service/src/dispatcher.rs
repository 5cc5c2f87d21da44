use spawner_model::{ErrorKind, Provider};
use spawner_provider::{Controller, ProviderError, ProviderResult};

/// One engine per provider, built once at start-up and shared by every request.
pub struct ProviderTable {
    aws: Box<dyn Controller>,
    azure: Box<dyn Controller>,
    gcp: Box<dyn Controller>,
}

impl ProviderTable {
    pub fn new<A, Z, G>(aws: A, azure: Z, gcp: G) -> Self
    where
        A: Controller + 'static,
        Z: Controller + 'static,
        G: Controller + 'static,
    {
        Self {
            aws: Box::new(aws),
            azure: Box::new(azure),
            gcp: Box::new(gcp),
        }
    }

    pub fn get(&self, provider: Provider) -> &dyn Controller {
        match provider {
            Provider::Aws => self.aws.as_ref(),
            Provider::Azure => self.azure.as_ref(),
            Provider::Gcp => self.gcp.as_ref(),
        }
    }

    /// The engine for a provider name as it appears in a request.
    pub fn resolve(&self, provider: &str) -> ProviderResult<&dyn Controller> {
        Ok(self.get(parse_provider(provider)?))
    }
}

/// Parse a provider name, failing with `ProviderNotFound` for anything outside the known set.
pub(crate) fn parse_provider(provider: &str) -> ProviderResult<Provider> {
    provider
        .parse()
        .map_err(|_| provider_not_found(provider))
}

fn provider_not_found(provider: &str) -> ProviderError {
    let known = Provider::ALL
        .iter()
        .map(|p| format!("'{}'", p))
        .collect::<Vec<_>>()
        .join(", ");
    ProviderError::new_with_context(
        ErrorKind::ProviderNotFound,
        format!(
            "provider not found, must be one of [{}], got {}",
            known, provider
        ),
    )
}

#[test]
fn unknown_provider_message() {
    let err = parse_provider("openstack").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderNotFound);
    assert_eq!(
        err.message(),
        "provider not found, must be one of ['aws', 'azure', 'gcp'], got openstack"
    );
    assert_eq!(parse_provider("gcp").unwrap(), Provider::Gcp);
}
