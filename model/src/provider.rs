use crate::error::{Error, OpaqueError};
use serde::{Deserialize, Serialize};

/// The cloud vendors a request can be routed to.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Aws, Provider::Azure, Provider::Gcp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Gcp => "gcp",
        }
    }
}

serde_plain::derive_display_from_serialize!(Provider);
serde_plain::derive_fromstr_from_deserialize!(Provider, |e| -> Error {
    OpaqueError::SerdePlain { source: e }.into()
});

#[test]
fn provider_round_trips_through_str() {
    for provider in Provider::ALL {
        assert_eq!(provider.as_str().parse::<Provider>().unwrap(), provider);
        assert_eq!(provider.to_string(), provider.as_str());
    }
    assert!("openstack".parse::<Provider>().is_err());
}
