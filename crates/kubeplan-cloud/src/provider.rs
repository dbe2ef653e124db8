//! Cloud provider identifiers

use crate::error::CloudError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The clouds kubeplan can plan for.
///
/// This is a closed enumeration: new providers are added here and in the
/// volume strategy table, never discovered at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProviderId {
    Aws,
    Gce,
    Azure,
    AliCloud,
    DigitalOcean,
    OpenStack,
}

impl CloudProviderId {
    /// Canonical identifier string, as it appears in cluster specs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProviderId::Aws => "aws",
            CloudProviderId::Gce => "gce",
            CloudProviderId::Azure => "azure",
            CloudProviderId::AliCloud => "alicloud",
            CloudProviderId::DigitalOcean => "digitalocean",
            CloudProviderId::OpenStack => "openstack",
        }
    }
}

impl fmt::Display for CloudProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProviderId {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(CloudProviderId::Aws),
            "gce" => Ok(CloudProviderId::Gce),
            "azure" => Ok(CloudProviderId::Azure),
            "alicloud" => Ok(CloudProviderId::AliCloud),
            "digitalocean" | "do" => Ok(CloudProviderId::DigitalOcean),
            "openstack" => Ok(CloudProviderId::OpenStack),
            other => Err(CloudError::UnsupportedProvider(other.to_string())),
        }
    }
}
