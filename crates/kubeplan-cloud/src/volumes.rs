//! Per-provider volume discovery tags
//!
//! The etcd-manager agent finds its persistent disk by tag. Each cloud has
//! its own tagging constraints (Azure forbids `/` in tag keys, GCE only
//! allows label-safe characters, DigitalOcean rejects dots), so the tags a
//! manifest must carry are a per-provider strategy selected from a closed
//! table.

use crate::error::{CloudError, Result};
use crate::provider::CloudProviderId;
use serde::Serialize;

/// Tags the etcd-manager agent uses to locate its volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeTags {
    /// Provider key passed to the agent's `--volume-provider` flag
    pub volume_provider: &'static str,

    /// Discovery tags, one `--volume-tag` flag each
    pub volume_tags: Vec<String>,

    /// Tag whose value names the member, for `--volume-name-tag`
    pub volume_name_tag: String,
}

/// One strategy per cloud provider.
///
/// Implementations are pure: same (cluster, etcd cluster) always produces
/// the same tag set.
pub trait VolumeTagStrategy: Sync {
    /// Provider key understood by the agent
    fn provider_key(&self) -> &'static str;

    /// Tags for the etcd cluster `etcd_cluster` of cluster `cluster_name`
    fn volume_tags(&self, cluster_name: &str, etcd_cluster: &str) -> VolumeTags;
}

/// Look up the strategy for a provider.
///
/// The table is total over [`CloudProviderId`]; the error arm exists for
/// callers holding an unvalidated provider string.
pub fn strategy_for(provider: CloudProviderId) -> &'static dyn VolumeTagStrategy {
    match provider {
        CloudProviderId::Aws => &AwsVolumes,
        CloudProviderId::Gce => &GceVolumes,
        CloudProviderId::Azure => &AzureVolumes,
        CloudProviderId::AliCloud => &AliCloudVolumes,
        CloudProviderId::DigitalOcean => &DigitalOceanVolumes,
        CloudProviderId::OpenStack => &OpenStackVolumes,
    }
}

/// Strategy lookup from an unvalidated provider string.
pub fn strategy_for_str(provider: &str) -> Result<&'static dyn VolumeTagStrategy> {
    let id: CloudProviderId = provider
        .parse()
        .map_err(|_| CloudError::UnsupportedProvider(provider.to_string()))?;
    Ok(strategy_for(id))
}

const AWS_ETCD_CLUSTER_TAG_PREFIX: &str = "k8s.io/etcd/";
const AWS_ROLE_TAG_PREFIX: &str = "k8s.io/role/";

struct AwsVolumes;

impl VolumeTagStrategy for AwsVolumes {
    fn provider_key(&self) -> &'static str {
        "aws"
    }

    fn volume_tags(&self, cluster_name: &str, etcd_cluster: &str) -> VolumeTags {
        VolumeTags {
            volume_provider: self.provider_key(),
            volume_tags: vec![
                format!("kubernetes.io/cluster/{cluster_name}=owned"),
                format!("{AWS_ETCD_CLUSTER_TAG_PREFIX}{etcd_cluster}"),
                format!("{AWS_ROLE_TAG_PREFIX}master=1"),
            ],
            volume_name_tag: format!("{AWS_ETCD_CLUSTER_TAG_PREFIX}{etcd_cluster}"),
        }
    }
}

struct AliCloudVolumes;

impl VolumeTagStrategy for AliCloudVolumes {
    fn provider_key(&self) -> &'static str {
        "alicloud"
    }

    fn volume_tags(&self, cluster_name: &str, etcd_cluster: &str) -> VolumeTags {
        VolumeTags {
            volume_provider: self.provider_key(),
            volume_tags: vec![
                format!("kubernetes.io/cluster/{cluster_name}=owned"),
                format!("{AWS_ETCD_CLUSTER_TAG_PREFIX}{etcd_cluster}"),
                format!("{AWS_ROLE_TAG_PREFIX}master=1"),
            ],
            volume_name_tag: format!("{AWS_ETCD_CLUSTER_TAG_PREFIX}{etcd_cluster}"),
        }
    }
}

struct AzureVolumes;

impl VolumeTagStrategy for AzureVolumes {
    fn provider_key(&self) -> &'static str {
        "azure"
    }

    fn volume_tags(&self, cluster_name: &str, etcd_cluster: &str) -> VolumeTags {
        // Azure does not allow slashes in tag keys, so the keys the other
        // clouds spell with `/` use `_` here.
        VolumeTags {
            volume_provider: self.provider_key(),
            volume_tags: vec![
                format!("kubernetes.io_cluster_{cluster_name}=owned"),
                format!("k8s.io_etcd_{etcd_cluster}"),
                "k8s.io_role_master=1".to_string(),
            ],
            volume_name_tag: format!("k8s.io_etcd_{etcd_cluster}"),
        }
    }
}

const GCE_LABEL_CLUSTER_NAME: &str = "k8s-io-cluster-name";
const GCE_LABEL_ETCD_CLUSTER_PREFIX: &str = "k8s-io-etcd-";
const GCE_LABEL_ROLE_PREFIX: &str = "k8s-io-role-";

/// GCE labels only permit lowercase letters, digits and dashes.
fn gce_safe_cluster_name(cluster_name: &str) -> String {
    cluster_name.replace('.', "-")
}

struct GceVolumes;

impl VolumeTagStrategy for GceVolumes {
    fn provider_key(&self) -> &'static str {
        "gce"
    }

    fn volume_tags(&self, cluster_name: &str, etcd_cluster: &str) -> VolumeTags {
        VolumeTags {
            volume_provider: self.provider_key(),
            volume_tags: vec![
                format!("{GCE_LABEL_CLUSTER_NAME}={}", gce_safe_cluster_name(cluster_name)),
                format!("{GCE_LABEL_ETCD_CLUSTER_PREFIX}{etcd_cluster}"),
                format!("{GCE_LABEL_ROLE_PREFIX}master=master"),
            ],
            volume_name_tag: format!("{GCE_LABEL_ETCD_CLUSTER_PREFIX}{etcd_cluster}"),
        }
    }
}

struct DigitalOceanVolumes;

impl VolumeTagStrategy for DigitalOceanVolumes {
    fn provider_key(&self) -> &'static str {
        "do"
    }

    fn volume_tags(&self, cluster_name: &str, etcd_cluster: &str) -> VolumeTags {
        // DigitalOcean rejects dots in tags and names.
        let safe_cluster_name = cluster_name.replace('.', "-");
        VolumeTags {
            volume_provider: self.provider_key(),
            volume_tags: vec![
                format!("KubernetesCluster={safe_cluster_name}"),
                "k8s-index".to_string(),
            ],
            volume_name_tag: format!("etcdCluster-{etcd_cluster}"),
        }
    }
}

struct OpenStackVolumes;

impl VolumeTagStrategy for OpenStackVolumes {
    fn provider_key(&self) -> &'static str {
        "openstack"
    }

    fn volume_tags(&self, cluster_name: &str, etcd_cluster: &str) -> VolumeTags {
        VolumeTags {
            volume_provider: self.provider_key(),
            volume_tags: vec![
                format!("{AWS_ETCD_CLUSTER_TAG_PREFIX}{etcd_cluster}"),
                format!("{AWS_ROLE_TAG_PREFIX}master=1"),
                format!("KubernetesCluster={cluster_name}"),
            ],
            volume_name_tag: format!("{AWS_ETCD_CLUSTER_TAG_PREFIX}{etcd_cluster}"),
        }
    }
}
