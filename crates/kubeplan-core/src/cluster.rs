//! Cluster-wide specification

use kubeplan_cloud::CloudProviderId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative, versioned cluster specification.
///
/// This is the root input to the compiler. The compiler never mutates it;
/// two compile runs over the same spec must produce byte-identical task
/// sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSpec {
    /// Fully qualified cluster name (e.g. "demo.example.com")
    pub name: String,

    /// Target cloud
    pub cloud_provider: CloudProviderId,

    /// Target Kubernetes version (e.g. "1.18.3"); gates legacy behavior
    pub kubernetes_version: String,

    /// Internal master hostname; a gossip-style name (`*.k8s.local`)
    /// changes how the etcd peer DNS suffix is derived
    #[serde(default)]
    pub master_internal_name: Option<String>,

    /// CIDR allow-list for SSH access to the cluster
    #[serde(default)]
    pub ssh_access: Vec<String>,

    /// Network topology configuration
    #[serde(default)]
    pub topology: Option<Topology>,

    /// One entry per logical etcd cluster ("main", "events", ...)
    #[serde(default)]
    pub etcd_clusters: Vec<crate::etcd::EtcdClusterSpec>,

    /// Cluster-wide labels applied to cloud resources
    #[serde(default)]
    pub cloud_labels: BTreeMap<String, String>,

    /// Mount the host's certificate trust store into system pods
    #[serde(default)]
    pub use_host_certificates: bool,

    /// Turn off TLS for etcd itself (legacy clusters only)
    #[serde(default)]
    pub disable_etcd_tls: bool,

    /// Proxy settings propagated to all system components
    #[serde(default)]
    pub egress_proxy: Option<EgressProxy>,
}

/// Network topology configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    /// Bastion configuration; absent means no bastion topology settings
    #[serde(default)]
    pub bastion: Option<BastionTopology>,
}

/// Bastion-specific topology settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BastionTopology {
    /// Public DNS name for the bastion; when set, an A record pointing at
    /// the bastion load balancer is emitted
    #[serde(default)]
    pub public_name: Option<String>,

    /// Idle timeout for bastion SSH connections, in seconds
    #[serde(default)]
    pub idle_timeout_seconds: Option<u64>,

    /// Bastion load balancer extras
    #[serde(default)]
    pub load_balancer: Option<BastionLoadBalancerSpec>,
}

/// Extra settings for the bastion load balancer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BastionLoadBalancerSpec {
    /// Externally managed security group IDs to attach. These are shared
    /// resources; the executor must never delete them.
    #[serde(default)]
    pub additional_security_groups: Vec<String>,
}

/// Egress proxy settings shared by all system components
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EgressProxy {
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
    /// Comma-separated proxy exclusion list
    #[serde(default)]
    pub no_proxy: Option<String>,
}

/// Reference to a resolved subnet, produced by the network-topology
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetRef {
    /// Provider-scoped subnet identifier
    pub id: String,

    /// Availability zone the subnet lives in
    pub zone: String,
}
