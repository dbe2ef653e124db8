//! Task definitions
//!
//! A task is a named, typed description of one desired resource or file.
//! The variant set is closed: the executor knows exactly these six kinds.

use crate::lifecycle::Lifecycle;
use kubeplan_core::SubnetRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named unit of desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Globally unique name within one compile run
    pub name: String,

    /// Phase gate for the executor
    pub lifecycle: Lifecycle,

    /// The resource this task describes
    pub kind: TaskKind,
}

impl Task {
    pub fn new(name: impl Into<String>, lifecycle: Lifecycle, kind: TaskKind) -> Self {
        Self {
            name: name.into(),
            lifecycle,
            kind,
        }
    }
}

/// The closed set of resource kinds the executor understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    SecurityGroup(SecurityGroup),
    SecurityGroupRule(SecurityGroupRule),
    LoadBalancer(LoadBalancer),
    ManagedFile(ManagedFile),
    Keypair(Keypair),
    DnsRecord(DnsRecord),
}

/// A role-scoped network boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Shared groups are referenced by id and never deleted
    #[serde(default)]
    pub shared: bool,

    /// Provider-side id, set for shared (externally managed) groups
    #[serde(default)]
    pub external_id: Option<String>,

    /// Cloud tags; BTreeMap keeps serialization order stable
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Rule patterns the executor may prune from the live group
    #[serde(default)]
    pub remove_extra_rules: Vec<String>,
}

/// A directed ingress/egress edge between a security group and either
/// another group or a CIDR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    /// Group the rule is attached to
    pub security_group: String,

    /// Source (ingress) or destination (egress) group name
    #[serde(default)]
    pub source_group: Option<String>,

    /// Source/destination CIDR, for rules not scoped to a group
    #[serde(default)]
    pub cidr: Option<String>,

    /// Protocol ("tcp", "udp"); None means all protocols
    #[serde(default)]
    pub protocol: Option<String>,

    #[serde(default)]
    pub from_port: Option<u16>,

    #[serde(default)]
    pub to_port: Option<u16>,

    /// Egress rule when true, ingress otherwise
    #[serde(default)]
    pub egress: bool,
}

/// A classic TCP load balancer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// Provider-facing name, at most 32 characters
    pub cloud_name: String,

    /// Listener set, load-balancer port to instance port
    pub listeners: Vec<Listener>,

    /// Subnets the balancer spans
    pub subnets: Vec<SubnetRef>,

    /// Security group task names attached to the balancer
    pub security_groups: Vec<String>,

    pub health_check: HealthCheck,

    /// Idle connection timeout in seconds
    pub idle_timeout_seconds: u64,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// One load balancer listener
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub port: u16,
    pub instance_port: u16,
}

/// TCP health check settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Check target, e.g. "TCP:22"
    pub target: String,
    pub timeout_seconds: u64,
    pub interval_seconds: u64,
    /// Consecutive successes before a backend counts as healthy
    pub healthy_threshold: u32,
    /// Consecutive failures before a backend counts as unhealthy
    pub unhealthy_threshold: u32,
}

/// A file written to a state store or node path by the executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedFile {
    /// Base URI the location is relative to (e.g. the backup store)
    #[serde(default)]
    pub base: Option<String>,

    /// Path relative to base, or to the cluster state store when base is
    /// unset
    pub location: String,

    /// Exact file contents
    pub contents: Vec<u8>,
}

/// A certificate-authority or leaf keypair issued by the PKI sub-task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypair {
    /// X.509 subject, e.g. "cn=etcd-clients-ca"
    pub subject: String,

    /// Keypair type; only "ca" is produced by this compiler
    pub keypair_type: String,
}

/// A DNS record pointing at a compiled resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Record type, e.g. "A"
    pub record_type: String,

    /// Name of the load balancer task the record targets
    pub target_load_balancer: String,
}
