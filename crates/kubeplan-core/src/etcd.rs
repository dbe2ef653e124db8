//! Etcd cluster definitions

use serde::{Deserialize, Serialize};

/// One logical etcd cluster ("main", "events", or an auxiliary cluster).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EtcdClusterSpec {
    /// Cluster key; decides the fixed port allocation and must never
    /// change for a live cluster
    pub name: String,

    /// Who runs this cluster's lifecycle
    #[serde(default)]
    pub provider: EtcdProviderType,

    /// Etcd version to run
    pub version: String,

    /// Cluster members; the count goes into the backup metadata record
    #[serde(default)]
    pub members: Vec<EtcdMemberSpec>,

    /// Backup configuration; required for managed clusters
    #[serde(default)]
    pub backups: Option<EtcdBackupSpec>,

    /// CPU request override (e.g. "200m")
    #[serde(default)]
    pub cpu_request: Option<String>,

    /// Memory request override (e.g. "100Mi")
    #[serde(default)]
    pub memory_request: Option<String>,

    /// Deprecated tuning knob; the managed agent does not support it and
    /// compilation fails when it is set
    #[serde(default)]
    pub leader_election_timeout: Option<u64>,

    /// Deprecated tuning knob; rejected like `leader_election_timeout`
    #[serde(default)]
    pub heartbeat_interval: Option<u64>,

    /// Overrides for the managing agent
    #[serde(default)]
    pub manager: Option<EtcdManagerOptions>,
}

/// Who manages the etcd cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EtcdProviderType {
    /// Lifecycle delegated to the per-node etcd-manager agent
    #[default]
    Manager,
    /// Externally managed; the compiler skips these clusters
    Legacy,
}

/// One etcd member
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EtcdMemberSpec {
    /// Member name (usually the zone short name)
    pub name: String,

    /// Instance group the member runs on
    #[serde(default)]
    pub instance_group: Option<String>,
}

/// Backup settings for an etcd cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EtcdBackupSpec {
    /// Backup store URI (e.g. "s3://bucket/cluster/backups/etcd/main")
    pub backup_store: String,
}

/// Agent-level overrides for one etcd cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EtcdManagerOptions {
    /// Replace the agent container image
    #[serde(default)]
    pub image: Option<String>,

    /// Replace the agent log verbosity (default 6)
    #[serde(default)]
    pub log_level: Option<u32>,

    /// Extra environment variables; later entries win over the common set
    #[serde(default)]
    pub env: Vec<EnvVarSpec>,

    /// Agent volume discovery poll interval (e.g. "10s")
    #[serde(default)]
    pub discovery_poll_interval: Option<String>,
}

/// A single environment variable override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvVarSpec {
    pub name: String,
    pub value: String,
}

impl EtcdClusterSpec {
    /// Backup store URI, if configured
    pub fn backup_store(&self) -> Option<&str> {
        self.backups
            .as_ref()
            .map(|b| b.backup_store.as_str())
            .filter(|s| !s.is_empty())
    }
}
