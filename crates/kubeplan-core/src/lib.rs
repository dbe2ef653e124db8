//! Cluster specification model for kubeplan
//!
//! The immutable inputs to the compiler: the cluster spec, its instance
//! groups, and the etcd cluster definitions. Everything here is plain
//! serde-derived data, owned by the caller and read-only to the planning
//! passes.

pub mod cluster;
pub mod etcd;
pub mod instancegroup;

// Re-exports
pub use cluster::{BastionLoadBalancerSpec, BastionTopology, ClusterSpec, EgressProxy, SubnetRef, Topology};
pub use etcd::{
    EnvVarSpec, EtcdBackupSpec, EtcdClusterSpec, EtcdManagerOptions, EtcdMemberSpec,
    EtcdProviderType,
};
pub use instancegroup::{InstanceGroup, InstanceGroupRole};
