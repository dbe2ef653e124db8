//! Fixed per-cluster port allocation
//!
//! Every etcd cluster name maps to a fixed port set. This table is a
//! compatibility contract: changing an existing entry breaks live
//! clusters, because members advertise these ports in their peer URLs.

use crate::error::{CompileError, Result};

/// The etcd clusters kubeplan knows how to compile, as a closed set so an
/// unrecognized name fails instead of silently drifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtcdClusterKey {
    /// Primary cluster backing the Kubernetes API
    Main,
    /// Event storage, split out to keep churn away from main
    Events,
    /// Dedicated cluster for the cilium CNI
    Cilium,
}

/// Fixed ports for one etcd cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortAllocation {
    /// Normal client traffic
    pub client: u16,
    /// Peer-to-peer traffic
    pub peer: u16,
    /// etcd-manager gRPC control channel
    pub grpc: u16,
    /// Client endpoint used while a recovering member is isolated from
    /// normal traffic
    pub quarantined_client: u16,
}

impl EtcdClusterKey {
    /// Parse a cluster name; unrecognized names are a configuration error.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "main" => Ok(Self::Main),
            "events" => Ok(Self::Events),
            "cilium" => Ok(Self::Cilium),
            other => Err(CompileError::Config(format!("unknown etcd cluster key {other:?}"))),
        }
    }

    pub fn ports(self) -> PortAllocation {
        match self {
            Self::Main => PortAllocation {
                client: 4001,
                peer: 2380,
                grpc: 3996,
                quarantined_client: 3994,
            },
            Self::Events => PortAllocation {
                client: 4002,
                peer: 2381,
                grpc: 3997,
                quarantined_client: 3995,
            },
            Self::Cilium => PortAllocation {
                client: 4003,
                peer: 2382,
                grpc: 3991,
                quarantined_client: 3992,
            },
        }
    }

    /// Internal etcd cluster name: "main" stays plain "etcd" for
    /// compatibility with pre-manager clusters; others are suffixed.
    pub fn internal_cluster_name(self) -> &'static str {
        match self {
            Self::Main => "etcd",
            Self::Events => "etcd-events",
            Self::Cilium => "etcd-cilium",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_ports_are_fixed() {
        let ports = EtcdClusterKey::parse("events").unwrap().ports();
        assert_eq!(ports.client, 4002);
        assert_eq!(ports.peer, 2381);
    }

    #[test]
    fn test_main_cluster_name_is_plain_etcd() {
        assert_eq!(EtcdClusterKey::Main.internal_cluster_name(), "etcd");
        assert_eq!(EtcdClusterKey::Events.internal_cluster_name(), "etcd-events");
    }

    #[test]
    fn test_unknown_name_fails() {
        let err = EtcdClusterKey::parse("calico").unwrap_err();
        assert!(err.to_string().contains("calico"));
    }

    #[test]
    fn test_port_sets_are_disjoint() {
        let all = [EtcdClusterKey::Main, EtcdClusterKey::Events, EtcdClusterKey::Cilium];
        let mut seen = std::collections::BTreeSet::new();
        for key in all {
            let p = key.ports();
            for port in [p.client, p.peer, p.grpc, p.quarantined_client] {
                assert!(seen.insert(port), "port {port} allocated twice");
            }
        }
    }
}
