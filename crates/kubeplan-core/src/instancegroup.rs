//! Instance group definitions

use serde::{Deserialize, Serialize};

/// A named pool of nodes sharing a role, zones, and subnets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceGroup {
    /// Group name, unique within the cluster
    pub name: String,

    /// Role every node in this group plays
    pub role: InstanceGroupRole,

    /// Availability zones the group spans
    #[serde(default)]
    pub zones: Vec<String>,

    /// Subnet names the group is attached to
    #[serde(default)]
    pub subnets: Vec<String>,

    /// Use an externally managed security group instead of the role's
    /// default one. The group is treated as shared: referenced by id and
    /// never deleted by the executor.
    #[serde(default)]
    pub security_group_override: Option<String>,
}

/// Role of an instance group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceGroupRole {
    /// Control-plane node
    Master,
    /// Worker node (default)
    #[default]
    Node,
    /// SSH jump host for private topologies
    Bastion,
}

impl InstanceGroupRole {
    /// Parse from the spelling used in cluster specs
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "master" => Some(Self::Master),
            "node" => Some(Self::Node),
            "bastion" => Some(Self::Bastion),
            _ => None,
        }
    }

    /// Plural resource-name prefix for this role ("masters", ...)
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Master => "masters",
            Self::Node => "nodes",
            Self::Bastion => "bastions",
        }
    }
}
