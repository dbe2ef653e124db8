//! Resource naming and tagging scheme
//!
//! Every name the compiler emits is a pure function of the cluster name,
//! a role or prefix, and sometimes a zone. Re-deriving from the same spec
//! must always land on the same names; the executor relies on that to
//! match tasks against live resources.

use kubeplan_core::{ClusterSpec, InstanceGroup, InstanceGroupRole};
use kubeplan_tasks::SecurityGroup;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Cloud providers cap load balancer names at 32 characters.
const MAX_LOAD_BALANCER_NAME: usize = 32;

/// A security group a role maps to, with the suffix used when deriving
/// rule names that reference it.
#[derive(Debug, Clone)]
pub struct SecurityGroupInfo {
    /// Task name of the group
    pub name: String,

    /// Rule-name suffix; empty for the role's default group
    pub suffix: String,

    /// Definition to register (only registered for roles the builder owns)
    pub definition: SecurityGroup,
}

/// Name of the default security group for a role:
/// `masters.<cluster>`, `nodes.<cluster>`, `bastions.<cluster>`.
pub fn security_group_name(role: InstanceGroupRole, cluster_name: &str) -> String {
    format!("{}.{}", role.plural(), cluster_name)
}

/// Name of the security group fronting a load balancer, e.g.
/// `bastion-elb.<cluster>`.
pub fn lb_security_group_name(prefix: &str, cluster_name: &str) -> String {
    format!("{prefix}-elb.{cluster_name}")
}

/// The security groups for a role: the default role group, plus one
/// shared group per externally supplied override. Sorted by name so
/// iteration order is stable.
pub fn security_groups_for_role(
    cluster: &ClusterSpec,
    instance_groups: &[InstanceGroup],
    role: InstanceGroupRole,
) -> Vec<SecurityGroupInfo> {
    let mut groups: BTreeMap<String, SecurityGroupInfo> = BTreeMap::new();
    let mut needs_default = false;

    for ig in instance_groups.iter().filter(|ig| ig.role == role) {
        match &ig.security_group_override {
            Some(id) => {
                if let Entry::Vacant(e) = groups.entry(id.clone()) {
                    e.insert(SecurityGroupInfo {
                        name: id.clone(),
                        suffix: format!("-{}", ig.name),
                        definition: SecurityGroup {
                            description: format!("Shared security group for {}", ig.name),
                            shared: true,
                            external_id: Some(id.clone()),
                            ..Default::default()
                        },
                    });
                }
            }
            None => needs_default = true,
        }
    }

    if needs_default {
        let name = security_group_name(role, &cluster.name);
        groups.insert(
            name.clone(),
            SecurityGroupInfo {
                name: name.clone(),
                suffix: String::new(),
                definition: SecurityGroup {
                    description: format!("Security group for {}", role.plural()),
                    tags: cloud_tags(cluster, &name),
                    ..Default::default()
                },
            },
        );
    }

    groups.into_values().collect()
}

/// Join the suffixes of a rule's source and destination group. When only
/// one side has a suffix, the other side contributes `-default` so the
/// joined name cannot collide with a single-suffix name.
pub fn join_suffixes(src: &SecurityGroupInfo, dest: &SecurityGroupInfo) -> String {
    if src.suffix.is_empty() && dest.suffix.is_empty() {
        return String::new();
    }
    let src = if src.suffix.is_empty() { "-default" } else { &src.suffix };
    let dest = if dest.suffix.is_empty() { "-default" } else { &dest.suffix };
    format!("{src}{dest}")
}

/// Derive a provider-facing load balancer name of at most 32 characters.
///
/// Short names pass through (dots become dashes); long names keep a
/// readable prefix and get a stable FNV-1a suffix so distinct clusters
/// never collide after truncation.
pub fn lb_name32(prefix: &str, cluster_name: &str) -> String {
    let base = format!("{prefix}-{}", cluster_name.replace('.', "-"));
    if base.len() <= MAX_LOAD_BALANCER_NAME {
        return base;
    }
    let hash = fnv1a(base.as_bytes());
    format!("{}-{hash:08x}", &base[..MAX_LOAD_BALANCER_NAME - 9])
}

/// Standard tag set for a cluster-owned resource.
pub fn cloud_tags(cluster: &ClusterSpec, name: &str) -> BTreeMap<String, String> {
    let mut tags: BTreeMap<String, String> = cluster.cloud_labels.clone();
    tags.insert("KubernetesCluster".to_string(), cluster.name.clone());
    tags.insert("Name".to_string(), name.to_string());
    tags.insert(format!("kubernetes.io/cluster/{}", cluster.name), "owned".to_string());
    tags
}

fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for b in bytes {
        hash ^= u32::from(*b);
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}
