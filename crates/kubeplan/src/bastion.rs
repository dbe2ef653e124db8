//! Bastion security policy builder
//!
//! Bastion instances live in the utility subnets of a private topology.
//! All SSH traffic enters through a load balancer whose security group is
//! the only externally reachable surface; bastions themselves may reach
//! every master and node group on port 22.

use crate::collaborators::SubnetResolver;
use crate::error::Result;
use crate::naming::{
    cloud_tags, join_suffixes, lb_name32, lb_security_group_name, security_groups_for_role,
};
use kubeplan_core::{ClusterSpec, InstanceGroup, InstanceGroupRole, SubnetRef};
use kubeplan_tasks::{
    DnsRecord, HealthCheck, Lifecycle, Listener, LoadBalancer, SecurityGroup, SecurityGroupRule,
    Task, TaskKind, TaskRegistry,
};
use std::collections::BTreeSet;

const BASTION_LB_PREFIX: &str = "bastion";
const SSH_PORT: u16 = 22;

/// Idle timeout applied when the topology does not override it.
const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 300;

/// Derives the bastion access graph: security groups, the SSH rule cross
/// product, the load balancer, and the optional public DNS record.
pub struct BastionPolicyBuilder<'a> {
    pub cluster: &'a ClusterSpec,
    pub instance_groups: &'a [InstanceGroup],
    pub subnets: &'a dyn SubnetResolver,

    /// Phase for the load balancer and DNS record
    pub lifecycle: Lifecycle,

    /// Phase for security groups and rules
    pub security_lifecycle: Lifecycle,
}

impl BastionPolicyBuilder<'_> {
    /// Populate `registry` with the bastion infrastructure tasks.
    ///
    /// Bastions are opt-in: with no bastion-role instance groups this adds
    /// nothing and succeeds.
    pub fn build(&self, registry: &mut TaskRegistry) -> Result<()> {
        let bastion_instance_groups: Vec<&InstanceGroup> = self
            .instance_groups
            .iter()
            .filter(|ig| ig.role == InstanceGroupRole::Bastion)
            .collect();
        if bastion_instance_groups.is_empty() {
            return Ok(());
        }

        let bastion_groups =
            security_groups_for_role(self.cluster, self.instance_groups, InstanceGroupRole::Bastion);
        let master_groups =
            security_groups_for_role(self.cluster, self.instance_groups, InstanceGroupRole::Master);
        let node_groups =
            security_groups_for_role(self.cluster, self.instance_groups, InstanceGroupRole::Node);

        tracing::debug!(
            bastion_groups = bastion_groups.len(),
            master_groups = master_groups.len(),
            node_groups = node_groups.len(),
            "building bastion security policy"
        );

        let lb_group_name = lb_security_group_name(BASTION_LB_PREFIX, &self.cluster.name);

        for group in &bastion_groups {
            registry.add(Task::new(
                &group.name,
                self.security_lifecycle,
                TaskKind::SecurityGroup(group.definition.clone()),
            ))?;
        }

        // Bastion instances may egress freely
        for src in &bastion_groups {
            self.add_directional_rule(
                registry,
                format!("bastion-egress{}", src.suffix),
                SecurityGroupRule {
                    security_group: src.name.clone(),
                    cidr: Some("0.0.0.0/0".to_string()),
                    egress: true,
                    ..Default::default()
                },
            )?;
        }

        // SSH reaches bastions only through the load balancer
        for dest in &bastion_groups {
            self.add_directional_rule(
                registry,
                format!("ssh-elb-to-bastion{}", dest.suffix),
                ssh_rule(&dest.name, Some(&lb_group_name), None),
            )?;
        }

        // Full cross product: any bastion group may SSH to any master or
        // node group, whatever zones each lives in
        for src in &bastion_groups {
            for dest in &master_groups {
                self.add_directional_rule(
                    registry,
                    format!("bastion-to-master-ssh{}", join_suffixes(src, dest)),
                    ssh_rule(&dest.name, Some(&src.name), None),
                )?;
            }
            for dest in &node_groups {
                self.add_directional_rule(
                    registry,
                    format!("bastion-to-node-ssh{}", join_suffixes(src, dest)),
                    ssh_rule(&dest.name, Some(&src.name), None),
                )?;
            }
        }

        // Security group for the load balancer itself
        registry.add(Task::new(
            &lb_group_name,
            self.security_lifecycle,
            TaskKind::SecurityGroup(SecurityGroup {
                description: "Security group for bastion ELB".to_string(),
                tags: cloud_tags(self.cluster, &lb_group_name),
                remove_extra_rules: vec!["port=22".to_string()],
                ..Default::default()
            }),
        ))?;

        self.add_directional_rule(
            registry,
            "bastion-elb-egress".to_string(),
            SecurityGroupRule {
                security_group: lb_group_name.clone(),
                cidr: Some("0.0.0.0/0".to_string()),
                egress: true,
                ..Default::default()
            },
        )?;

        // The SSH allow-list is the only externally reachable surface
        for cidr in &self.cluster.ssh_access {
            self.add_directional_rule(
                registry,
                format!("ssh-external-to-bastion-elb-{cidr}"),
                ssh_rule(&lb_group_name, None, Some(cidr)),
            )?;
        }

        // One utility subnet per zone spanned by the bastion groups;
        // sorted so resolver errors and subnet order are stable
        let mut zones: BTreeSet<&str> = BTreeSet::new();
        for ig in &bastion_instance_groups {
            zones.extend(ig.zones.iter().map(String::as_str));
        }
        let mut lb_subnets: Vec<SubnetRef> = Vec::new();
        for zone in zones {
            lb_subnets.push(self.subnets.resolve_utility_subnet(zone)?);
        }

        let bastion_topology = self
            .cluster
            .topology
            .as_ref()
            .and_then(|t| t.bastion.as_ref());

        let idle_timeout_seconds = bastion_topology
            .and_then(|b| b.idle_timeout_seconds)
            .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECONDS);

        let lb_task_name = format!("{BASTION_LB_PREFIX}.{}", self.cluster.name);

        let mut lb_security_groups = vec![lb_group_name.clone()];
        if let Some(lb_spec) = bastion_topology.and_then(|b| b.load_balancer.as_ref()) {
            // Externally managed groups: attach by id, never delete
            for id in &lb_spec.additional_security_groups {
                registry.ensure(Task::new(
                    id,
                    self.security_lifecycle,
                    TaskKind::SecurityGroup(SecurityGroup {
                        shared: true,
                        external_id: Some(id.clone()),
                        ..Default::default()
                    }),
                ))?;
                lb_security_groups.push(id.clone());
            }
        }

        let mut tags = cloud_tags(self.cluster, &lb_task_name);
        tags.insert("Name".to_string(), lb_task_name.clone());

        registry.add(Task::new(
            &lb_task_name,
            self.lifecycle,
            TaskKind::LoadBalancer(LoadBalancer {
                cloud_name: lb_name32(BASTION_LB_PREFIX, &self.cluster.name),
                listeners: vec![Listener {
                    port: SSH_PORT,
                    instance_port: SSH_PORT,
                }],
                subnets: lb_subnets,
                security_groups: lb_security_groups,
                health_check: HealthCheck {
                    target: format!("TCP:{SSH_PORT}"),
                    timeout_seconds: 5,
                    interval_seconds: 10,
                    healthy_threshold: 2,
                    unhealthy_threshold: 2,
                },
                idle_timeout_seconds,
                tags,
            }),
        ))?;

        // Default public naming (`bastion-<clustername>`) is handled by
        // the naming collaborator; only an explicit name becomes a record
        if let Some(public_name) = bastion_topology.and_then(|b| b.public_name.as_deref()) {
            registry.add(Task::new(
                public_name,
                self.lifecycle,
                TaskKind::DnsRecord(DnsRecord {
                    record_type: "A".to_string(),
                    target_load_balancer: lb_task_name.clone(),
                }),
            ))?;
        }

        Ok(())
    }

    fn add_directional_rule(
        &self,
        registry: &mut TaskRegistry,
        name: String,
        rule: SecurityGroupRule,
    ) -> Result<()> {
        registry.add(Task::new(
            name,
            self.security_lifecycle,
            TaskKind::SecurityGroupRule(rule),
        ))?;
        Ok(())
    }
}

fn ssh_rule(security_group: &str, source_group: Option<&str>, cidr: Option<&str>) -> SecurityGroupRule {
    SecurityGroupRule {
        security_group: security_group.to_string(),
        source_group: source_group.map(str::to_string),
        cidr: cidr.map(str::to_string),
        protocol: Some("tcp".to_string()),
        from_port: Some(SSH_PORT),
        to_port: Some(SSH_PORT),
        egress: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::StaticSubnets;
    use kubeplan_cloud::CloudProviderId;
    use kubeplan_core::{BastionLoadBalancerSpec, BastionTopology, Topology};
    use std::collections::BTreeMap;

    fn cluster() -> ClusterSpec {
        ClusterSpec {
            name: "demo.example.com".to_string(),
            cloud_provider: CloudProviderId::Aws,
            kubernetes_version: "1.18.0".to_string(),
            master_internal_name: None,
            ssh_access: vec!["203.0.113.0/24".to_string()],
            topology: None,
            etcd_clusters: Vec::new(),
            cloud_labels: BTreeMap::new(),
            use_host_certificates: false,
            disable_etcd_tls: false,
            egress_proxy: None,
        }
    }

    fn group(name: &str, role: InstanceGroupRole, zones: &[&str]) -> InstanceGroup {
        InstanceGroup {
            name: name.to_string(),
            role,
            zones: zones.iter().map(|z| z.to_string()).collect(),
            ..Default::default()
        }
    }

    fn subnets() -> StaticSubnets {
        let mut subnets = StaticSubnets::new();
        subnets.insert("us-east-1a", "subnet-1a");
        subnets.insert("us-east-1b", "subnet-1b");
        subnets
    }

    fn build(cluster: &ClusterSpec, igs: &[InstanceGroup]) -> TaskRegistry {
        let subnets = subnets();
        let mut registry = TaskRegistry::new();
        BastionPolicyBuilder {
            cluster,
            instance_groups: igs,
            subnets: &subnets,
            lifecycle: Lifecycle::Sync,
            security_lifecycle: Lifecycle::Sync,
        }
        .build(&mut registry)
        .unwrap();
        registry
    }

    fn rule_count(registry: &TaskRegistry, prefix: &str) -> usize {
        registry
            .tasks()
            .filter(|t| {
                t.name.starts_with(prefix)
                    && matches!(t.kind, TaskKind::SecurityGroupRule(_))
            })
            .count()
    }

    #[test]
    fn test_no_bastions_no_tasks() {
        let cluster = cluster();
        let igs = vec![
            group("masters", InstanceGroupRole::Master, &["us-east-1a"]),
            group("nodes", InstanceGroupRole::Node, &["us-east-1a"]),
        ];
        let registry = build(&cluster, &igs);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ssh_rule_cross_product() {
        let cluster = cluster();
        let mut bastion_b = group("bastion-b", InstanceGroupRole::Bastion, &["us-east-1b"]);
        bastion_b.security_group_override = Some("sg-override".to_string());
        let mut master_b = group("master-b", InstanceGroupRole::Master, &["us-east-1b"]);
        master_b.security_group_override = Some("sg-master-b".to_string());
        let igs = vec![
            group("bastion-a", InstanceGroupRole::Bastion, &["us-east-1a"]),
            bastion_b,
            group("master-a", InstanceGroupRole::Master, &["us-east-1a"]),
            master_b,
            group("nodes", InstanceGroupRole::Node, &["us-east-1a"]),
        ];
        let registry = build(&cluster, &igs);

        // 2 bastion groups x (2 master groups + 1 node group)
        assert_eq!(rule_count(&registry, "bastion-to-master-ssh"), 4);
        assert_eq!(rule_count(&registry, "bastion-to-node-ssh"), 2);
    }

    #[test]
    fn test_lb_is_only_public_surface() {
        let cluster = cluster();
        let igs = vec![
            group("bastion", InstanceGroupRole::Bastion, &["us-east-1a"]),
            group("masters", InstanceGroupRole::Master, &["us-east-1a"]),
        ];
        let registry = build(&cluster, &igs);

        // The bastion group's only SSH ingress is sourced from the LB group
        let to_bastion = registry.get("ssh-elb-to-bastion").unwrap();
        let TaskKind::SecurityGroupRule(rule) = &to_bastion.kind else {
            panic!("expected rule");
        };
        assert_eq!(rule.source_group.as_deref(), Some("bastion-elb.demo.example.com"));
        assert_eq!(rule.cidr, None);

        // The allow-list CIDR lands on the LB group, not the bastion group
        let external = registry.get("ssh-external-to-bastion-elb-203.0.113.0/24").unwrap();
        let TaskKind::SecurityGroupRule(rule) = &external.kind else {
            panic!("expected rule");
        };
        assert_eq!(rule.security_group, "bastion-elb.demo.example.com");
        assert_eq!(rule.cidr.as_deref(), Some("203.0.113.0/24"));
    }

    #[test]
    fn test_load_balancer_shape() {
        let mut cluster = cluster();
        cluster.topology = Some(Topology {
            bastion: Some(BastionTopology {
                public_name: Some("ssh.demo.example.com".to_string()),
                idle_timeout_seconds: Some(1200),
                load_balancer: Some(BastionLoadBalancerSpec {
                    additional_security_groups: vec!["sg-extra".to_string()],
                }),
            }),
        });
        let igs = vec![group(
            "bastion",
            InstanceGroupRole::Bastion,
            &["us-east-1a", "us-east-1b"],
        )];
        let registry = build(&cluster, &igs);

        let lb_task = registry.get("bastion.demo.example.com").unwrap();
        let TaskKind::LoadBalancer(lb) = &lb_task.kind else {
            panic!("expected load balancer");
        };
        assert_eq!(lb.listeners, vec![Listener { port: 22, instance_port: 22 }]);
        assert_eq!(lb.idle_timeout_seconds, 1200);
        assert_eq!(lb.health_check.target, "TCP:22");
        assert_eq!(lb.health_check.healthy_threshold, 2);
        assert_eq!(lb.subnets.len(), 2);
        assert!(lb.security_groups.contains(&"sg-extra".to_string()));

        // The extra group is registered shared
        let shared = registry.get("sg-extra").unwrap();
        let TaskKind::SecurityGroup(sg) = &shared.kind else {
            panic!("expected security group");
        };
        assert!(sg.shared);

        // Public name produced an A record at the balancer
        let record = registry.get("ssh.demo.example.com").unwrap();
        let TaskKind::DnsRecord(dns) = &record.kind else {
            panic!("expected dns record");
        };
        assert_eq!(dns.record_type, "A");
        assert_eq!(dns.target_load_balancer, "bastion.demo.example.com");
    }

    #[test]
    fn test_unresolvable_zone_propagates() {
        let cluster = cluster();
        let igs = vec![group("bastion", InstanceGroupRole::Bastion, &["eu-west-9z"])];
        let subnets = subnets();
        let mut registry = TaskRegistry::new();
        let err = BastionPolicyBuilder {
            cluster: &cluster,
            instance_groups: &igs,
            subnets: &subnets,
            lifecycle: Lifecycle::Sync,
            security_lifecycle: Lifecycle::Sync,
        }
        .build(&mut registry)
        .unwrap_err();
        assert!(err.to_string().contains("eu-west-9z"));
    }
}
