//! End-to-end compile tests over a realistic private-topology cluster.

use kubeplan::{Compiler, EmbeddedTemplates, IdentityRemapper, StaticSubnets};
use kubeplan_cloud::CloudProviderId;
use kubeplan_core::{
    BastionTopology, ClusterSpec, EtcdBackupSpec, EtcdClusterSpec, EtcdMemberSpec, InstanceGroup,
    InstanceGroupRole, Topology,
};
use kubeplan_tasks::{TaskKind, TaskRegistry};
use std::collections::BTreeMap;

fn etcd_cluster(name: &str) -> EtcdClusterSpec {
    EtcdClusterSpec {
        name: name.to_string(),
        version: "3.4.13".to_string(),
        members: ["a", "b", "c"]
            .iter()
            .map(|m| EtcdMemberSpec {
                name: m.to_string(),
                instance_group: Some(format!("master-{m}")),
            })
            .collect(),
        backups: Some(EtcdBackupSpec {
            backup_store: format!("s3://state-store/demo.example.com/backups/etcd/{name}"),
        }),
        ..Default::default()
    }
}

fn cluster() -> ClusterSpec {
    ClusterSpec {
        name: "demo.example.com".to_string(),
        cloud_provider: CloudProviderId::Aws,
        kubernetes_version: "1.18.3".to_string(),
        master_internal_name: Some("api.internal.demo.example.com".to_string()),
        ssh_access: vec!["203.0.113.0/24".to_string(), "198.51.100.0/24".to_string()],
        topology: Some(Topology {
            bastion: Some(BastionTopology {
                public_name: Some("ssh.demo.example.com".to_string()),
                idle_timeout_seconds: None,
                load_balancer: None,
            }),
        }),
        etcd_clusters: vec![etcd_cluster("main"), etcd_cluster("events")],
        cloud_labels: BTreeMap::from([("team".to_string(), "platform".to_string())]),
        use_host_certificates: false,
        disable_etcd_tls: false,
        egress_proxy: None,
    }
}

fn instance_groups() -> Vec<InstanceGroup> {
    let mut igs = Vec::new();
    for (name, role, zone) in [
        ("bastion-1a", InstanceGroupRole::Bastion, "us-east-1a"),
        ("master-1a", InstanceGroupRole::Master, "us-east-1a"),
        ("master-1b", InstanceGroupRole::Master, "us-east-1b"),
        ("nodes", InstanceGroupRole::Node, "us-east-1a"),
    ] {
        igs.push(InstanceGroup {
            name: name.to_string(),
            role,
            zones: vec![zone.to_string()],
            ..Default::default()
        });
    }
    igs
}

fn subnets() -> StaticSubnets {
    let mut subnets = StaticSubnets::new();
    subnets.insert("us-east-1a", "subnet-utility-1a");
    subnets.insert("us-east-1b", "subnet-utility-1b");
    subnets
}

fn compile(cluster: &ClusterSpec, igs: &[InstanceGroup]) -> TaskRegistry {
    let subnets = subnets();
    Compiler::new(cluster, igs, &subnets, &EmbeddedTemplates, &IdentityRemapper)
        .compile()
        .unwrap()
}

/// Serialize the registry the way the executor would diff it.
fn snapshot(registry: &TaskRegistry) -> String {
    let tasks: Vec<_> = registry.tasks().collect();
    serde_json::to_string_pretty(&tasks).unwrap()
}

#[test]
fn test_compile_is_deterministic() {
    let cluster = cluster();
    let igs = instance_groups();
    let first = snapshot(&compile(&cluster, &igs));
    let second = snapshot(&compile(&cluster, &igs));
    assert_eq!(first, second);
}

#[test]
fn test_both_passes_share_one_registry() {
    let registry = compile(&cluster(), &instance_groups());

    // bastion pass output
    assert!(registry.get("bastions.demo.example.com").is_some());
    assert!(registry.get("bastion.demo.example.com").is_some());

    // etcd pass output
    assert!(registry.get("manifests-etcdmanager-main").is_some());
    assert!(registry.get("manifests-etcdmanager-events").is_some());
    assert!(registry.get("etcd-clients-ca").is_some());
}

#[test]
fn test_rule_cardinality_matches_group_product() {
    let registry = compile(&cluster(), &instance_groups());

    // One default bastion group, one default master group (two igs share
    // it), one default node group: 1 x (1 + 1) SSH rules
    let bastion_to_master = registry
        .tasks()
        .filter(|t| t.name.starts_with("bastion-to-master-ssh"))
        .count();
    let bastion_to_node = registry
        .tasks()
        .filter(|t| t.name.starts_with("bastion-to-node-ssh"))
        .count();
    assert_eq!(bastion_to_master, 1);
    assert_eq!(bastion_to_node, 1);
}

#[test]
fn test_each_ssh_cidr_gets_a_rule() {
    let registry = compile(&cluster(), &instance_groups());
    for cidr in ["203.0.113.0/24", "198.51.100.0/24"] {
        let task = registry
            .get(&format!("ssh-external-to-bastion-elb-{cidr}"))
            .unwrap();
        let TaskKind::SecurityGroupRule(rule) = &task.kind else {
            panic!("expected rule");
        };
        assert_eq!(rule.cidr.as_deref(), Some(cidr));
        assert_eq!(rule.security_group, "bastion-elb.demo.example.com");
    }
}

#[test]
fn test_manifests_embed_fixed_ports() {
    let registry = compile(&cluster(), &instance_groups());
    let task = registry.get("manifests-etcdmanager-events").unwrap();
    let TaskKind::ManagedFile(file) = &task.kind else {
        panic!("expected managed file");
    };
    let yaml = std::str::from_utf8(&file.contents).unwrap();
    assert!(yaml.contains("--client-urls=https://__name__:4002"));
    assert!(yaml.contains("--peer-urls=https://__name__:2381"));
}

#[test]
fn test_no_bastion_cluster_still_compiles_etcd() {
    let cluster = cluster();
    let igs: Vec<InstanceGroup> = instance_groups()
        .into_iter()
        .filter(|ig| ig.role != InstanceGroupRole::Bastion)
        .collect();
    let registry = compile(&cluster, &igs);
    assert!(registry.get("bastions.demo.example.com").is_none());
    assert!(registry.get("manifests-etcdmanager-main").is_some());
}

#[test]
fn test_failed_pass_yields_no_registry() {
    let mut cluster = cluster();
    cluster.etcd_clusters[0].leader_election_timeout = Some(1000);
    let igs = instance_groups();
    let subnets = subnets();
    let result =
        Compiler::new(&cluster, &igs, &subnets, &EmbeddedTemplates, &IdentityRemapper).compile();
    assert!(result.is_err());
}
