//! Etcd manifest compiler
//!
//! For every etcd cluster delegated to the managed agent, this pass
//! emits the rendered pod manifest, the backup metadata record, and the
//! certificate-authority tasks. Clusters using an externally managed
//! etcd are skipped silently.

pub mod behavior;
pub mod flags;
pub mod pod;
pub mod ports;
pub mod template;

use crate::collaborators::{ImageRemapper, TemplateLoader};
use crate::error::{CompileError, Result};
use kubeplan_core::{ClusterSpec, EtcdClusterSpec, EtcdProviderType};
use kubeplan_tasks::{Keypair, Lifecycle, ManagedFile, Task, TaskKind, TaskRegistry};
use serde::Serialize;

/// Per-cluster backup metadata, stored next to the backups so the agent
/// can seed or validate a cluster from the store alone.
#[derive(Debug, Serialize)]
struct EtcdBackupSpecRecord {
    #[serde(rename = "memberCount")]
    member_count: u32,
    #[serde(rename = "etcdVersion")]
    etcd_version: String,
}

/// Compiles managed etcd clusters into manifests, metadata, and PKI
/// tasks.
pub struct EtcdManagerBuilder<'a> {
    pub cluster: &'a ClusterSpec,
    pub templates: &'a dyn TemplateLoader,
    pub images: &'a dyn ImageRemapper,
    pub lifecycle: Lifecycle,
}

impl EtcdManagerBuilder<'_> {
    pub fn build(&self, registry: &mut TaskRegistry) -> Result<()> {
        for etcd_cluster in &self.cluster.etcd_clusters {
            if etcd_cluster.provider != EtcdProviderType::Manager {
                continue;
            }
            self.build_cluster(registry, etcd_cluster)?;
        }
        Ok(())
    }

    fn build_cluster(
        &self,
        registry: &mut TaskRegistry,
        etcd_cluster: &EtcdClusterSpec,
    ) -> Result<()> {
        let name = &etcd_cluster.name;

        // Validated once, up front: there is no safe default location for
        // backups, and every later step assumes the store exists
        let backup_store = etcd_cluster.backup_store().ok_or_else(|| {
            CompileError::Config(format!(
                "backup store must be set for managed etcd cluster {name:?}"
            ))
        })?;

        let pod = pod::build_pod(self.cluster, etcd_cluster, self.templates, self.images)?;
        let manifest = serde_yaml::to_string(&pod)?;

        registry.add(Task::new(
            format!("manifests-etcdmanager-{name}"),
            self.lifecycle,
            TaskKind::ManagedFile(ManagedFile {
                base: None,
                location: format!("manifests/etcd/{name}.yaml"),
                contents: manifest.into_bytes(),
            }),
        ))?;

        let record = EtcdBackupSpecRecord {
            member_count: etcd_cluster.members.len() as u32,
            etcd_version: etcd_cluster.version.clone(),
        };
        registry.add(Task::new(
            format!("etcd-cluster-spec-{name}"),
            self.lifecycle,
            TaskKind::ManagedFile(ManagedFile {
                base: Some(backup_store.to_string()),
                location: "control/etcd-cluster-spec".to_string(),
                contents: serde_json::to_vec_pretty(&record)?,
            }),
        ))?;

        // One CA for manager-to-manager trust, one for etcd peer trust
        registry.add(ca_task(format!("etcd-manager-ca-{name}"), self.lifecycle))?;
        registry.add(ca_task(format!("etcd-peers-ca-{name}"), self.lifecycle))?;

        // The API server carries a single client certificate, so the
        // client CA is shared by every etcd cluster: ensure, not add
        registry.ensure(ca_task("etcd-clients-ca".to_string(), self.lifecycle))?;

        // cilium talks to its etcd directly and gets its own client CA
        if name == "cilium" {
            registry.add(ca_task("etcd-clients-ca-cilium".to_string(), self.lifecycle))?;
        }

        Ok(())
    }
}

fn ca_task(name: String, lifecycle: Lifecycle) -> Task {
    let subject = format!("cn={name}");
    Task::new(
        name,
        lifecycle,
        TaskKind::Keypair(Keypair {
            subject,
            keypair_type: "ca".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{EmbeddedTemplates, IdentityRemapper};
    use kubeplan_cloud::CloudProviderId;
    use kubeplan_core::{EtcdBackupSpec, EtcdMemberSpec};
    use std::collections::BTreeMap;

    fn etcd_cluster(name: &str) -> EtcdClusterSpec {
        EtcdClusterSpec {
            name: name.to_string(),
            version: "3.4.13".to_string(),
            members: vec![
                EtcdMemberSpec { name: "a".to_string(), instance_group: None },
                EtcdMemberSpec { name: "b".to_string(), instance_group: None },
                EtcdMemberSpec { name: "c".to_string(), instance_group: None },
            ],
            backups: Some(EtcdBackupSpec {
                backup_store: format!("s3://bucket/demo/backups/etcd/{name}"),
            }),
            ..Default::default()
        }
    }

    fn cluster(etcd_clusters: Vec<EtcdClusterSpec>) -> ClusterSpec {
        ClusterSpec {
            name: "demo.example.com".to_string(),
            cloud_provider: CloudProviderId::Aws,
            kubernetes_version: "1.18.0".to_string(),
            master_internal_name: None,
            ssh_access: Vec::new(),
            topology: None,
            etcd_clusters,
            cloud_labels: BTreeMap::new(),
            use_host_certificates: false,
            disable_etcd_tls: false,
            egress_proxy: None,
        }
    }

    fn build(cluster: &ClusterSpec) -> Result<TaskRegistry> {
        let mut registry = TaskRegistry::new();
        EtcdManagerBuilder {
            cluster,
            templates: &EmbeddedTemplates,
            images: &IdentityRemapper,
            lifecycle: Lifecycle::Sync,
        }
        .build(&mut registry)?;
        Ok(registry)
    }

    #[test]
    fn test_client_ca_shared_across_clusters() {
        let cluster = cluster(vec![etcd_cluster("main"), etcd_cluster("events")]);
        let registry = build(&cluster).unwrap();

        let client_cas = registry
            .tasks()
            .filter(|t| t.name.starts_with("etcd-clients-ca"))
            .count();
        assert_eq!(client_cas, 1);

        // Per-cluster CAs stay distinct
        assert!(registry.get("etcd-manager-ca-main").is_some());
        assert!(registry.get("etcd-manager-ca-events").is_some());
        assert!(registry.get("etcd-peers-ca-main").is_some());
        assert!(registry.get("etcd-peers-ca-events").is_some());
    }

    #[test]
    fn test_cilium_gets_dedicated_client_ca() {
        let cluster = cluster(vec![etcd_cluster("main"), etcd_cluster("cilium")]);
        let registry = build(&cluster).unwrap();
        assert!(registry.get("etcd-clients-ca").is_some());
        assert!(registry.get("etcd-clients-ca-cilium").is_some());
    }

    #[test]
    fn test_backup_metadata_record() {
        let cluster = cluster(vec![etcd_cluster("main")]);
        let registry = build(&cluster).unwrap();
        let task = registry.get("etcd-cluster-spec-main").unwrap();
        let TaskKind::ManagedFile(file) = &task.kind else {
            panic!("expected managed file");
        };
        assert_eq!(file.base.as_deref(), Some("s3://bucket/demo/backups/etcd/main"));
        assert_eq!(file.location, "control/etcd-cluster-spec");

        let record: serde_json::Value = serde_json::from_slice(&file.contents).unwrap();
        assert_eq!(record["memberCount"], 3);
        assert_eq!(record["etcdVersion"], "3.4.13");
    }

    #[test]
    fn test_manifest_file_per_cluster() {
        let cluster = cluster(vec![etcd_cluster("main"), etcd_cluster("events")]);
        let registry = build(&cluster).unwrap();
        for name in ["main", "events"] {
            let task = registry.get(&format!("manifests-etcdmanager-{name}")).unwrap();
            let TaskKind::ManagedFile(file) = &task.kind else {
                panic!("expected managed file");
            };
            assert_eq!(file.location, format!("manifests/etcd/{name}.yaml"));
            let yaml = std::str::from_utf8(&file.contents).unwrap();
            assert!(yaml.contains(&format!("etcd-manager-{name}")));
        }
    }

    #[test]
    fn test_legacy_clusters_skipped_silently() {
        let mut legacy = etcd_cluster("main");
        legacy.provider = EtcdProviderType::Legacy;
        let cluster = cluster(vec![legacy]);
        let registry = build(&cluster).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_backup_store_fails_pass() {
        let mut spec = etcd_cluster("main");
        spec.backups = None;
        let cluster = cluster(vec![spec]);
        let err = build(&cluster).unwrap_err();
        assert!(matches!(err, CompileError::Config(_)));
    }
}
