//! Agent pod assembly
//!
//! Turns one etcd cluster definition into a fully parameterized static
//! pod: flag-encoded command, volume discovery tags, TLS-aware URLs,
//! log/certificate mounts, and the cluster-critical markings.

use crate::collaborators::{ImageRemapper, TemplateLoader};
use crate::error::{CompileError, Result};
use crate::etcdmanager::behavior::behavior_for;
use crate::etcdmanager::flags::{ManagerConfig, with_tee};
use crate::etcdmanager::ports::EtcdClusterKey;
use crate::etcdmanager::template::{ETCD_MANAGER_TEMPLATE, extract_single_pod, single_container};
use k8s_openapi::api::core::v1::{
    EnvVar, HostPathVolumeSource, Pod, ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kubeplan_core::{ClusterSpec, EtcdClusterSpec};
use kubeplan_cloud::strategy_for;
use std::collections::BTreeMap;

const DEFAULT_CPU_REQUEST: &str = "200m";
const DEFAULT_MEMORY_REQUEST: &str = "100Mi";
const DEFAULT_LOG_LEVEL: u32 = 6;

/// In-container log path; teed to here regardless of the host-side file.
const CONTAINER_LOG_FILE: &str = "/var/log/etcd.log";

/// Gossip clusters self-resolve under this suffix.
const GOSSIP_DNS_SUFFIX: &str = ".k8s.local";

/// Placeholder the agent substitutes with the member's own hostname.
const SELF_NAME: &str = "__name__";

/// Build the agent pod for one managed etcd cluster.
pub fn build_pod(
    cluster: &ClusterSpec,
    etcd_cluster: &EtcdClusterSpec,
    templates: &dyn TemplateLoader,
    images: &dyn ImageRemapper,
) -> Result<Pod> {
    let key = EtcdClusterKey::parse(&etcd_cluster.name)?;
    let ports = key.ports();

    let backup_store = etcd_cluster.backup_store().ok_or_else(|| {
        CompileError::Config(format!(
            "backup store must be set for managed etcd cluster {:?}",
            etcd_cluster.name
        ))
    })?;

    // Deprecated knobs the managed agent cannot honor: reject rather than
    // silently ignore
    if etcd_cluster.leader_election_timeout.is_some() {
        return Err(CompileError::Config(
            "leader_election_timeout is not supported by the managed etcd agent".to_string(),
        ));
    }
    if etcd_cluster.heartbeat_interval.is_some() {
        return Err(CompileError::Config(
            "heartbeat_interval is not supported by the managed etcd agent".to_string(),
        ));
    }

    let objects = templates.load_template(ETCD_MANAGER_TEMPLATE)?;
    let mut pod = extract_single_pod(objects, ETCD_MANAGER_TEMPLATE)?;

    let manager = etcd_cluster.manager.as_ref();

    {
        let container = single_container(&mut pod);
        if let Some(image) = manager.and_then(|m| m.image.as_deref()) {
            tracing::warn!(cluster = %etcd_cluster.name, %image, "overriding agent image from spec");
            container.image = Some(image.to_string());
        }
        let image = container.image.clone().unwrap_or_default();
        let remapped = images.remap_image(&image).map_err(|e| CompileError::ImageRemap {
            image: image.clone(),
            message: e.to_string(),
        })?;
        container.image = Some(remapped);
    }

    let behaviors = behavior_for(&cluster.kubernetes_version)?;

    let internal_name = key.internal_cluster_name();
    let host_log_file = format!("/var/log/{internal_name}.log");

    pod.metadata.name = Some(format!("etcd-manager-{}", etcd_cluster.name));
    let labels = pod.metadata.labels.get_or_insert_with(BTreeMap::new);
    labels.insert("k8s-app".to_string(), format!("etcd-manager-{}", etcd_cluster.name));

    // Peer URLs are effectively frozen per cluster (etcd treats changing
    // them as a cluster event), so the suffix derivation must keep
    // matching what existing clusters advertise
    let dns_suffix = internal_dns_suffix(cluster);

    let scheme = if cluster.disable_etcd_tls { "http" } else { "https" };

    let mut config = ManagerConfig {
        log_level: DEFAULT_LOG_LEVEL,
        containerized: true,
        etcd_insecure: cluster.disable_etcd_tls,
        peer_urls: format!("{scheme}://{SELF_NAME}:{}", ports.peer),
        grpc_port: ports.grpc,
        client_urls: format!("{scheme}://{SELF_NAME}:{}", ports.client),
        quarantine_client_urls: format!("{scheme}://{SELF_NAME}:{}", ports.quarantined_client),
        cluster_name: internal_name.to_string(),
        backup_store: backup_store.to_string(),
        volume_name_tag: String::new(),
        dns_suffix,
        ..Default::default()
    };

    if let Some(log_level) = manager.and_then(|m| m.log_level) {
        tracing::warn!(cluster = %etcd_cluster.name, log_level, "overriding agent log level from spec");
        config.log_level = log_level;
    }
    if let Some(interval) = manager.and_then(|m| m.discovery_poll_interval.as_deref()) {
        config.discovery_poll_interval = Some(interval.to_string());
    }

    let volume_tags =
        strategy_for(cluster.cloud_provider).volume_tags(&cluster.name, &etcd_cluster.name);
    config.volume_provider = volume_tags.volume_provider.to_string();
    config.volume_tags = volume_tags.volume_tags;
    config.volume_name_tag = volume_tags.volume_name_tag;

    {
        let container = single_container(&mut pod);
        container.command = Some(with_tee("/etcd-manager", &config.to_args(), CONTAINER_LOG_FILE));

        let cpu = etcd_cluster.cpu_request.clone().unwrap_or_else(|| DEFAULT_CPU_REQUEST.to_string());
        let memory = etcd_cluster
            .memory_request
            .clone()
            .unwrap_or_else(|| DEFAULT_MEMORY_REQUEST.to_string());
        let mut requests = BTreeMap::new();
        requests.insert("cpu".to_string(), Quantity(cpu));
        requests.insert("memory".to_string(), Quantity(memory));
        container.resources = Some(ResourceRequirements {
            requests: Some(requests),
            ..Default::default()
        });
    }

    mount_host_path(&mut pod, "varlogetcd", &host_log_file, CONTAINER_LOG_FILE, "FileOrCreate", false);

    if cluster.use_host_certificates {
        mount_host_path(
            &mut pod,
            "etc-ssl-certs",
            "/etc/ssl/certs",
            "/etc/ssl/certs",
            "DirectoryOrCreate",
            true,
        );
    }

    if behaviors.map_etc_hosts {
        mount_host_path(&mut pod, "hosts", "/etc/hosts", "/etc/hosts", "File", false);
    }

    apply_env(&mut pod, cluster, etcd_cluster);
    rewrite_pki_volume(&mut pod, &etcd_cluster.name)?;
    mark_cluster_critical(&mut pod);

    Ok(pod)
}

/// Suffix for the members' internal DNS names.
///
/// Gossip clusters derive it from the self-resolving master name (minus
/// the `api.` prefix); everything else uses `.internal.<cluster-name>`.
fn internal_dns_suffix(cluster: &ClusterSpec) -> String {
    if let Some(master_internal) = cluster.master_internal_name.as_deref() {
        if master_internal.ends_with(GOSSIP_DNS_SUFFIX) {
            return master_internal.strip_prefix("api.").unwrap_or(master_internal).to_string();
        }
    }
    format!(".internal.{}", cluster.name)
}

fn mount_host_path(
    pod: &mut Pod,
    name: &str,
    host_path: &str,
    mount_path: &str,
    host_path_type: &str,
    read_only: bool,
) {
    let container = single_container(pod);
    container.volume_mounts.get_or_insert_with(Vec::new).push(VolumeMount {
        name: name.to_string(),
        mount_path: mount_path.to_string(),
        read_only: read_only.then_some(true),
        ..Default::default()
    });
    let spec = pod.spec.as_mut().expect("validated pod has a spec");
    spec.volumes.get_or_insert_with(Vec::new).push(Volume {
        name: name.to_string(),
        host_path: Some(HostPathVolumeSource {
            path: host_path.to_string(),
            type_: Some(host_path_type.to_string()),
        }),
        ..Default::default()
    });
}

/// Common system-component environment plus per-cluster overrides; later
/// entries win, and every override is logged rather than rejected.
fn apply_env(pod: &mut Pod, cluster: &ClusterSpec, etcd_cluster: &EtcdClusterSpec) {
    let mut env: Vec<EnvVar> = Vec::new();
    if let Some(proxy) = &cluster.egress_proxy {
        let mut proxy_env: Vec<(&str, &Option<String>)> = vec![
            ("http_proxy", &proxy.http_proxy),
            ("https_proxy", &proxy.https_proxy),
            ("no_proxy", &proxy.no_proxy),
        ];
        proxy_env.sort_by_key(|(name, _)| *name);
        for (name, value) in proxy_env {
            if let Some(value) = value {
                env.push(EnvVar {
                    name: name.to_string(),
                    value: Some(value.clone()),
                    ..Default::default()
                });
            }
        }
    }

    if let Some(manager) = &etcd_cluster.manager {
        for var in &manager.env {
            tracing::warn!(
                cluster = %etcd_cluster.name,
                name = %var.name,
                value = %var.value,
                "overriding agent environment variable from spec"
            );
            env.push(EnvVar {
                name: var.name.clone(),
                value: Some(var.value.clone()),
                ..Default::default()
            });
        }
    }

    if !env.is_empty() {
        single_container(pod).env = Some(env);
    }
}

/// Point the template's PKI volume at this cluster's own directory.
fn rewrite_pki_volume(pod: &mut Pod, etcd_cluster_name: &str) -> Result<()> {
    let spec = pod.spec.as_mut().expect("validated pod has a spec");
    let volumes = spec.volumes.get_or_insert_with(Vec::new);
    for volume in volumes.iter_mut() {
        if volume.name == "pki" {
            let host_path = volume.host_path.as_mut().ok_or_else(|| {
                CompileError::Template("PKI volume has no hostPath".to_string())
            })?;
            host_path.path = format!("/etc/kubernetes/pki/etcd-manager-{etcd_cluster_name}");
            return Ok(());
        }
    }
    Err(CompileError::Template("template has no PKI volume".to_string()))
}

/// Make the pod eligible for guaranteed scheduling and restart priority.
fn mark_cluster_critical(pod: &mut Pod) {
    pod.metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert("scheduler.alpha.kubernetes.io/critical-pod".to_string(), String::new());
    if let Some(spec) = pod.spec.as_mut() {
        spec.priority_class_name = Some("system-cluster-critical".to_string());
    }
}
