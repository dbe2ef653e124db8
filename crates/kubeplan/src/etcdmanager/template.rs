//! Embedded pod template
//!
//! Until manifests ship in a bundle, the agent pod template is compiled
//! in. The compiler requires exactly one Pod with exactly one container;
//! anything else in a template is a structural error, not something to
//! work around.

use crate::error::{CompileError, Result};
use k8s_openapi::api::core::v1::{Container, Pod};
use serde::Deserialize;

/// Template name served by the embedded loader.
pub const ETCD_MANAGER_TEMPLATE: &str = "etcd-manager";

/// Default agent pod. Privileged with the host root mounted because the
/// agent mounts the data volume itself.
pub const DEFAULT_MANIFEST: &str = r#"
apiVersion: v1
kind: Pod
metadata:
  name: etcd-manager
  namespace: kube-system
spec:
  containers:
  - image: registry.k8s.io/etcd-manager:3.0.20210228
    name: etcd-manager
    resources:
      requests:
        cpu: 100m
        memory: 100Mi
    securityContext:
      privileged: true
    volumeMounts:
    - mountPath: /rootfs
      name: rootfs
    - mountPath: /run
      name: run
    - mountPath: /etc/kubernetes/pki/etcd-manager
      name: pki
  hostNetwork: true
  hostPID: true
  volumes:
  - hostPath:
      path: /
      type: Directory
    name: rootfs
  - hostPath:
      path: /run
      type: DirectoryOrCreate
    name: run
  - hostPath:
      path: /etc/kubernetes/pki/etcd-manager
      type: DirectoryOrCreate
    name: pki
"#;

/// Parse a (possibly multi-document) YAML manifest into pod objects.
pub fn parse_manifest(manifest: &str) -> Result<Vec<Pod>> {
    let mut pods = Vec::new();
    for document in serde_yaml::Deserializer::from_str(manifest) {
        let pod = Pod::deserialize(document)
            .map_err(|e| CompileError::Template(format!("manifest object is not a v1 Pod: {e}")))?;
        pods.push(pod);
    }
    Ok(pods)
}

/// Check the structural preconditions and take ownership of the single
/// pod: exactly one Pod object, exactly one container.
pub fn extract_single_pod(objects: Vec<Pod>, template_name: &str) -> Result<Pod> {
    if objects.len() != 1 {
        return Err(CompileError::Template(format!(
            "expected exactly one object in template {template_name:?}, found {}",
            objects.len()
        )));
    }
    let pod = objects.into_iter().next().unwrap();
    if container_count(&pod) != 1 {
        return Err(CompileError::Template(format!(
            "expected exactly one container in template {template_name:?}, found {}",
            container_count(&pod)
        )));
    }
    Ok(pod)
}

/// The pod's single container. Callers must have validated the pod with
/// [`extract_single_pod`] first.
pub fn single_container(pod: &mut Pod) -> &mut Container {
    &mut pod.spec.as_mut().expect("validated pod has a spec").containers[0]
}

fn container_count(pod: &Pod) -> usize {
    pod.spec.as_ref().map(|s| s.containers.len()).unwrap_or(0)
}
