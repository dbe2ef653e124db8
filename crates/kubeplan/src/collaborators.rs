//! External collaborator seams
//!
//! The compiler performs no I/O itself; subnet lookup, template loading,
//! and image remapping go through these traits. All three are assumed
//! synchronous and side-effect-free for planning purposes.

use crate::error::{CompileError, Result};
use crate::etcdmanager::template;
use k8s_openapi::api::core::v1::Pod;
use kubeplan_core::SubnetRef;
use std::collections::BTreeMap;

/// Zone-to-subnet resolution, provided by the network-topology
/// collaborator.
pub trait SubnetResolver {
    /// Resolve the utility-network subnet for a zone. Failures are
    /// configuration errors and propagate unchanged.
    fn resolve_utility_subnet(&self, zone: &str) -> Result<SubnetRef>;
}

/// Manifest template loading, provided by the packaging collaborator.
pub trait TemplateLoader {
    /// Load the named template as a list of structured pod objects.
    fn load_template(&self, name: &str) -> Result<Vec<Pod>>;
}

/// Container image remapping, provided by the asset-management
/// collaborator (e.g. to point at a mirror registry).
pub trait ImageRemapper {
    fn remap_image(&self, image: &str) -> Result<String>;
}

/// In-memory subnet table, for tests and fixed topologies.
#[derive(Debug, Default)]
pub struct StaticSubnets {
    subnets: BTreeMap<String, SubnetRef>,
}

impl StaticSubnets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, zone: impl Into<String>, subnet_id: impl Into<String>) {
        let zone = zone.into();
        self.subnets.insert(
            zone.clone(),
            SubnetRef {
                id: subnet_id.into(),
                zone,
            },
        );
    }
}

impl SubnetResolver for StaticSubnets {
    fn resolve_utility_subnet(&self, zone: &str) -> Result<SubnetRef> {
        self.subnets.get(zone).cloned().ok_or_else(|| CompileError::SubnetResolve {
            zone: zone.to_string(),
            message: "no utility subnet in zone".to_string(),
        })
    }
}

/// Loader serving the manifests compiled into this crate.
#[derive(Debug, Default)]
pub struct EmbeddedTemplates;

impl TemplateLoader for EmbeddedTemplates {
    fn load_template(&self, name: &str) -> Result<Vec<Pod>> {
        match name {
            template::ETCD_MANAGER_TEMPLATE => template::parse_manifest(template::DEFAULT_MANIFEST),
            other => Err(CompileError::Template(format!("unknown template {other:?}"))),
        }
    }
}

/// Remapper that leaves every image reference untouched.
#[derive(Debug, Default)]
pub struct IdentityRemapper;

impl ImageRemapper for IdentityRemapper {
    fn remap_image(&self, image: &str) -> Result<String> {
        Ok(image.to_string())
    }
}
