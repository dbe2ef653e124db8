//! The compile entry point
//!
//! Runs every builder pass in a fixed sequence over one shared registry.
//! Passes are single-threaded and stateless; the only coupling between
//! them is the registry's name-collision contract.

use crate::bastion::BastionPolicyBuilder;
use crate::collaborators::{ImageRemapper, SubnetResolver, TemplateLoader};
use crate::error::Result;
use crate::etcdmanager::EtcdManagerBuilder;
use kubeplan_core::{ClusterSpec, InstanceGroup};
use kubeplan_tasks::{Lifecycle, TaskRegistry};

/// One compile run: cluster spec in, task registry out.
pub struct Compiler<'a> {
    pub cluster: &'a ClusterSpec,
    pub instance_groups: &'a [InstanceGroup],
    pub subnets: &'a dyn SubnetResolver,
    pub templates: &'a dyn TemplateLoader,
    pub images: &'a dyn ImageRemapper,

    /// Phase stamped on ordinary resources
    pub lifecycle: Lifecycle,

    /// Phase stamped on security groups and rules, which some operators
    /// gate more conservatively
    pub security_lifecycle: Lifecycle,
}

impl<'a> Compiler<'a> {
    pub fn new(
        cluster: &'a ClusterSpec,
        instance_groups: &'a [InstanceGroup],
        subnets: &'a dyn SubnetResolver,
        templates: &'a dyn TemplateLoader,
        images: &'a dyn ImageRemapper,
    ) -> Self {
        Self {
            cluster,
            instance_groups,
            subnets,
            templates,
            images,
            lifecycle: Lifecycle::Sync,
            security_lifecycle: Lifecycle::Sync,
        }
    }

    /// Run all passes. On error the registry is dropped: a failed pass
    /// must never expose a partially populated task set.
    pub fn compile(&self) -> Result<TaskRegistry> {
        let mut registry = TaskRegistry::new();

        BastionPolicyBuilder {
            cluster: self.cluster,
            instance_groups: self.instance_groups,
            subnets: self.subnets,
            lifecycle: self.lifecycle,
            security_lifecycle: self.security_lifecycle,
        }
        .build(&mut registry)?;

        EtcdManagerBuilder {
            cluster: self.cluster,
            templates: self.templates,
            images: self.images,
            lifecycle: self.lifecycle,
        }
        .build(&mut registry)?;

        tracing::debug!(tasks = registry.len(), cluster = %self.cluster.name, "compile complete");
        Ok(registry)
    }
}
