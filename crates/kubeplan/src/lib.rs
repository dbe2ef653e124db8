//! kubeplan: cluster resource compiler
//!
//! Translates a declarative cluster specification into a concrete,
//! idempotent set of provisioning tasks and per-node runtime manifests.
//! kubeplan is the planning layer only: it calls no cloud APIs, performs
//! no I/O of its own, and keeps no state between runs. An external
//! execution engine consumes the task set and applies it.
//!
//! # Passes
//!
//! - [`bastion::BastionPolicyBuilder`] derives the symmetric SSH access
//!   graph and the bastion load balancer from the instance groups.
//! - [`etcdmanager::EtcdManagerBuilder`] compiles each managed etcd
//!   cluster into a pod manifest, an agent flag set, and its PKI tasks.
//!
//! Both passes write into one shared [`kubeplan_tasks::TaskRegistry`];
//! [`compiler::Compiler`] runs them in sequence.
//!
//! # Determinism
//!
//! Given identical inputs the produced task set is byte-for-byte
//! identical across runs. Anything unordered (zone sets, tag maps, flag
//! tokens) is sorted before emission.

pub mod bastion;
pub mod collaborators;
pub mod compiler;
pub mod error;
pub mod etcdmanager;
pub mod naming;

// Re-exports
pub use collaborators::{
    EmbeddedTemplates, IdentityRemapper, ImageRemapper, StaticSubnets, SubnetResolver,
    TemplateLoader,
};
pub use compiler::Compiler;
pub use error::{CompileError, Result};
