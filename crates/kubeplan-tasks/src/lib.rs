//! Task model and registry for kubeplan
//!
//! A compile pass produces a flat set of named tasks. Each task describes
//! one desired cloud resource or file; the registry deduplicates by name
//! and hands the final set to the external execution engine, which owns
//! ordering, lifecycle gating, and the actual cloud calls.

pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod task;

// Re-exports
pub use error::{Result, TaskError};
pub use lifecycle::Lifecycle;
pub use registry::TaskRegistry;
pub use task::{
    DnsRecord, HealthCheck, Keypair, Listener, LoadBalancer, ManagedFile, SecurityGroup,
    SecurityGroupRule, Task, TaskKind,
};
