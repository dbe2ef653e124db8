//! Compiler error types

use thiserror::Error;

/// Errors surfaced by the compile passes.
///
/// Every variant is fatal to the pass: the inputs are static, so retrying
/// cannot help, and callers must discard the partially filled registry.
#[derive(Error, Debug)]
pub enum CompileError {
    /// A cluster spec field is missing, unsupported, or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// The manifest template violated a structural precondition
    #[error("Template error: {0}")]
    Template(String),

    /// Zone-to-subnet resolution failed; propagated verbatim from the
    /// network-topology collaborator
    #[error("Subnet resolution failed for zone {zone:?}: {message}")]
    SubnetResolve { zone: String, message: String },

    /// Image remapping failed in the asset-management collaborator
    #[error("Unable to remap container image {image:?}: {message}")]
    ImageRemap { image: String, message: String },

    #[error(transparent)]
    Task(#[from] kubeplan_tasks::TaskError),

    #[error(transparent)]
    Cloud(#[from] kubeplan_cloud::CloudError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CompileError>;
