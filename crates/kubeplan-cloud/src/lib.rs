//! Cloud provider tables for kubeplan
//!
//! This crate holds everything kubeplan knows about individual cloud
//! providers: the closed provider enumeration and the per-provider
//! volume-tag strategy the etcd-manager agent uses to discover its
//! persistent disk on each cloud.
//!
//! The planning layer never talks to a cloud API; this crate is pure
//! lookup tables and stays free of SDK dependencies.

pub mod error;
pub mod provider;
pub mod volumes;

// Re-exports
pub use error::{CloudError, Result};
pub use provider::CloudProviderId;
pub use volumes::{VolumeTagStrategy, VolumeTags, strategy_for};
