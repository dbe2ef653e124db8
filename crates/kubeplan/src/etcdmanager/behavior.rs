//! Version-gated compiler behavior
//!
//! Behavior that depends on the target Kubernetes version lives in this
//! one policy table, so every version boundary is auditable in a single
//! place. Boundaries are permanent: once a gate ships, moving it would
//! change manifests of already-provisioned clusters.

use crate::error::{CompileError, Result};

/// Behavioral switches derived from the target version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerBehaviors {
    /// Mount the node's /etc/hosts into the agent container.
    ///
    /// The managed agent keeps its host-name changes self-contained, so
    /// sharing the node's hosts file is unnecessary and risks concurrent
    /// writes across bind mounts. Clusters created before 1.17 already
    /// run with the shared mount, and it stays that way for them.
    pub map_etc_hosts: bool,
}

/// Behavior table for a target Kubernetes version string like "1.18.3".
pub fn behavior_for(kubernetes_version: &str) -> Result<CompilerBehaviors> {
    let (major, minor) = parse_major_minor(kubernetes_version)?;
    Ok(CompilerBehaviors {
        map_etc_hosts: (major, minor) < (1, 17),
    })
}

fn parse_major_minor(version: &str) -> Result<(u32, u32)> {
    let version = version.strip_prefix('v').unwrap_or(version);
    let mut parts = version.split('.');
    let parse = |part: Option<&str>| -> Result<u32> {
        part.and_then(|p| p.parse().ok()).ok_or_else(|| {
            CompileError::Config(format!("unparseable kubernetes version {version:?}"))
        })
    };
    let major = parse(parts.next())?;
    let minor = parse(parts.next())?;
    Ok((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_117_maps_etc_hosts() {
        assert!(behavior_for("1.16.7").unwrap().map_etc_hosts);
        assert!(behavior_for("v1.15.0").unwrap().map_etc_hosts);
    }

    #[test]
    fn test_117_and_later_do_not() {
        assert!(!behavior_for("1.17.0").unwrap().map_etc_hosts);
        assert!(!behavior_for("1.18.3").unwrap().map_etc_hosts);
        assert!(!behavior_for("2.0.0").unwrap().map_etc_hosts);
    }

    #[test]
    fn test_malformed_version_fails() {
        assert!(behavior_for("latest").is_err());
        assert!(behavior_for("1").is_err());
        assert!(behavior_for("").is_err());
    }
}
