//! Task lifecycle phases

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the execution engine may treat a task's resource in a given run.
///
/// The compiler only stamps the phase on each task; interpretation belongs
/// entirely to the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Create, update, and delete freely
    #[default]
    Sync,
    /// Like Sync, but degrade to a warning when cloud access is missing
    WarnIfInsufficientAccess,
    /// Resource must already exist; validate it matches
    ExistsAndValidates,
    /// Resource must already exist; warn on drift instead of failing
    ExistsAndWarnIfChanges,
    /// Leave the resource alone entirely
    Ignore,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Sync => "sync",
            Lifecycle::WarnIfInsufficientAccess => "warn-if-insufficient-access",
            Lifecycle::ExistsAndValidates => "exists-and-validates",
            Lifecycle::ExistsAndWarnIfChanges => "exists-and-warn-if-changes",
            Lifecycle::Ignore => "ignore",
        };
        f.write_str(s)
    }
}
