//! Task registry error types

use thiserror::Error;

/// Task registry errors
#[derive(Error, Debug)]
pub enum TaskError {
    /// Two builders produced the same task name with different
    /// definitions. This is a builder-composition bug, never retried.
    #[error("Duplicate task {name:?} with conflicting definitions")]
    DuplicateTask { name: String },
}

pub type Result<T> = std::result::Result<T, TaskError>;
