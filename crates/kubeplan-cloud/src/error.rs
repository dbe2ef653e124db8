//! Cloud table error types

use thiserror::Error;

/// Cloud provider table errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Unsupported cloud provider: {0}")]
    UnsupportedProvider(String),
}

pub type Result<T> = std::result::Result<T, CloudError>;
