//! Request-level rejections
//!
//! Sandbox-level failures (non-zero exit, timeout, launch error) are not
//! errors; they are folded into the narrative output instead.

use crate::quota::QuotaError;
use thiserror::Error;

/// Whose fault a rejection is, for mapping onto transport status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Server,
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Docker is not running. Please start Docker Desktop.")]
    DockerUnavailable,

    #[error("Invalid request")]
    InvalidRequest(#[source] serde_json::Error),

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error("{stage}")]
    Provisioning {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ExecuteError {
    pub(crate) fn provisioning(stage: &'static str, source: std::io::Error) -> Self {
        ExecuteError::Provisioning { stage, source }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ExecuteError::InvalidRequest(_) | ExecuteError::Quota(_) => ErrorClass::Client,
            ExecuteError::DockerUnavailable | ExecuteError::Provisioning { .. } => {
                ErrorClass::Server
            }
        }
    }
}
