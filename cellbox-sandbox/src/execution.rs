//! Execution identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of every sandbox container name
const CONTAINER_PREFIX: &str = "sandbox-";

/// Identifies one run across logs, its workspace and its container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub uuid::Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Container name for this run; unique as long as the id is
    pub fn container_name(&self) -> String {
        format!("{CONTAINER_PREFIX}{}", self.0)
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
