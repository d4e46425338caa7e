//! Launcher trait and implementations

mod docker;

use crate::execution::ExecutionId;
use crate::limits::ResourceEnvelope;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

pub use docker::DockerLauncher;

/// Everything one sandbox run is bound to
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub execution_id: ExecutionId,

    /// Host directory mounted as the container's working directory
    pub workspace: PathBuf,

    pub image: String,

    pub envelope: ResourceEnvelope,
}

/// How a sandbox run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The process ran to completion; `code` is `None` when killed by a signal
    Exited { code: Option<i32>, output: Vec<u8> },

    /// The deadline expired and the run was torn down
    TimedOut { after: Duration, output: Vec<u8> },

    /// The process could not be started or waited on
    Failed { error: String, output: Vec<u8> },
}

impl LaunchOutcome {
    pub fn success(&self) -> bool {
        matches!(self, LaunchOutcome::Exited { code: Some(0), .. })
    }

    /// Combined stdout/stderr captured from the run
    pub fn output(&self) -> &[u8] {
        match self {
            LaunchOutcome::Exited { output, .. }
            | LaunchOutcome::TimedOut { output, .. }
            | LaunchOutcome::Failed { output, .. } => output,
        }
    }

    /// Short description of why the run did not succeed
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            LaunchOutcome::Exited { code: Some(0), .. } => None,
            LaunchOutcome::Exited { code: Some(code), .. } => Some(format!("exit status {code}")),
            LaunchOutcome::Exited { code: None, .. } => Some("terminated by signal".to_string()),
            LaunchOutcome::TimedOut { after, .. } => Some(format!(
                "deadline of {} seconds exceeded",
                after.as_secs()
            )),
            LaunchOutcome::Failed { error, .. } => Some(error.clone()),
        }
    }
}

/// Isolation backend abstraction
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Whether the backend is reachable at all
    async fn preflight(&self) -> bool;

    /// Run the workspace's entry script once, to completion
    async fn launch(&self, spec: LaunchSpec) -> LaunchOutcome;

    /// Get launcher name
    fn name(&self) -> &str;
}
