//! Docker CLI launcher

use super::{LaunchOutcome, LaunchSpec, Launcher};
use crate::config::SandboxConfig;
use crate::runner::RUNNER_SCRIPT;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Mount point of the workspace inside the container
const CONTAINER_WORKDIR: &str = "/code";

const DEFAULT_PIDS_LIMIT: u32 = 50;

/// Runs each cell in a fresh `docker run --rm` container with networking off
#[derive(Debug, Clone)]
pub struct DockerLauncher {
    docker_bin: String,
    pids_limit: u32,
    timeout: Option<Duration>,
}

impl DockerLauncher {
    pub fn new() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            pids_limit: DEFAULT_PIDS_LIMIT,
            timeout: None,
        }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            docker_bin: config.docker_bin.clone(),
            pids_limit: config.pids_limit,
            timeout: config.timeout,
        }
    }

    pub fn with_binary(mut self, docker_bin: impl Into<String>) -> Self {
        self.docker_bin = docker_bin.into();
        self
    }

    pub fn with_pids_limit(mut self, pids_limit: u32) -> Self {
        self.pids_limit = pids_limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Arguments for `docker run`
    fn run_args(&self, spec: &LaunchSpec) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{}", spec.workspace.display(), CONTAINER_WORKDIR),
            "-w".to_string(),
            CONTAINER_WORKDIR.to_string(),
            "--network".to_string(),
            "none".to_string(),
            "--memory".to_string(),
            spec.envelope.memory.as_docker_arg().to_string(),
            "--cpus".to_string(),
            spec.envelope.cpu.as_docker_arg().to_string(),
            "--pids-limit".to_string(),
            self.pids_limit.to_string(),
            "--name".to_string(),
            spec.execution_id.container_name(),
            spec.image.clone(),
            "python".to_string(),
            RUNNER_SCRIPT.to_string(),
        ]
    }

    /// Force-remove a container whose client was killed
    async fn force_remove(&self, container: &str) {
        let status = Command::new(&self.docker_bin)
            .args(["rm", "-f", container])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) if status.success() => {
                tracing::debug!(container, "Removed timed-out container")
            }
            Ok(status) => {
                tracing::warn!(container, ?status, "Could not remove timed-out container")
            }
            Err(e) => {
                tracing::warn!(container, error = %e, "Could not remove timed-out container")
            }
        }
    }
}

/// Removes the container if the launch future is dropped before the run ends.
///
/// `kill_on_drop` only stops the docker client; the container itself would
/// keep running against a workspace that is about to be deleted.
struct ContainerGuard {
    docker_bin: String,
    container: String,
    armed: bool,
}

impl ContainerGuard {
    fn new(docker_bin: &str, container: &str) -> Self {
        Self {
            docker_bin: docker_bin.to_string(),
            container: container.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(container = %self.container, "Launch abandoned, removing container");
        let spawned = std::process::Command::new(&self.docker_bin)
            .args(["rm", "-f", &self.container])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            // Reap off-thread so drop never blocks the runtime
            Ok(mut child) => {
                std::thread::spawn(move || child.wait());
            }
            Err(e) => {
                tracing::warn!(container = %self.container, error = %e, "Could not remove abandoned container")
            }
        }
    }
}

impl Default for DockerLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Launcher for DockerLauncher {
    async fn preflight(&self) -> bool {
        Command::new(&self.docker_bin)
            .arg("info")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn launch(&self, spec: LaunchSpec) -> LaunchOutcome {
        let container = spec.execution_id.container_name();
        tracing::info!(
            execution_id = %spec.execution_id,
            container = %container,
            image = %spec.image,
            memory = %spec.envelope.memory,
            cpus = %spec.envelope.cpu,
            pids_limit = self.pids_limit,
            "Launching sandbox"
        );

        let mut child = match Command::new(&self.docker_bin)
            .args(self.run_args(&spec))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return LaunchOutcome::Failed {
                    error: format!("Failed to start {}: {}", self.docker_bin, e),
                    output: Vec::new(),
                }
            }
        };

        let mut guard = ContainerGuard::new(&self.docker_bin, &container);
        let collector = tokio::spawn(read_combined(child.stdout.take(), child.stderr.take()));

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };

        match waited {
            Some(Ok(status)) => {
                // `--rm` has already cleaned up after a client that exited
                guard.disarm();
                LaunchOutcome::Exited {
                    code: status.code(),
                    output: collector.await.unwrap_or_default(),
                }
            }
            Some(Err(e)) => {
                let _ = child.kill().await;
                guard.disarm();
                self.force_remove(&container).await;
                LaunchOutcome::Failed {
                    error: format!("Process wait error: {}", e),
                    output: collector.await.unwrap_or_default(),
                }
            }
            None => {
                let after = self.timeout.unwrap_or_default();
                tracing::warn!(container = %container, ?after, "Sandbox deadline exceeded");
                let _ = child.kill().await;
                guard.disarm();
                self.force_remove(&container).await;
                LaunchOutcome::TimedOut {
                    after,
                    output: collector.await.unwrap_or_default(),
                }
            }
        }
    }

    fn name(&self) -> &str {
        "docker"
    }
}

/// Interleave stdout and stderr into one buffer in arrival order
async fn read_combined<O, E>(mut stdout: Option<O>, mut stderr: Option<E>) -> Vec<u8>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut combined = Vec::new();
    let mut out_buf = [0u8; 8192];
    let mut err_buf = [0u8; 8192];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_buf) => match read {
                Some(n) => combined.extend_from_slice(&out_buf[..n]),
                None => stdout = None,
            },
            read = read_chunk(&mut stderr, &mut err_buf) => match read {
                Some(n) => combined.extend_from_slice(&err_buf[..n]),
                None => stderr = None,
            },
        }
    }

    combined
}

/// Next chunk from a stream; `None` at end of stream, pending forever once closed
async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut Option<R>, buf: &mut [u8]) -> Option<usize> {
    match reader {
        Some(r) => match r.read(buf).await {
            Ok(0) | Err(_) => None,
            Ok(n) => Some(n),
        },
        None => std::future::pending().await,
    }
}
