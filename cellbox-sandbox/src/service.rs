//! Sandbox service - main entry point

use crate::artifacts::collect_images;
use crate::config::SandboxConfig;
use crate::error::ExecuteError;
use crate::execution::ExecutionId;
use crate::runtime::{DockerLauncher, LaunchOutcome, LaunchSpec, Launcher};
use crate::types::{ExecutionRequest, ExecutionResult};
use crate::workspace::Workspace;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Runs execution requests through quota, workspace, policy, launch and collection
pub struct SandboxService {
    config: Arc<SandboxConfig>,
    launcher: Arc<dyn Launcher>,
    /// Admission control for concurrent launches (None = unbounded)
    permits: Option<Arc<Semaphore>>,
}

impl SandboxService {
    /// Create a new sandbox service with the given launcher
    pub fn new(config: SandboxConfig, launcher: impl Launcher + 'static) -> Self {
        let permits = (config.max_concurrent_runs > 0)
            .then(|| Arc::new(Semaphore::new(config.max_concurrent_runs)));
        Self {
            config: Arc::new(config),
            launcher: Arc::new(launcher),
            permits,
        }
    }

    /// Create a service backed by the docker CLI
    pub fn with_docker(config: SandboxConfig) -> Self {
        let launcher = DockerLauncher::from_config(&config);
        Self::new(config, launcher)
    }

    /// Get the launcher name
    pub fn launcher_name(&self) -> &str {
        self.launcher.name()
    }

    /// Whether the isolation backend is reachable
    pub async fn preflight(&self) -> bool {
        self.launcher.preflight().await
    }

    /// Execute a raw JSON request body.
    ///
    /// The backend check runs before the body is even parsed, so an
    /// unreachable backend is reported ahead of a malformed request.
    pub async fn execute_payload(&self, body: &[u8]) -> Result<ExecutionResult, ExecuteError> {
        self.ensure_available().await?;
        let request: ExecutionRequest =
            serde_json::from_slice(body).map_err(ExecuteError::InvalidRequest)?;
        self.run(request).await
    }

    /// Execute an already-decoded request
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecuteError> {
        self.ensure_available().await?;
        self.run(request).await
    }

    async fn ensure_available(&self) -> Result<(), ExecuteError> {
        if self.launcher.preflight().await {
            Ok(())
        } else {
            tracing::error!(launcher = self.launcher.name(), "Isolation backend unreachable");
            Err(ExecuteError::DockerUnavailable)
        }
    }

    async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecuteError> {
        let id = ExecutionId::new();

        tracing::info!(
            execution_id = %id,
            runtime = %request.runtime,
            code_len = request.code.len(),
            files = request.files.len(),
            "Executing code"
        );

        // Nothing touches the disk until the uploads are known to fit
        let upload_bytes = self.config.quota.check(&request.files).map_err(|e| {
            tracing::info!(execution_id = %id, error = %e, "Upload quota rejected request");
            e
        })?;

        let workspace = Workspace::acquire(self.config.workspace_root.as_deref())
            .map_err(|e| ExecuteError::provisioning("Cannot create temp dir", e))?;

        let written = workspace.write_uploads(&request.files).await;
        tracing::debug!(
            execution_id = %id,
            written,
            skipped = request.files.len() - written,
            upload_bytes,
            "Uploads materialised"
        );

        workspace
            .write_entry(&request.code)
            .await
            .map_err(|e| ExecuteError::provisioning("Cannot write user code file", e))?;

        let selection = self.config.policy.resolve_runtime(&request.runtime);
        tracing::debug!(
            execution_id = %id,
            runtime = ?selection.kind,
            image = %selection.image,
            runner = ?selection.runner,
            "Runtime resolved"
        );
        workspace
            .write_runner(selection.runner)
            .await
            .map_err(|e| ExecuteError::provisioning("Cannot write runner", e))?;

        let envelope = self
            .config
            .policy
            .resolve_resources(&request.mem, &request.cpu);

        let spec = LaunchSpec {
            execution_id: id,
            workspace: workspace.path().to_path_buf(),
            image: selection.image,
            envelope,
        };

        let (outcome, duration) = {
            let queued = Instant::now();
            let _permit = match &self.permits {
                Some(permits) => permits.acquire().await.ok(),
                None => None,
            };
            tracing::debug!(
                execution_id = %id,
                queued_ms = queued.elapsed().as_millis() as u64,
                "Launch admitted"
            );

            // Reported duration covers the sandbox run only
            let start = Instant::now();
            let outcome = self.launcher.launch(spec).await;
            (outcome, start.elapsed())
        };

        // Figures are surfaced whether or not the run succeeded
        let images = collect_images(&workspace.artifact_dir()).await;
        workspace.release();

        tracing::info!(
            execution_id = %id,
            success = outcome.success(),
            duration_ms = duration.as_millis() as u64,
            images = images.len(),
            "Execution finished"
        );

        Ok(compose(&outcome, duration, images))
    }
}

/// Turn a launch outcome into the narrative result envelope
fn compose(outcome: &LaunchOutcome, duration: Duration, images: Vec<String>) -> ExecutionResult {
    let seconds = duration.as_secs_f64();
    let raw = String::from_utf8_lossy(outcome.output());

    let output = match outcome.failure_reason() {
        None if raw.is_empty() => {
            format!("Cell ran successfully. (No output)\nDuration: {seconds:.2} seconds")
        }
        None => format!("{raw}\n\nCell ran successfully.\nDuration: {seconds:.2} seconds"),
        Some(reason) => {
            let headline = match outcome {
                LaunchOutcome::TimedOut { .. } => "Code execution timed out.",
                _ => "Code execution failed.",
            };
            format!(
                "{headline}\nDuration: {seconds:.2} seconds\n\nError: {reason}\n\nOutput:\n{raw}"
            )
        }
    };

    ExecutionResult {
        output,
        error: None,
        images,
    }
}
