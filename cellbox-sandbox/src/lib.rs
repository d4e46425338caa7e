//! Cellbox Sandbox - run untrusted Python cells in isolated containers
//!
//! Takes an inbound execution request (source code plus auxiliary files),
//! bounds and materialises it in an ephemeral workspace, launches one
//! resource-capped container over that workspace and turns whatever came back
//! (output, exit status, saved figures) into a uniform result envelope.

mod artifacts;
mod config;
mod error;
mod execution;
mod limits;
mod policy;
mod quota;
mod runner;
mod runtime;
mod service;
mod types;
mod workspace;

pub use artifacts::collect_images;
pub use config::SandboxConfig;
pub use error::{ErrorClass, ExecuteError};
pub use execution::ExecutionId;
pub use limits::{CpuShare, MemoryTier, ResourceEnvelope};
pub use policy::{RuntimeKind, RuntimeSelection, SandboxPolicy};
pub use quota::{decoded_len, split_data_uri, QuotaError, UploadQuota};
pub use runner::{runner_script, RunnerKind, ARTIFACT_DIR, ENTRY_MODULE, RUNNER_SCRIPT};
pub use runtime::{DockerLauncher, LaunchOutcome, LaunchSpec, Launcher};
pub use service::SandboxService;
pub use types::{ExecutionRequest, ExecutionResult, FileUpload};
pub use workspace::Workspace;
