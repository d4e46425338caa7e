//! Operator configuration
//!
//! Read once at startup and shared immutably; nothing in the request path
//! looks at the environment.

use crate::limits::{CpuShare, MemoryTier, ResourceEnvelope};
use crate::policy::SandboxPolicy;
use crate::quota::UploadQuota;
use std::path::PathBuf;
use std::time::Duration;

/// Immutable settings for the whole sandbox service
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxConfig {
    /// Upload ceilings (`TOTAL_UPLOAD_LIMIT`, `SINGLE_FILE_LIMIT`)
    pub quota: UploadQuota,

    /// Runtime and resource policy (`PY_IMAGE`, `DEFAULT_MEM`, `MAX_MEM`, `DEFAULT_CPU`, `MAX_CPU`)
    pub policy: SandboxPolicy,

    /// Deadline per sandbox run (`SANDBOX_TIMEOUT_SECS`, 0 = none)
    pub timeout: Option<Duration>,

    /// Concurrent sandbox runs (`MAX_CONCURRENT_RUNS`, 0 = unbounded)
    pub max_concurrent_runs: usize,

    /// Process/thread cap inside each container (`SANDBOX_PIDS_LIMIT`)
    pub pids_limit: u32,

    /// Docker CLI binary (`DOCKER_BIN`)
    pub docker_bin: String,

    /// Parent directory for workspaces (`WORKSPACE_ROOT`, system temp dir when unset)
    pub workspace_root: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            quota: UploadQuota::default(),
            policy: SandboxPolicy::default(),
            timeout: None,
            max_concurrent_runs: 0,
            pids_limit: 50,
            docker_bin: "docker".to_string(),
            workspace_root: None,
        }
    }
}

impl SandboxConfig {
    /// Build from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset, empty or invalid values keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let quota = UploadQuota {
            total_limit: read_count(&get, "TOTAL_UPLOAD_LIMIT", defaults.quota.total_limit),
            single_file_limit: read_count(
                &get,
                "SINGLE_FILE_LIMIT",
                defaults.quota.single_file_limit,
            ),
        };

        let default_envelope = ResourceEnvelope {
            memory: read_memory(&get, "DEFAULT_MEM", defaults.policy.default_envelope.memory),
            cpu: read_cpu(&get, "DEFAULT_CPU", defaults.policy.default_envelope.cpu),
        };
        let ceiling = ResourceEnvelope {
            memory: read_memory(&get, "MAX_MEM", defaults.policy.ceiling.memory),
            cpu: read_cpu(&get, "MAX_CPU", defaults.policy.ceiling.cpu),
        };
        let policy = SandboxPolicy {
            default_image: get("PY_IMAGE").unwrap_or(defaults.policy.default_image),
            default_envelope,
            ceiling,
        };

        let timeout_secs = read_count(&get, "SANDBOX_TIMEOUT_SECS", 0);

        Self {
            quota,
            policy,
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs as u64)),
            max_concurrent_runs: read_count(&get, "MAX_CONCURRENT_RUNS", defaults.max_concurrent_runs),
            pids_limit: read_count(&get, "SANDBOX_PIDS_LIMIT", defaults.pids_limit as usize)
                .try_into()
                .unwrap_or(defaults.pids_limit),
            docker_bin: get("DOCKER_BIN").unwrap_or(defaults.docker_bin),
            workspace_root: get("WORKSPACE_ROOT").map(PathBuf::from),
        }
    }
}

fn read_count(get: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    match get(key) {
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, default, "Invalid count, using default");
                default
            }
        },
        None => default,
    }
}

fn read_memory(get: &impl Fn(&str) -> Option<String>, key: &str, default: MemoryTier) -> MemoryTier {
    match get(key) {
        Some(raw) => MemoryTier::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(key, value = %raw, %default, "Memory value not in allow-list, using default");
            default
        }),
        None => default,
    }
}

fn read_cpu(get: &impl Fn(&str) -> Option<String>, key: &str, default: CpuShare) -> CpuShare {
    match get(key) {
        Some(raw) => CpuShare::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(key, value = %raw, %default, "CPU value not in allow-list, using default");
            default
        }),
        None => default,
    }
}
