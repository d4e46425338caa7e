//! Scriptable launcher that stands in for docker

use async_trait::async_trait;
use cellbox_sandbox::{LaunchOutcome, LaunchSpec, Launcher, ARTIFACT_DIR, RUNNER_SCRIPT};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Behavior = Arc<dyn Fn(&LaunchSpec) -> LaunchOutcome + Send + Sync>;

/// What the launcher saw when a run was started
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub spec: LaunchSpec,
    /// Sorted names of the entries in the workspace at launch time
    pub files: Vec<String>,
    pub runner: String,
}

#[derive(Default)]
struct LaunchLog {
    records: Mutex<Vec<LaunchRecord>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a LaunchLog);

impl<'a> InFlight<'a> {
    fn enter(log: &'a LaunchLog) -> Self {
        let now = log.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        log.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(log)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Launcher whose outcome is decided by a closure.
///
/// Clones share the launch log, so a test can hand one clone to the
/// service and inspect the other.
#[derive(Clone)]
pub struct FakeLauncher {
    reachable: bool,
    delay: Option<Duration>,
    behavior: Behavior,
    log: Arc<LaunchLog>,
}

impl FakeLauncher {
    pub fn new(behavior: impl Fn(&LaunchSpec) -> LaunchOutcome + Send + Sync + 'static) -> Self {
        Self {
            reachable: true,
            delay: None,
            behavior: Arc::new(behavior),
            log: Arc::default(),
        }
    }

    /// Exits 0 after printing `output`
    pub fn succeeding(output: &str) -> Self {
        Self::exiting(0, output)
    }

    pub fn exiting(code: i32, output: &str) -> Self {
        let output = output.as_bytes().to_vec();
        Self::new(move |_| LaunchOutcome::Exited {
            code: Some(code),
            output: output.clone(),
        })
    }

    /// Backend that fails its reachability probe
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::succeeding("")
        }
    }

    /// Hold every launch open for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.log.records.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.log.records.lock().unwrap().len()
    }

    /// Highest number of launches that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.log.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, spec: &LaunchSpec) {
        let mut files: Vec<String> = std::fs::read_dir(&spec.workspace)
            .map(|dir| {
                dir.filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        let runner =
            std::fs::read_to_string(spec.workspace.join(RUNNER_SCRIPT)).unwrap_or_default();

        self.log.records.lock().unwrap().push(LaunchRecord {
            spec: spec.clone(),
            files,
            runner,
        });
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn preflight(&self) -> bool {
        self.reachable
    }

    async fn launch(&self, spec: LaunchSpec) -> LaunchOutcome {
        let _guard = InFlight::enter(&self.log);
        self.record(&spec);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.behavior)(&spec)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Write `count` figures the way the capture runner names them
pub fn write_figures(spec: &LaunchSpec, count: usize) -> Vec<PathBuf> {
    let dir = spec.workspace.join(ARTIFACT_DIR);
    std::fs::create_dir_all(&dir).unwrap();
    (1..=count)
        .map(|n| {
            let path = dir.join(format!("plot_{n}.png"));
            std::fs::write(&path, format!("figure {n}")).unwrap();
            path
        })
        .collect()
}
