//! Admission control and workspace isolation under parallel load

use cellbox_sandbox::{ExecutionRequest, LaunchOutcome, SandboxService, ENTRY_MODULE};
use cellbox_tests::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

async fn run_parallel(service: Arc<SandboxService>, count: usize) -> Vec<String> {
    let handles: Vec<_> = (0..count)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .execute(ExecutionRequest::new(format!("print({i})")))
                    .await
            })
        })
        .collect();

    let mut outputs = Vec::with_capacity(count);
    for handle in handles {
        outputs.push(handle.await.unwrap().unwrap().output);
    }
    outputs
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_are_capped() {
    setup_test_logging();
    let root = tempdir().unwrap();
    let mut config = config_in(root.path());
    config.max_concurrent_runs = 2;
    let launcher = FakeLauncher::succeeding("done\n").with_delay(Duration::from_millis(50));
    let service = Arc::new(SandboxService::new(config, launcher.clone()));

    let outputs = run_parallel(service, 6).await;

    assert_eq!(outputs.len(), 6);
    assert!(outputs.iter().all(|o| o.contains("Cell ran successfully.")));
    assert_eq!(launcher.launch_count(), 6);
    assert!(launcher.max_in_flight() <= 2);
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unbounded_when_cap_disabled() {
    let root = tempdir().unwrap();
    let mut config = config_in(root.path());
    config.max_concurrent_runs = 0;
    let launcher = FakeLauncher::succeeding("").with_delay(Duration::from_millis(200));
    let service = Arc::new(SandboxService::new(config, launcher.clone()));

    run_parallel(service, 4).await;

    assert_eq!(launcher.launch_count(), 4);
    assert!(launcher.max_in_flight() > 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_runs_get_private_workspaces() {
    let root = tempdir().unwrap();
    let launcher = FakeLauncher::new(|spec| LaunchOutcome::Exited {
        code: Some(0),
        output: std::fs::read(spec.workspace.join(ENTRY_MODULE)).unwrap(),
    })
    .with_delay(Duration::from_millis(20));
    let service = Arc::new(SandboxService::new(config_in(root.path()), launcher.clone()));

    let outputs = run_parallel(service, 8).await;

    // each run sees only its own code
    for (i, output) in outputs.iter().enumerate() {
        assert!(output.starts_with(&format!("print({i})")));
    }

    let launches = launcher.launches();
    let workspaces: HashSet<_> = launches.iter().map(|r| r.spec.workspace.clone()).collect();
    let ids: HashSet<_> = launches.iter().map(|r| r.spec.execution_id).collect();
    assert_eq!(workspaces.len(), 8);
    assert_eq!(ids.len(), 8);
    assert!(workspaces.iter().all(|w| w.starts_with(root.path())));
    assert_eq!(leftover_entries(root.path()), 0);
}

fn reported_seconds(output: &str) -> f64 {
    let rest = output
        .split("Duration: ")
        .nth(1)
        .expect("output has no duration");
    rest.split(" seconds").next().unwrap().parse().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duration_excludes_queue_wait() {
    let root = tempdir().unwrap();
    let mut config = config_in(root.path());
    config.max_concurrent_runs = 1;
    let launcher = FakeLauncher::succeeding("").with_delay(Duration::from_millis(400));
    let service = Arc::new(SandboxService::new(config, launcher.clone()));

    let outputs = run_parallel(service, 2).await;

    // the second run queued behind the first for ~0.4s
    assert_eq!(launcher.max_in_flight(), 1);
    for output in &outputs {
        let seconds = reported_seconds(output);
        assert!((0.35..0.75).contains(&seconds), "{output}");
    }
}
