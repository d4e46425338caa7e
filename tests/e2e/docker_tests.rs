//! Full runs against a real docker daemon and the sandbox images.
//!
//! Run with `cargo test -p cellbox-tests --test docker_e2e -- --ignored`.

use cellbox_sandbox::{ExecuteError, ExecutionRequest, SandboxConfig, SandboxService};
use cellbox_tests::*;
use std::time::Duration;
use tempfile::tempdir;

async fn docker_service(config: SandboxConfig) -> SandboxService {
    let service = SandboxService::with_docker(config);
    assert!(service.preflight().await, "docker daemon is not reachable");
    service
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn test_print_hi_in_container() {
    setup_test_logging();
    let root = tempdir().unwrap();
    let service = docker_service(config_in(root.path())).await;

    let result = service
        .execute(ExecutionRequest::new("print(\"hi\")"))
        .await
        .unwrap();

    assert!(result.output.starts_with("hi\n"), "{}", result.output);
    assert!(result.output.contains("Cell ran successfully."));
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
#[ignore = "requires a docker daemon and the py-sandbox:ml image"]
async fn test_ml_plot_is_captured() {
    setup_test_logging();
    let root = tempdir().unwrap();
    let service = docker_service(config_in(root.path())).await;

    let code = "import matplotlib.pyplot as plt\nplt.plot([1, 2, 3])\nplt.show()\n";
    let result = service
        .execute(ExecutionRequest::new(code).with_runtime("ml"))
        .await
        .unwrap();

    assert!(result.output.contains("Cell ran successfully."), "{}", result.output);
    assert_eq!(result.images.len(), 1);
    assert!(decode_image(&result.images[0]).starts_with(b"\x89PNG"));
}

#[tokio::test]
#[ignore = "requires a docker daemon and the py-sandbox:ml image"]
async fn test_open_figure_saved_without_show() {
    let root = tempdir().unwrap();
    let service = docker_service(config_in(root.path())).await;

    let code = "import matplotlib.pyplot as plt\nplt.plot([1, 2, 3])\n";
    let result = service
        .execute(ExecutionRequest::new(code).with_runtime("ml"))
        .await
        .unwrap();

    assert!(result.output.contains("Cell ran successfully."), "{}", result.output);
    assert_eq!(result.images.len(), 1);
    assert!(decode_image(&result.images[0]).starts_with(b"\x89PNG"));
}

#[tokio::test]
#[ignore = "requires a docker daemon and the py-sandbox:ml image"]
async fn test_repeated_show_keeps_every_figure() {
    let root = tempdir().unwrap();
    let service = docker_service(config_in(root.path())).await;

    let code = "import matplotlib.pyplot as plt\n\
                plt.plot([1, 2, 3])\n\
                plt.show()\n\
                plt.figure()\n\
                plt.bar([1, 2], [3, 4])\n\
                plt.show()\n";
    let result = service
        .execute(ExecutionRequest::new(code).with_runtime("ml"))
        .await
        .unwrap();

    assert!(result.output.contains("Cell ran successfully."), "{}", result.output);
    assert_eq!(result.images.len(), 2);
    assert_ne!(decode_image(&result.images[0]), decode_image(&result.images[1]));
}

#[tokio::test]
#[ignore = "requires a docker daemon and the py-sandbox:ml image"]
async fn test_figure_kept_when_cell_raises() {
    let root = tempdir().unwrap();
    let service = docker_service(config_in(root.path())).await;

    let code = "import matplotlib.pyplot as plt\nplt.plot([1, 2, 3])\nraise ValueError('boom')\n";
    let result = service
        .execute(ExecutionRequest::new(code).with_runtime("ml"))
        .await
        .unwrap();

    assert!(result.output.starts_with("Code execution failed."), "{}", result.output);
    assert!(result.output.contains("ValueError: boom"));
    assert_eq!(result.images.len(), 1);
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn test_network_is_disabled() {
    let root = tempdir().unwrap();
    let service = docker_service(config_in(root.path())).await;

    let code = "import socket\nsocket.create_connection(('1.1.1.1', 53), timeout=2)\n";
    let result = service.execute(ExecutionRequest::new(code)).await.unwrap();

    assert!(result.output.starts_with("Code execution failed."), "{}", result.output);
    assert!(result.output.contains("OSError") || result.output.contains("unreachable"));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn test_runaway_cell_is_torn_down() {
    let root = tempdir().unwrap();
    let mut config = config_in(root.path());
    config.timeout = Some(Duration::from_secs(3));
    let service = docker_service(config).await;

    let result = service
        .execute(ExecutionRequest::new("while True:\n    pass\n"))
        .await
        .unwrap();

    assert!(result.output.starts_with("Code execution timed out."), "{}", result.output);
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn test_uploaded_file_is_readable() {
    let root = tempdir().unwrap();
    let service = docker_service(config_in(root.path())).await;

    let request = ExecutionRequest::new("print(open('data/input.txt').read().upper())")
        .with_file(upload("data/input.txt", b"hello sandbox"));
    let result = service.execute(request).await.unwrap();

    assert!(result.output.starts_with("HELLO SANDBOX"), "{}", result.output);
}

#[tokio::test]
async fn test_missing_docker_binary_is_unavailable() {
    let root = tempdir().unwrap();
    let mut config = config_in(root.path());
    config.docker_bin = "/nonexistent/docker".to_string();
    let service = SandboxService::with_docker(config);

    let err = service
        .execute(ExecutionRequest::new("print(1)"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExecuteError::DockerUnavailable));
    assert_eq!(leftover_entries(root.path()), 0);
}
