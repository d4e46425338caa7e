//! Common test utilities shared across integration and E2E tests

pub mod fake_launcher;

pub use fake_launcher::*;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cellbox_sandbox::{FileUpload, SandboxConfig};
use std::path::Path;

/// Setup logging for tests
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Sandbox configuration whose workspaces are created under `root`
pub fn config_in(root: &Path) -> SandboxConfig {
    SandboxConfig {
        workspace_root: Some(root.to_path_buf()),
        ..Default::default()
    }
}

/// Upload carrying `bytes` as a base64 data URI
pub fn upload(name: &str, bytes: &[u8]) -> FileUpload {
    FileUpload::new(
        name,
        format!(
            "data:application/octet-stream;base64,{}",
            STANDARD.encode(bytes)
        ),
    )
}

/// Number of entries left directly under `root`
pub fn leftover_entries(root: &Path) -> usize {
    std::fs::read_dir(root).map(|dir| dir.count()).unwrap_or(0)
}

/// Decode a `data:image/png;base64,...` payload
pub fn decode_image(image: &str) -> Vec<u8> {
    let body = image
        .strip_prefix("data:image/png;base64,")
        .expect("not a PNG data URI");
    STANDARD.decode(body).expect("invalid base64 image body")
}
