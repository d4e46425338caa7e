//! Ephemeral per-request workspace
//!
//! A workspace owns every file one request writes: uploads, the entry module,
//! the runner script and whatever the sandbox saves. It is removed when the
//! value is released or dropped, so unwinding and early returns clean up too.

use crate::quota::split_data_uri;
use crate::runner::{runner_script, RunnerKind, ARTIFACT_DIR, ENTRY_MODULE, RUNNER_SCRIPT};
use crate::types::FileUpload;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "code-";

/// Exclusively owned scratch directory for one request
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a uniquely named directory under `root` (system temp dir when `None`)
    pub fn acquire(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        tracing::debug!(path = %dir.path().display(), "Workspace acquired");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the capturing runner saves figures
    pub fn artifact_dir(&self) -> PathBuf {
        self.path().join(ARTIFACT_DIR)
    }

    /// Decode and write every upload, returning how many landed on disk.
    ///
    /// Uploads that are malformed, undecodable, escape the workspace or fail
    /// to write are skipped; a partial set of files is not an error.
    pub async fn write_uploads(&self, files: &[FileUpload]) -> usize {
        let mut written = 0;

        for file in files {
            let Some(relative) = confined_path(&file.name) else {
                tracing::warn!(file = %file.name, "Skipping upload with unsafe path");
                continue;
            };
            let Some((_, body)) = split_data_uri(&file.data) else {
                tracing::warn!(file = %file.name, "Skipping upload without data URI separator");
                continue;
            };
            let decoded = match STANDARD.decode(body) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "Skipping undecodable upload");
                    continue;
                }
            };

            let target = self.path().join(relative);
            if let Some(parent) = target.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    tracing::warn!(file = %file.name, error = %e, "Cannot create upload directory");
                    continue;
                }
            }
            match tokio::fs::write(&target, &decoded).await {
                Ok(()) => {
                    tracing::debug!(file = %file.name, bytes = decoded.len(), "Upload written");
                    written += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "Cannot write upload");
                }
            }
        }

        written
    }

    /// Write the user's source verbatim as the entry module
    pub async fn write_entry(&self, code: &str) -> io::Result<()> {
        tokio::fs::write(self.path().join(ENTRY_MODULE), code).await
    }

    /// Write the entry script for the selected runner
    pub async fn write_runner(&self, kind: RunnerKind) -> io::Result<()> {
        tokio::fs::write(self.path().join(RUNNER_SCRIPT), runner_script(kind)).await
    }

    /// Remove the directory and everything in it
    pub fn release(self) {
        let path = self.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "Workspace released"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove workspace")
            }
        }
    }
}

/// Normalise an upload name into a path that stays inside the workspace
fn confined_path(name: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}
