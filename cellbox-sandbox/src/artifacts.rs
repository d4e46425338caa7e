//! Collects figures the sandbox left behind

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSION: &str = ".png";
const IMAGE_DATA_PREFIX: &str = "data:image/png;base64,";

/// Read every `.png` in `dir` and encode it as a data URI.
///
/// A missing or unreadable directory yields no images; files that fail to
/// read are skipped. Images come back in figure order (`plot_<n>.png` by `n`),
/// with any other names after them in lexical order.
pub async fn collect_images(dir: &Path) -> Vec<String> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut found: Vec<(String, PathBuf)> = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Artifact listing interrupted");
                break;
            }
        };
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.to_ascii_lowercase().ends_with(IMAGE_EXTENSION) {
            found.push((name, entry.path()));
        }
    }

    found.sort_by(|(a, _), (b, _)| figure_key(a).cmp(&figure_key(b)));

    let mut images = Vec::with_capacity(found.len());
    for (name, path) in found {
        match tokio::fs::read(&path).await {
            Ok(bytes) => images.push(format!("{IMAGE_DATA_PREFIX}{}", STANDARD.encode(bytes))),
            Err(e) => tracing::warn!(file = %name, error = %e, "Skipping unreadable artifact"),
        }
    }

    tracing::debug!(count = images.len(), "Artifacts collected");
    images
}

/// Numbered figures first by number, then everything else by name
fn figure_key(name: &str) -> (bool, u64, &str) {
    match figure_number(name) {
        Some(n) => (false, n, name),
        None => (true, 0, name),
    }
}

fn figure_number(name: &str) -> Option<u64> {
    let stem = name.get(..name.len().checked_sub(IMAGE_EXTENSION.len())?)?;
    stem.strip_prefix("plot_")?.parse().ok()
}
