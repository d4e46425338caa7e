//! CLI command implementations

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cellbox_sandbox::{ExecutionRequest, FileUpload, SandboxConfig, SandboxService};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Arguments of `cellbox run`
pub struct RunOptions {
    pub source: PathBuf,
    pub runtime: String,
    pub mem: String,
    pub cpu: String,
    pub files: Vec<PathBuf>,
    pub images_dir: Option<PathBuf>,
}

/// Execute a source file through the sandbox pipeline and print the narrative
pub async fn execute_run(options: RunOptions) -> Result<()> {
    let request = build_request(&options).await?;
    let service = SandboxService::with_docker(SandboxConfig::from_env());

    info!(source = %options.source.display(), "Running cell");
    let result = service.execute(request).await?;

    println!("{}", result.output);

    if let Some(dir) = &options.images_dir {
        let written = write_images(dir, &result.images).await?;
        println!("\n{} figure(s) written to {}", written, dir.display());
    } else if !result.images.is_empty() {
        println!(
            "\n{} figure(s) captured (use --images-dir to save them)",
            result.images.len()
        );
    }

    Ok(())
}

/// Report whether docker is reachable
pub async fn execute_check() -> Result<()> {
    let service = SandboxService::with_docker(SandboxConfig::from_env());
    if service.preflight().await {
        println!("{}: reachable", service.launcher_name());
        Ok(())
    } else {
        bail!("{}: not reachable", service.launcher_name())
    }
}

async fn build_request(options: &RunOptions) -> Result<ExecutionRequest> {
    let code = tokio::fs::read_to_string(&options.source)
        .await
        .with_context(|| format!("Failed to read {}", options.source.display()))?;

    let mut request = ExecutionRequest::new(code)
        .with_runtime(options.runtime.clone())
        .with_resources(options.mem.clone(), options.cpu.clone());

    for path in &options.files {
        request = request.with_file(encode_upload(path).await?);
    }
    Ok(request)
}

/// Read a local file into an upload named after its file name
async fn encode_upload(path: &Path) -> Result<FileUpload> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid file name: {}", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    debug!(file = name, bytes = bytes.len(), "Attaching file");

    Ok(FileUpload::new(
        name,
        format!(
            "data:application/octet-stream;base64,{}",
            STANDARD.encode(bytes)
        ),
    ))
}

/// Decode `data:image/png;base64,...` payloads into `figure_<n>.png` files
async fn write_images(dir: &Path, images: &[String]) -> Result<usize> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    for (index, image) in images.iter().enumerate() {
        let (_, body) = image
            .split_once(',')
            .ok_or_else(|| anyhow!("Malformed image payload"))?;
        let bytes = STANDARD.decode(body).context("Malformed image payload")?;
        let target = dir.join(format!("figure_{}.png", index + 1));
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
    }
    Ok(images.len())
}
