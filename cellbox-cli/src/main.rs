mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cellbox")]
#[command(about = "Run Python cells in an isolated docker sandbox")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a Python source file in a fresh sandbox
    Run {
        /// Source file to execute
        source: PathBuf,

        /// Logical runtime (python, base, ml)
        #[arg(short, long, default_value = "")]
        runtime: String,

        /// Memory tier (256m, 512m, 1g, 2g)
        #[arg(long, default_value = "")]
        mem: String,

        /// CPU share (0.25, 0.5, 1.0, 2.0)
        #[arg(long, default_value = "")]
        cpu: String,

        /// Extra file to place next to the code (repeatable)
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Directory to write captured figures into
        #[arg(short, long)]
        images_dir: Option<PathBuf>,
    },
    /// Check whether the docker backend is reachable
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            source,
            runtime,
            mem,
            cpu,
            files,
            images_dir,
        } => {
            let options = commands::RunOptions {
                source,
                runtime,
                mem,
                cpu,
                files,
                images_dir,
            };
            commands::execute_run(options).await
        }
        Commands::Check => commands::execute_check().await,
    }
}
