//! Cellbox Server
//!
//! HTTP front end for the sandbox: accepts notebook cells on `POST /execute`
//! and returns their output and figures.

mod error;
mod routes;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use cellbox_sandbox::{SandboxConfig, SandboxService};
use std::env;
use std::sync::Arc;
use tracing::info;

const DEFAULT_BODY_LIMIT: usize = 128 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SandboxService>,
}

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Largest accepted request body, base64 uploads included
    pub body_limit: usize,
    pub sandbox: SandboxConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server_host: env::var("CELLBOX_SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("CELLBOX_SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid CELLBOX_SERVER_PORT")?,
            body_limit: match env::var("CELLBOX_BODY_LIMIT") {
                Ok(raw) => raw.parse().context("Invalid CELLBOX_BODY_LIMIT")?,
                Err(_) => DEFAULT_BODY_LIMIT,
            },
            sandbox: SandboxConfig::from_env(),
        })
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Cellbox Server...");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        total_upload_limit = config.sandbox.quota.total_limit,
        single_file_limit = config.sandbox.quota.single_file_limit,
        default_image = %config.sandbox.policy.default_image,
        max_memory = %config.sandbox.policy.ceiling.memory,
        max_cpus = %config.sandbox.policy.ceiling.cpu,
        timeout = ?config.sandbox.timeout,
        max_concurrent_runs = config.sandbox.max_concurrent_runs,
        "Configuration loaded"
    );

    let service = SandboxService::with_docker(config.sandbox.clone());
    if !service.preflight().await {
        tracing::warn!("Docker is not reachable yet; /execute will fail until it is");
    }

    let app_state = AppState {
        service: Arc::new(service),
    };

    let bind_addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on {}", bind_addr);

    let body_limit = config.body_limit;
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::PayloadConfig::new(body_limit))
            .wrap(middleware::Logger::default())
            .service(routes::execute::execute_code)
            .service(routes::health::health_check)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Cannot bind {bind_addr}"))?
    .run()
    .await?;

    Ok(())
}
