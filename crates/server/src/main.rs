mod api;
mod cli;
mod request;
mod router;
mod state;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use scaleout_core::Config;
use scaleout_pipeline::PipelineOrchestrator;
use scaleout_storage::{ObjectStorage, StorageEngine};

use crate::cli::{CliArgs, Command};
use crate::state::AppState;

fn load_config() -> Config {
    scaleout_core::config::load_dotenv();
    Config::from_env()
}

fn build_storage(config: &Config) -> anyhow::Result<Arc<dyn ObjectStorage>> {
    let storage = StorageEngine::from_config(config).context("failed to initialise storage")?;
    Ok(Arc::new(storage))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let storage = build_storage(&config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState {
        config: Arc::new(config),
        storage,
    });
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_once(config: Config, path: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let body: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))?;
    let request = request::parse_job_request(&body, &config.compute.default_scales)?;

    let storage = build_storage(&config)?;
    let orchestrator =
        PipelineOrchestrator::new(storage, config.compute.clone(), &config.storage.temp_dir);
    let result = orchestrator.execute(request).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config();
    config.log_summary();

    match args.command {
        Command::Serve => serve(config).await,
        Command::Run { request } => run_once(config, &request).await,
    }
}
