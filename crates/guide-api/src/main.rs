//! Binary entrypoint for the guide API server.
use anyhow::Context;
use guide_api::{run, AppState};
use guide_core::EngineConfig;
use guide_engine::GuideEngine;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // GUIDE_CONFIG points at a YAML file; defaults apply without one
    let mut config = match std::env::var("GUIDE_CONFIG") {
        Ok(path) => EngineConfig::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => EngineConfig::default(),
    };
    config.apply_env();

    let engine = GuideEngine::from_config(config).context("building guide engine")?;
    let state = AppState::new(Arc::new(engine))?;

    let addr = std::env::var("GUIDE_ADDR").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
    run(&addr, state).await.with_context(|| format!("serving on {}", addr))?;
    Ok(())
}
