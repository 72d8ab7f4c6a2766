mod cli;
mod http;
mod pipeline_stub;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;
use worker_core::{ensure_identity, ControlClient, GenerationPipeline, NullGpuMonitor, WorkerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = cli::Cli::parse();
    let identity = ensure_identity(cli.id.clone(), cli.name.clone())?;
    let worker_id = identity.id.expect("ensure_identity always sets an id");
    let worker_name = identity.name.unwrap_or_else(|| "gpu-worker".to_string());
    tracing::info!(worker_id = %worker_id, worker_name = %worker_name, "worker identity resolved");

    let state = Arc::new(WorkerState::new(
        worker_id,
        worker_name,
        Some(cli.api_port),
        vec!["sdxl".to_string(), "sd1.5".to_string()],
        Arc::new(NullGpuMonitor),
    ));
    let pipeline: Arc<dyn GenerationPipeline> = Arc::new(pipeline_stub::StubPipeline::new());

    let http_state = http::HttpState::new(state.clone(), pipeline.clone());
    let app = http::router(http_state);
    let listener = tokio::net::TcpListener::bind(cli.listen_addr).await?;
    tracing::info!(addr = %cli.listen_addr, "fabric-worker http surface listening");
    let serve = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("http server failed");
    });

    let shutdown = Arc::new(Notify::new());
    let control_handle = if let Some(master_url) = cli.master_url {
        let ws_url = format!("{}/ws/worker", master_url.replacen("http", "ws", 1));
        let client = Arc::new(ControlClient::new(ws_url, cli.heartbeat_period, state.clone(), pipeline.clone()));
        Some(tokio::spawn(client.run(shutdown.clone())))
    } else {
        tracing::info!("no master_url configured, running standalone");
        None
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    shutdown.notify_one();
    serve.abort();
    if let Some(handle) = control_handle {
        let _ = handle.await;
    }

    Ok(())
}
