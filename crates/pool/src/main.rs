mod cli;
mod http;

use std::sync::Arc;

use clap::Parser;
use pool_core::{PoolConfig, PoolEngine};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = cli::Cli::parse();

    let engine = Arc::new(PoolEngine::new(PoolConfig {
        heartbeat_period: cli.heartbeat_period,
    }));
    let shutdown = engine.shutdown_handle();

    let run_handle = tokio::spawn(engine.clone().run());

    let app = http::router(engine.clone());
    let listener = tokio::net::TcpListener::bind(cli.listen_addr).await?;
    tracing::info!(addr = %cli.listen_addr, "fabric-pool listening");

    let serve = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await
            .expect("http server failed");
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    shutdown.notify_one();
    serve.abort();
    let _ = run_handle.await;

    Ok(())
}
