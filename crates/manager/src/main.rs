mod cli;
mod http;

use std::sync::Arc;

use clap::Parser;
use fabric_queue::{MemoryQueue, PersistentQueue, RedisQueue};
use manager_core::{AdapterRegistry, Supervisor, SupervisorConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = cli::Cli::parse();

    let queue: Arc<dyn PersistentQueue> = match &cli.redis_url {
        Some(url) => {
            tracing::info!("connecting to redis queue backend");
            Arc::new(RedisQueue::connect(url).await?)
        }
        None => {
            tracing::info!("no redis url configured, using in-memory queue backend");
            Arc::new(MemoryQueue::new())
        }
    };

    let defaults = SupervisorConfig::default();
    let config = SupervisorConfig {
        num_cores: cli.num_cores.unwrap_or(defaults.num_cores),
        task_timeout: cli.task_timeout,
        health_check_interval: cli.health_check_interval,
        queue_poll_interval: cli.queue_poll_interval,
        max_retries: cli.max_retries,
        retry_delay_base: cli.retry_delay_base,
        mailbox_capacity: cli.mailbox_capacity,
    };

    let adapters = Arc::new(AdapterRegistry::new());
    let supervisor = Supervisor::new(config, queue, adapters);

    tokio::spawn(supervisor.clone().run_ingestion());
    tokio::spawn(supervisor.clone().run_redrive());
    tokio::spawn(supervisor.clone().run_health_check());
    tokio::spawn(supervisor.clone().run_stats());

    let app = http::router(supervisor.clone());
    let listener = tokio::net::TcpListener::bind(cli.listen_addr).await?;
    tracing::info!(addr = %cli.listen_addr, "fabric-manager http surface listening");
    let serve = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("http server failed");
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    serve.abort();
    supervisor.stop().await;

    Ok(())
}
