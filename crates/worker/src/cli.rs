use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

fn parse_seconds(input: &str) -> Result<Duration, String> {
    input
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| format!("invalid seconds value: {input:?}"))
}

#[derive(Debug, Clone, Parser)]
#[command(name = "fabric-worker", version, about = "GPU worker control-channel client")]
pub struct Cli {
    /// Stable identity for this worker. If unset, the identity persisted
    /// at the last run is reused, or a new one is generated and saved.
    #[arg(long, env = "WORKER_ID")]
    pub id: Option<String>,

    /// Human-readable worker name. If unset, the persisted name is kept.
    #[arg(long, env = "WORKER_NAME")]
    pub name: Option<String>,

    /// Base URL of the pool master, e.g. `http://pool.internal:8090`.
    /// If unset the worker runs standalone (HTTP surface only, no control channel).
    #[arg(long, env = "WORKER_MASTER_URL")]
    pub master_url: Option<String>,

    /// Port the worker's own HTTP surface listens on, and the port it
    /// advertises to the pool at registration time.
    #[arg(long, env = "WORKER_API_PORT", default_value = "9000")]
    pub api_port: u16,

    #[arg(long, env = "WORKER_LISTEN_ADDR", default_value = "0.0.0.0:9000")]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = "WORKER_HEARTBEAT_PERIOD",
        default_value = "30",
        value_parser = parse_seconds,
    )]
    pub heartbeat_period: Duration,
}
