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
#[command(name = "fabric-pool", version, about = "GPU worker pool registry and distributor")]
pub struct Cli {
    /// Address to bind the HTTP/WS control surface on.
    #[arg(long, env = "POOL_LISTEN_ADDR", default_value = "0.0.0.0:8090")]
    pub listen_addr: SocketAddr,

    /// Interval between worker status probes / the stale-heartbeat window unit.
    #[arg(
        long,
        env = "POOL_HEARTBEAT_PERIOD",
        default_value = "30",
        value_parser = parse_seconds,
    )]
    pub heartbeat_period: Duration,
}
