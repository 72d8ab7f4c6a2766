use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

fn parse_seconds(input: &str) -> Result<Duration, String> {
    input
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| format!("invalid seconds value: {input:?}"))
}

fn parse_millis(input: &str) -> Result<Duration, String> {
    input
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| format!("invalid milliseconds value: {input:?}"))
}

#[derive(Debug, Clone, Parser)]
#[command(name = "fabric-manager", version, about = "Manager-tier process supervisor")]
pub struct Cli {
    #[arg(long, env = "MANAGER_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: SocketAddr,

    /// Worker slots to allocate across platforms. Defaults to the host's
    /// available parallelism.
    #[arg(long, env = "MANAGER_NUM_CORES")]
    pub num_cores: Option<usize>,

    #[arg(long, env = "MANAGER_TASK_TIMEOUT", default_value = "60", value_parser = parse_seconds)]
    pub task_timeout: Duration,

    #[arg(long, env = "MANAGER_HEALTH_CHECK_INTERVAL", default_value = "30", value_parser = parse_seconds)]
    pub health_check_interval: Duration,

    #[arg(long, env = "MANAGER_QUEUE_POLL_INTERVAL_MS", default_value = "100", value_parser = parse_millis)]
    pub queue_poll_interval: Duration,

    #[arg(long, env = "MANAGER_MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,

    #[arg(long, env = "MANAGER_RETRY_DELAY_BASE", default_value = "2", value_parser = parse_seconds)]
    pub retry_delay_base: Duration,

    #[arg(long, env = "MANAGER_MAILBOX_CAPACITY", default_value = "256")]
    pub mailbox_capacity: usize,

    /// Redis connection URL. Falls back to an in-memory queue (useful for
    /// local runs and tests) when unset.
    #[arg(long, env = "MANAGER_REDIS_URL")]
    pub redis_url: Option<String>,
}
