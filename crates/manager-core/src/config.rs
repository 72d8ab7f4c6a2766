use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub num_cores: usize,
    pub task_timeout: Duration,
    pub health_check_interval: Duration,
    pub queue_poll_interval: Duration,
    pub max_retries: u32,
    pub retry_delay_base: Duration,
    pub mailbox_capacity: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            num_cores: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            task_timeout: Duration::from_secs(60),
            health_check_interval: Duration::from_secs(30),
            queue_poll_interval: Duration::from_millis(100),
            max_retries: 3,
            retry_delay_base: Duration::from_secs(2),
            mailbox_capacity: 256,
        }
    }
}
