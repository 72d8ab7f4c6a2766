use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::info;

use crate::distributor::Distributor;
use crate::hub::ControlHub;
use crate::registry::Registry;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub heartbeat_period: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            heartbeat_period: Duration::from_secs(30),
        }
    }
}

/// Ties the registry (heartbeat/probing) and distributor (dispatch loop)
/// together behind a single run loop, mirroring the teacher's
/// ticker/select!-driven engine loop.
pub struct PoolEngine {
    pub registry: Arc<Registry>,
    pub distributor: Arc<Distributor>,
    pub hub: Arc<ControlHub>,
    config: PoolConfig,
    shutdown: Arc<Notify>,
}

impl PoolEngine {
    pub fn new(config: PoolConfig) -> Self {
        let registry = Arc::new(Registry::new(chrono::Duration::from_std(config.heartbeat_period).unwrap()));
        let hub = Arc::new(ControlHub::new());
        let distributor = Arc::new(Distributor::new(registry.clone(), hub.clone()));
        Self {
            registry,
            distributor,
            hub,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Runs until `shutdown_handle().notify_one()` is called. Drives two
    /// cooperative loops on one task set: the heartbeat prober and the
    /// distribution loop.
    pub async fn run(self: Arc<Self>) {
        let heartbeat = {
            let this = self.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(this.config.heartbeat_period);
                loop {
                    ticker.tick().await;
                    this.registry.probe_all().await;
                }
            })
        };

        let distribute = {
            let this = self.clone();
            tokio::spawn(async move {
                loop {
                    this.distributor.dispatch_next().await;
                }
            })
        };

        self.shutdown.notified().await;
        heartbeat.abort();
        distribute.abort();
        info!("pool engine stopped");
    }
}
