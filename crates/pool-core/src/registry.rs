use std::collections::HashMap;

use chrono::Utc;
use pool_types::{PoolStats, WorkerNode, WorkerStatus};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::client::WorkerClient;
use crate::errors::PoolError;

/// Registry of known worker nodes, with a background status prober that
/// doubles as the effective heartbeat mechanism.
pub struct Registry {
    workers: RwLock<HashMap<String, WorkerNode>>,
    client: WorkerClient,
    heartbeat_period: chrono::Duration,
}

impl Registry {
    pub fn new(heartbeat_period: chrono::Duration) -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
            client: WorkerClient::new(),
            heartbeat_period,
        }
    }

    /// Idempotent: re-registering an already-known id updates its
    /// endpoint/capabilities in place.
    pub async fn register(&self, node: WorkerNode) {
        let mut workers = self.workers.write().await;
        if workers.contains_key(&node.id) {
            warn!(worker = %node.id, "worker already registered, updating");
        } else {
            info!(worker = %node.id, name = %node.name, "worker registered");
        }
        workers.insert(node.id.clone(), node);
    }

    pub async fn unregister(&self, id: &str) -> bool {
        let removed = self.workers.write().await.remove(id).is_some();
        if removed {
            info!(worker = %id, "worker unregistered");
        }
        removed
    }

    /// Poll a single worker's `/status` endpoint and fold the result into
    /// the registry; on failure the node transitions to `Offline`.
    pub async fn probe_one(&self, id: &str) {
        let node = { self.workers.read().await.get(id).cloned() };
        let Some(node) = node else { return };

        match self.client.fetch_status(&node).await {
            Ok(status) => {
                let mut workers = self.workers.write().await;
                if let Some(w) = workers.get_mut(id) {
                    w.gpu_count = status.gpu_count;
                    w.total_vram_gb = status.total_vram_gb;
                    w.free_vram_gb = status.free_vram_gb;
                    w.current_task = status.current_task;
                    w.tasks_completed = status.tasks_completed;
                    w.tasks_failed = status.tasks_failed;
                    w.status = if w.current_task.is_some() {
                        WorkerStatus::Busy
                    } else {
                        WorkerStatus::Online
                    };
                    w.last_heartbeat = Utc::now();
                }
            }
            Err(err) => {
                warn!(worker = %id, error = %err, "status probe failed");
                let mut workers = self.workers.write().await;
                if let Some(w) = workers.get_mut(id) {
                    w.status = WorkerStatus::Offline;
                }
            }
        }
    }

    /// Probe every registered worker once. Called on the heartbeat timer.
    pub async fn probe_all(&self) {
        let ids: Vec<String> = self.workers.read().await.keys().cloned().collect();
        for id in ids {
            self.probe_one(&id).await;
        }
        self.sweep_stale().await;
    }

    /// Force offline any worker that hasn't refreshed within
    /// `3 * heartbeat_period`, independent of explicit probe failures
    /// (covers heartbeat-push-only deployments).
    async fn sweep_stale(&self) {
        let now = Utc::now();
        let mut workers = self.workers.write().await;
        for w in workers.values_mut() {
            if w.status != WorkerStatus::Offline && w.is_stale(now, self.heartbeat_period) {
                warn!(worker = %w.id, "worker stale, marking offline");
                w.status = WorkerStatus::Offline;
            }
        }
    }

    pub async fn mark_error(&self, id: &str) {
        if let Some(w) = self.workers.write().await.get_mut(id) {
            w.status = WorkerStatus::Error;
        }
    }

    pub async fn touch_heartbeat(&self, id: &str) -> Result<(), PoolError> {
        let mut workers = self.workers.write().await;
        let w = workers.get_mut(id).ok_or_else(|| PoolError::UnknownWorker(id.to_string()))?;
        w.last_heartbeat = Utc::now();
        if w.status == WorkerStatus::Offline {
            w.status = WorkerStatus::Online;
        }
        Ok(())
    }

    pub async fn available(&self) -> Vec<WorkerNode> {
        self.workers
            .read()
            .await
            .values()
            .filter(|w| w.is_available())
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<WorkerNode> {
        self.workers.read().await.get(id).cloned()
    }

    pub async fn stats(&self, jobs_in_queue: usize, jobs_completed: u64, jobs_failed: u64) -> PoolStats {
        let workers = self.workers.read().await;
        let online: Vec<&WorkerNode> = workers.values().filter(|w| w.status == WorkerStatus::Online).collect();
        let busy = workers.values().filter(|w| w.status == WorkerStatus::Busy).count();

        PoolStats {
            total_workers: workers.len(),
            online_workers: online.len(),
            busy_workers: busy,
            total_gpus: workers.values().map(|w| w.gpu_count).sum(),
            total_vram_gb: workers.values().map(|w| w.total_vram_gb).sum(),
            free_vram_gb: online.iter().map(|w| w.free_vram_gb).sum(),
            total_compute_power: online.iter().map(|w| w.compute_power).sum(),
            jobs_in_queue,
            jobs_completed,
            jobs_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> WorkerNode {
        WorkerNode::new(id, id, "127.0.0.1", 9000)
    }

    #[tokio::test]
    async fn register_is_idempotent_on_count() {
        let reg = Registry::new(chrono::Duration::seconds(30));
        reg.register(node("w1")).await;
        reg.register(node("w1")).await;
        assert_eq!(reg.available().await.len(), 0);
        assert!(reg.get("w1").await.is_some());
    }

    #[tokio::test]
    async fn unregister_removes() {
        let reg = Registry::new(chrono::Duration::seconds(30));
        reg.register(node("w1")).await;
        assert!(reg.unregister("w1").await);
        assert!(reg.get("w1").await.is_none());
    }
}
