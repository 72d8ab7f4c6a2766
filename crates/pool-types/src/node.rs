use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Online,
    Busy,
    Offline,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuTelemetry {
    pub index: u32,
    pub name: String,
    pub total_memory_mb: f64,
    pub used_memory_mb: f64,
    pub free_memory_mb: f64,
    pub utilization_pct: f64,
    pub temperature_c: f64,
    pub power_draw_w: f64,
    pub power_limit_w: f64,
}

/// A registered GPU worker node (§3: `id, endpoint, gpu_count, total_vram,
/// free_vram, status, current_task, compute_power, last_heartbeat,
/// counters`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerNode {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub gpu_count: u32,
    #[serde(default)]
    pub total_vram_gb: f64,
    #[serde(default)]
    pub free_vram_gb: f64,
    #[serde(default = "default_status")]
    pub status: WorkerStatus,
    #[serde(default)]
    pub current_task: Option<String>,
    #[serde(default)]
    pub tasks_completed: u64,
    #[serde(default)]
    pub tasks_failed: u64,
    pub last_heartbeat: DateTime<Utc>,
    #[serde(default = "default_compute_power")]
    pub compute_power: f64,
}

fn default_status() -> WorkerStatus {
    WorkerStatus::Offline
}

fn default_compute_power() -> f64 {
    1.0
}

impl WorkerNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        WorkerNode {
            id: id.into(),
            name: name.into(),
            host: host.into(),
            port,
            gpu_count: 0,
            total_vram_gb: 0.0,
            free_vram_gb: 0.0,
            status: WorkerStatus::Offline,
            current_task: None,
            tasks_completed: 0,
            tasks_failed: 0,
            last_heartbeat: Utc::now(),
            compute_power: 1.0,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn is_available(&self) -> bool {
        self.status == WorkerStatus::Online && self.current_task.is_none()
    }

    /// True once this node has gone silent for more than
    /// `3 * heartbeat_period`.
    pub fn is_stale(&self, now: DateTime<Utc>, heartbeat_period: chrono::Duration) -> bool {
        now - self.last_heartbeat > heartbeat_period * 3
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_workers: usize,
    pub online_workers: usize,
    pub busy_workers: usize,
    pub total_gpus: u32,
    pub total_vram_gb: f64,
    pub free_vram_gb: f64,
    pub total_compute_power: f64,
    pub jobs_in_queue: usize,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_requires_online_and_idle() {
        let mut n = WorkerNode::new("w1", "node-1", "10.0.0.1", 9000);
        assert!(!n.is_available());
        n.status = WorkerStatus::Online;
        assert!(n.is_available());
        n.current_task = Some("t1".into());
        assert!(!n.is_available());
    }

    #[test]
    fn stale_after_three_heartbeat_periods() {
        let mut n = WorkerNode::new("w1", "node-1", "10.0.0.1", 9000);
        n.last_heartbeat = Utc::now() - chrono::Duration::seconds(91);
        assert!(n.is_stale(Utc::now(), chrono::Duration::seconds(30)));
        n.last_heartbeat = Utc::now() - chrono::Duration::seconds(60);
        assert!(!n.is_stale(Utc::now(), chrono::Duration::seconds(30)));
    }
}
