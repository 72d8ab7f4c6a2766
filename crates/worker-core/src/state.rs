use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pool_types::ControlMessage;
use tokio::sync::RwLock;

use crate::gpu_monitor::GpuMonitor;

/// Shared state for one worker process: identity, current task, and
/// running counters. Read by both the control-channel client and the
/// worker's own HTTP status surface.
pub struct WorkerState {
    pub worker_id: String,
    pub worker_name: String,
    pub api_port: Option<u16>,
    pub supported_models: Vec<String>,
    pub gpu_monitor: Arc<dyn GpuMonitor>,
    current_task: RwLock<Option<String>>,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
}

impl WorkerState {
    pub fn new(
        worker_id: impl Into<String>,
        worker_name: impl Into<String>,
        api_port: Option<u16>,
        supported_models: Vec<String>,
        gpu_monitor: Arc<dyn GpuMonitor>,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_name: worker_name.into(),
            api_port,
            supported_models,
            gpu_monitor,
            current_task: RwLock::new(None),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
        }
    }

    pub async fn current_task(&self) -> Option<String> {
        self.current_task.read().await.clone()
    }

    pub async fn begin_task(&self, task_id: String) {
        *self.current_task.write().await = Some(task_id);
    }

    pub async fn finish_task(&self, succeeded: bool) {
        *self.current_task.write().await = None;
        if succeeded {
            self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed.load(Ordering::Relaxed)
    }

    pub fn tasks_failed(&self) -> u64 {
        self.tasks_failed.load(Ordering::Relaxed)
    }

    pub async fn register_frame(&self) -> ControlMessage {
        let gpus = self.gpu_monitor.snapshot().await;
        ControlMessage::Register {
            worker_id: self.worker_id.clone(),
            worker_name: self.worker_name.clone(),
            api_port: self.api_port,
            gpu_count: gpus.len() as u32,
            total_vram_mb: gpus.iter().map(|g| g.total_memory_mb).sum(),
            supported_models: self.supported_models.clone(),
        }
    }

    pub async fn status_frame(&self) -> ControlMessage {
        let gpus = self.gpu_monitor.snapshot().await;
        ControlMessage::Status {
            worker_id: self.worker_id.clone(),
            gpu_count: gpus.len() as u32,
            total_vram_mb: gpus.iter().map(|g| g.total_memory_mb).sum(),
            free_vram_mb: gpus.iter().map(|g| g.free_memory_mb).sum(),
            gpus,
            current_task: self.current_task().await,
        }
    }
}
