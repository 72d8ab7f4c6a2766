use async_trait::async_trait;
use pool_types::GpuTelemetry;

/// Boundary to the actual NVML/driver polling. Out of scope: this crate
/// only carries the telemetry shape through to the status frame and the
/// worker's own `/status` HTTP response.
#[async_trait]
pub trait GpuMonitor: Send + Sync {
    async fn snapshot(&self) -> Vec<GpuTelemetry>;

    async fn gpu_count(&self) -> u32 {
        self.snapshot().await.len() as u32
    }

    async fn total_vram_mb(&self) -> f64 {
        self.snapshot().await.iter().map(|g| g.total_memory_mb).sum()
    }

    async fn free_vram_mb(&self) -> f64 {
        self.snapshot().await.iter().map(|g| g.free_memory_mb).sum()
    }
}

/// A monitor that reports no GPUs. Used for standalone/dev runs and
/// tests where no real driver is present.
#[derive(Default)]
pub struct NullGpuMonitor;

#[async_trait]
impl GpuMonitor for NullGpuMonitor {
    async fn snapshot(&self) -> Vec<GpuTelemetry> {
        Vec::new()
    }
}
