//! Data model for the GPU worker pool: nodes, distributed jobs, and the
//! VRAM-estimation table used for worker selection.
#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

mod control;
mod job;
mod node;
mod vram;

pub use control::ControlMessage;
pub use job::{DistributedJob, DistributionMode, JobType, SubtaskRecord};
pub use node::{GpuTelemetry, PoolStats, WorkerNode, WorkerStatus};
pub use vram::estimate_vram_gb;

pub use fabric_types::TaskStatus;
