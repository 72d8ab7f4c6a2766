//! Control-channel client for a single GPU worker node.
#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

mod control;
mod gpu_monitor;
mod identity;
mod pipeline;
mod state;

pub use control::ControlClient;
pub use gpu_monitor::{GpuMonitor, NullGpuMonitor};
pub use identity::{ensure_identity, WorkerIdentity};
pub use pipeline::{GenerationOutcome, GenerationPipeline, PipelineError};
pub use state::WorkerState;
