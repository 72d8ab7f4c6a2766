#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

//! Process-supervisor core for the manager tier: worker-slot allocation,
//! the JoinSet-managed async worker slots themselves, the ingestion/
//! redrive/health-check/stats loops tying them to a persistent external
//! queue, and the deferred-submit scheduler.

mod adapter;
mod adapter_registry;
mod allocation;
mod config;
mod errors;
mod scheduler;
mod supervisor;
mod worker_slot;

pub use adapter::{AdapterError, PlatformAdapter};
pub use adapter_registry::AdapterRegistry;
pub use allocation::allocate;
pub use config::SupervisorConfig;
pub use errors::SupervisorError;
pub use scheduler::Scheduler;
pub use supervisor::{Supervisor, SupervisorStats};
pub use worker_slot::{WorkerResult, WorkerSlot};
