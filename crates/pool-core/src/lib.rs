//! GPU worker pool registry and task distributor.
#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

mod client;
mod distributor;
mod engine;
mod errors;
mod hub;
mod registry;
mod split;

pub use client::{DispatchAck, StatusResponse, WorkerClient};
pub use distributor::Distributor;
pub use engine::{PoolConfig, PoolEngine};
pub use errors::PoolError;
pub use hub::ControlHub;
pub use registry::Registry;
pub use split::{select_best_worker, split_batch, BatchShare};
