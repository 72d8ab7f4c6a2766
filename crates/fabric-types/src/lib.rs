//! Canonical data model shared by the manager, pool, and worker tiers.
#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

mod platform;
mod task;

pub use platform::Platform;
pub use task::{Task, TaskError, TaskKind, TaskStatus};

use std::collections::HashMap;
use serde_json::Value;

/// Opaque key-value payload carried by a task record.
pub type Payload = HashMap<String, Value>;
