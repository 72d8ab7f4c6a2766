use async_trait::async_trait;
use fabric_types::{Payload, Task};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("provider returned an error: {0}")]
    Provider(String),
    #[error("not implemented for this platform")]
    NotImplemented,
}

/// Capability surface a per-platform adapter implements: authenticate,
/// post, schedule, fetch metrics, delete. Concrete adapter bodies (the
/// actual REST calls against each social API) are out of scope; this
/// crate only owns the trait boundary and the registry that maps a
/// platform tag to its constructor.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    async fn authenticate(&self) -> Result<(), AdapterError>;
    async fn post_content(&self, task: &Task) -> Result<Payload, AdapterError>;
    async fn schedule_post(&self, task: &Task, at: chrono::DateTime<chrono::Utc>) -> Result<Payload, AdapterError>;
    async fn get_metrics(&self, task: &Task) -> Result<Payload, AdapterError>;
    async fn delete_post(&self, post_id: &str) -> Result<(), AdapterError>;
}
