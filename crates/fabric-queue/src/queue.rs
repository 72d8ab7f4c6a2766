use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// A list-oriented key-value queue, as used for the manager's bridge to
/// the external backend (`tasks:<platform>:pending`, `backend:results`,
/// and friends).
#[async_trait]
pub trait PersistentQueue: Send + Sync {
    /// Append a value to the tail of the list at `key`.
    async fn tail_push(&self, key: &str, value: &str) -> Result<(), QueueError>;

    /// Pop and return the value at the head of the list at `key`, if any.
    async fn head_pop(&self, key: &str) -> Result<Option<String>, QueueError>;

    /// Set a scalar value at `key`, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), QueueError>;

    /// Get the scalar value at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, QueueError>;
}
