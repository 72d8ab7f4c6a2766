use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
    #[error("unknown task: {0}")]
    UnknownTask(String),
    #[error("queue error: {0}")]
    Queue(#[from] fabric_queue::QueueError),
    #[error("task error: {0}")]
    Task(#[from] fabric_types::TaskError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
