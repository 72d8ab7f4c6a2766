use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker {0} is not registered")]
    UnknownWorker(String),
    #[error("job {0} is not registered")]
    UnknownJob(String),
    #[error("job {0} cannot be cancelled from its current status")]
    NotCancellable(String),
    #[error("no available worker for job {0}")]
    NoAvailableWorker(String),
    #[error("dispatch to worker {worker} failed: {source}")]
    Dispatch {
        worker: String,
        #[source]
        source: anyhow::Error,
    },
}
