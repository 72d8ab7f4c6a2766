use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use fabric_types::TaskStatus;
use pool_types::{estimate_vram_gb, ControlMessage, DistributedJob, DistributionMode, JobType, SubtaskRecord};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::client::WorkerClient;
use crate::errors::PoolError;
use crate::hub::ControlHub;
use crate::registry::Registry;
use crate::split::{select_best_worker, split_batch};

/// A queued job paired with an arrival sequence number, used to break
/// priority ties in FIFO order.
struct PendingJob {
    priority: i64,
    seq: u64,
    job_id: String,
}

impl PartialEq for PendingJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for PendingJob {}

impl Ord for PendingJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: higher priority first, and among equal
        // priorities the one with the *lower* seq (earlier arrival) first.
        self.priority.cmp(&other.priority).then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for PendingJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Amount a job's priority is penalized after a failed dispatch, to avoid
/// immediately re-selecting the same unavailable/errored worker.
const DISPATCH_FAILURE_PENALTY: i64 = 1;
const EMPTY_QUEUE_BACKOFF: Duration = Duration::from_millis(500);

pub struct Distributor {
    registry: Arc<Registry>,
    client: WorkerClient,
    hub: Arc<ControlHub>,
    jobs: Mutex<HashMap<String, DistributedJob>>,
    queue: Mutex<BinaryHeap<PendingJob>>,
    seq: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Distributor {
    pub fn new(registry: Arc<Registry>, hub: Arc<ControlHub>) -> Self {
        Self {
            registry,
            client: WorkerClient::new(),
            hub,
            jobs: Mutex::new(HashMap::new()),
            queue: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub async fn submit(&self, job: DistributedJob) {
        let id = job.id.clone();
        let priority = job.priority;
        self.jobs.lock().await.insert(id.clone(), job);
        self.push(id, priority).await;
    }

    async fn push(&self, job_id: String, priority: i64) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.queue.lock().await.push(PendingJob { priority, seq, job_id });
    }

    pub async fn cancel(&self, job_id: &str) -> Result<(), PoolError> {
        let workers = {
            let mut jobs = self.jobs.lock().await;
            let job = jobs.get_mut(job_id).ok_or_else(|| PoolError::UnknownJob(job_id.to_string()))?;
            if !matches!(job.status, TaskStatus::Pending | TaskStatus::Queued) {
                return Err(PoolError::NotCancellable(job_id.to_string()));
            }
            job.status = TaskStatus::Cancelled;
            job.assigned_workers.clone()
        };

        for worker_id in workers {
            let msg = ControlMessage::Cancel { task_id: job_id.to_string() };
            if let Err(err) = self.hub.send(&worker_id, msg).await {
                warn!(job = %job_id, worker = %worker_id, error = %err, "failed to push cancel to worker");
            }
        }
        Ok(())
    }

    pub async fn jobs_in_queue(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn completed_count(&self) -> u64 {
        self.completed.load(AtomicOrdering::Relaxed)
    }

    pub async fn failed_count(&self) -> u64 {
        self.failed.load(AtomicOrdering::Relaxed)
    }

    pub async fn get_job(&self, id: &str) -> Option<DistributedJob> {
        self.jobs.lock().await.get(id).cloned()
    }

    /// Pop and dispatch one job. Returns `false` when the queue was empty
    /// (caller should back off briefly).
    pub async fn dispatch_next(&self) -> bool {
        let popped = self.queue.lock().await.pop();
        let Some(pending) = popped else {
            tokio::time::sleep(EMPTY_QUEUE_BACKOFF).await;
            return false;
        };

        let job = { self.jobs.lock().await.get(&pending.job_id).cloned() };
        let Some(job) = job else { return true };

        if job.status == TaskStatus::Cancelled {
            return true;
        }

        let effective_mode = self.resolve_mode(&job).await;
        let result = match effective_mode {
            DistributionMode::Parallel => self.dispatch_parallel(&job).await,
            DistributionMode::Combined => self.dispatch_combined(&job).await,
            DistributionMode::Auto => unreachable!("resolved above"),
        };

        if let Err(err) = result {
            warn!(job = %job.id, error = %err, "dispatch failed, re-queueing with penalty");
            if let PoolError::Dispatch { worker, .. } = &err {
                self.registry.mark_error(worker).await;
            }
            self.push(job.id.clone(), job.priority.saturating_sub(DISPATCH_FAILURE_PENALTY)).await;
        }
        true
    }

    async fn resolve_mode(&self, job: &DistributedJob) -> DistributionMode {
        match job.mode {
            DistributionMode::Parallel | DistributionMode::Combined => job.mode,
            DistributionMode::Auto => {
                let available = self.registry.available().await;
                let required = estimate_vram_gb(job.model_id(), job.job_type);
                let no_single_node_fits = available.iter().all(|w| w.free_vram_gb < required);
                if job.requires_large_vram() || no_single_node_fits {
                    DistributionMode::Combined
                } else {
                    DistributionMode::Parallel
                }
            }
        }
    }

    async fn dispatch_parallel(&self, job: &DistributedJob) -> Result<(), PoolError> {
        let available = self.registry.available().await;
        let Some(node) = select_best_worker(&available, job.model_id(), job.job_type) else {
            return Err(PoolError::NoAvailableWorker(job.id.clone()));
        };

        let job_type_str = job_type_str(job.job_type);
        self.client
            .dispatch(node, job_type_str, &job.id, &job.request)
            .await
            .map_err(|source| PoolError::Dispatch { worker: node.id.clone(), source })?;

        let mut jobs = self.jobs.lock().await;
        if let Some(j) = jobs.get_mut(&job.id) {
            j.status = TaskStatus::Distributed;
            j.assigned_workers = vec![node.id.clone()];
        }
        info!(job = %job.id, worker = %node.id, "job dispatched (parallel)");
        Ok(())
    }

    async fn dispatch_combined(&self, job: &DistributedJob) -> Result<(), PoolError> {
        let available = self.registry.available().await;
        let batch = job.batch_size();

        if available.is_empty() {
            return Err(PoolError::NoAvailableWorker(job.id.clone()));
        }
        if batch <= 1 {
            return self.dispatch_parallel(job).await;
        }

        let mut sorted = available;
        sorted.sort_by(|a, b| b.compute_power.partial_cmp(&a.compute_power).unwrap_or(Ordering::Equal));

        let shares = split_batch(&job.id, &sorted, batch);
        let job_type_str = job_type_str(job.job_type);

        let mut subtasks = Vec::with_capacity(shares.len());
        let mut assigned = Vec::with_capacity(shares.len());
        for share in &shares {
            let mut request = job.request.clone();
            if let Some(obj) = request.as_object_mut() {
                obj.insert("batch_size".into(), share.batch_size.into());
            }
            match self.client.dispatch(share.node, job_type_str, &share.subtask_id, &request).await {
                Ok(_) => {
                    assigned.push(share.node.id.clone());
                    subtasks.push(SubtaskRecord {
                        id: share.subtask_id.clone(),
                        worker_id: share.node.id.clone(),
                        batch_size: share.batch_size,
                        status: TaskStatus::Running,
                        result: None,
                        error: None,
                    });
                }
                Err(err) => {
                    error!(job = %job.id, worker = %share.node.id, error = %err, "subtask dispatch failed");
                    self.registry.mark_error(&share.node.id).await;
                    subtasks.push(SubtaskRecord {
                        id: share.subtask_id.clone(),
                        worker_id: share.node.id.clone(),
                        batch_size: share.batch_size,
                        status: TaskStatus::Failed,
                        result: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let mut jobs = self.jobs.lock().await;
        if let Some(j) = jobs.get_mut(&job.id) {
            j.status = TaskStatus::Distributed;
            j.assigned_workers = assigned;
            j.subtasks = subtasks;
        }
        info!(job = %job.id, subtasks = shares.len(), "job dispatched (combined)");
        Ok(())
    }

    /// Record a subtask's outcome (from a worker's `task_result` frame)
    /// and finalize the parent job once every subtask has resolved.
    pub async fn record_subtask_result(
        &self,
        job_id: &str,
        subtask_id: &str,
        status: TaskStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<(), PoolError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(job_id).ok_or_else(|| PoolError::UnknownJob(job_id.to_string()))?;

        if let Some(sub) = job.subtasks.iter_mut().find(|s| s.id == subtask_id) {
            sub.status = status;
            sub.result = result;
            sub.error = error;
        }

        if job.try_finalize() {
            match job.status {
                TaskStatus::Completed => {
                    self.completed.fetch_add(1, AtomicOrdering::Relaxed);
                }
                TaskStatus::Failed => {
                    self.failed.fetch_add(1, AtomicOrdering::Relaxed);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Record a non-subtask (parallel-mode) job's outcome directly.
    pub async fn record_job_result(
        &self,
        job_id: &str,
        status: TaskStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<(), PoolError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(job_id).ok_or_else(|| PoolError::UnknownJob(job_id.to_string()))?;
        job.status = status;
        job.aggregated_result = result;
        job.error = error;
        match status {
            TaskStatus::Completed => {
                self.completed.fetch_add(1, AtomicOrdering::Relaxed);
            }
            TaskStatus::Failed => {
                self.failed.fetch_add(1, AtomicOrdering::Relaxed);
            }
            _ => {}
        }
        Ok(())
    }
}

fn job_type_str(job_type: JobType) -> &'static str {
    match job_type {
        JobType::Image => "image",
        JobType::Video => "video",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn job(id: &str, priority: i64, mode: DistributionMode, batch_size: u32) -> DistributedJob {
        DistributedJob {
            id: id.into(),
            job_type: JobType::Image,
            request: json!({"batch_size": batch_size}),
            priority,
            mode,
            status: TaskStatus::Pending,
            assigned_workers: vec![],
            subtasks: vec![],
            aggregated_result: None,
            error: None,
            created_at: Utc::now(),
            callback: None,
        }
    }

    #[tokio::test]
    async fn priority_queue_pops_highest_first_fifo_tiebreak() {
        let registry = Arc::new(Registry::new(chrono::Duration::seconds(30)));
        let dist = Distributor::new(registry, Arc::new(ControlHub::new()));
        dist.submit(job("low", 1, DistributionMode::Parallel, 1)).await;
        dist.submit(job("high", 5, DistributionMode::Parallel, 1)).await;
        dist.submit(job("high2", 5, DistributionMode::Parallel, 1)).await;

        let mut order = Vec::new();
        while let Some(p) = dist.queue.lock().await.pop() {
            order.push(p.job_id);
        }
        assert_eq!(order, vec!["high", "high2", "low"]);
    }

    #[tokio::test]
    async fn cancel_only_allowed_before_dispatch() {
        let registry = Arc::new(Registry::new(chrono::Duration::seconds(30)));
        let dist = Distributor::new(registry, Arc::new(ControlHub::new()));
        dist.submit(job("j1", 0, DistributionMode::Parallel, 1)).await;
        dist.cancel("j1").await.unwrap();
        assert_eq!(dist.get_job("j1").await.unwrap().status, TaskStatus::Cancelled);

        {
            let mut jobs = dist.jobs.lock().await;
            jobs.get_mut("j1").unwrap().status = TaskStatus::Distributed;
        }
        assert!(dist.cancel("j1").await.is_err());
    }

    #[tokio::test]
    async fn subtask_aggregation_finalizes_and_counts() {
        let registry = Arc::new(Registry::new(chrono::Duration::seconds(30)));
        let dist = Distributor::new(registry, Arc::new(ControlHub::new()));
        let mut j = job("j1", 0, DistributionMode::Combined, 2);
        j.subtasks = vec![
            SubtaskRecord { id: "j1_part0".into(), worker_id: "w0".into(), batch_size: 1, status: TaskStatus::Running, result: None, error: None },
            SubtaskRecord { id: "j1_part1".into(), worker_id: "w1".into(), batch_size: 1, status: TaskStatus::Running, result: None, error: None },
        ];
        dist.jobs.lock().await.insert(j.id.clone(), j);

        dist.record_subtask_result("j1", "j1_part0", TaskStatus::Completed, Some(json!("a")), None).await.unwrap();
        assert_eq!(dist.completed_count().await, 0);
        dist.record_subtask_result("j1", "j1_part1", TaskStatus::Completed, Some(json!("b")), None).await.unwrap();
        assert_eq!(dist.completed_count().await, 1);
        assert_eq!(dist.get_job("j1").await.unwrap().status, TaskStatus::Completed);
    }
}
