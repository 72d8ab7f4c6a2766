use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fabric_queue::{Mailbox, MailboxReceiver, MailboxSender, PersistentQueue};
use fabric_types::{Platform, Task, TaskStatus};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{error, info, warn};

use crate::adapter_registry::AdapterRegistry;
use crate::allocation::allocate;
use crate::config::SupervisorConfig;
use crate::errors::SupervisorError;
use crate::scheduler::Scheduler;
use crate::worker_slot::{WorkerResult, WorkerSlot};

struct LiveTask {
    task: Task,
    retry_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize)]
pub struct SupervisorStats {
    pub queued: u64,
    pub processed: u64,
    pub failed: u64,
    pub platform_slots: HashMap<String, usize>,
}

/// Supervises one JoinSet-managed worker slot per allocated core across
/// all platforms, bridging a persistent external queue into in-process
/// mailboxes. The direct analog of a process orchestrator, realized as
/// async tasks rather than OS children (the teacher's own concurrency
/// idiom has no subprocess spawning to imitate).
pub struct Supervisor {
    config: SupervisorConfig,
    queue: Arc<dyn PersistentQueue>,
    mailboxes: HashMap<Platform, MailboxSender>,
    slots: Mutex<Vec<WorkerSlot>>,
    live_tasks: Mutex<HashMap<String, LiveTask>>,
    scheduler: Arc<Scheduler>,
    results_tx: mpsc::Sender<WorkerResult>,
    processed: AtomicU64,
    failed: AtomicU64,
    shutdown: Arc<Notify>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, queue: Arc<dyn PersistentQueue>, adapters: Arc<AdapterRegistry>) -> Arc<Self> {
        let allocation = allocate(config.num_cores);
        let (results_tx, results_rx) = mpsc::channel(config.mailbox_capacity);
        let (scheduler, due_rx) = Scheduler::new();

        let mut mailboxes = HashMap::new();
        let mut slots = Vec::new();
        let mut receivers: Vec<(Platform, Arc<Mutex<MailboxReceiver>>, usize)> = Vec::new();

        for platform in Platform::ALL {
            let count = allocation.get(&platform).copied().unwrap_or(0);
            if count == 0 {
                continue;
            }
            let (tx, rx) = Mailbox::bounded(config.mailbox_capacity);
            mailboxes.insert(platform, tx);
            receivers.push((platform, Arc::new(Mutex::new(rx)), count));
        }

        for (platform, rx, count) in receivers {
            for slot_id in 0..count {
                slots.push(WorkerSlot::spawn(
                    platform,
                    slot_id,
                    rx.clone(),
                    adapters.clone(),
                    results_tx.clone(),
                    config.max_retries,
                ));
            }
        }

        let supervisor = Arc::new(Self {
            config,
            queue,
            mailboxes,
            slots: Mutex::new(slots),
            live_tasks: Mutex::new(HashMap::new()),
            scheduler,
            results_tx,
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            shutdown: Arc::new(Notify::new()),
        });

        let this = supervisor.clone();
        tokio::spawn(async move { this.collect_results(results_rx).await });

        let this = supervisor.clone();
        tokio::spawn(async move { this.drain_scheduler(due_rx).await });

        let scheduler = supervisor.scheduler.clone();
        let shutdown = supervisor.shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await });

        supervisor
    }

    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Submission path: write-ahead to the persistent queue, then attempt
    /// an immediate, non-blocking mailbox delivery. A full mailbox is not
    /// an error here — the redrive sweep picks the task up on its next
    /// tick, the durable record is the source of truth.
    pub async fn submit(&self, task: Task) -> Result<(), SupervisorError> {
        let Some(platform) = task.platform else {
            return Err(SupervisorError::UnknownPlatform("task has no platform".into()));
        };
        let key = format!("tasks:{platform}:pending");
        self.queue.tail_push(&key, &serde_json::to_string(&task)?).await?;

        let mut task = task;
        task.status = TaskStatus::Queued;
        self.try_deliver(&mut task);

        self.live_tasks.lock().await.insert(task.id.clone(), LiveTask { task, retry_at: None });
        Ok(())
    }

    /// Deferred submission: parks the task in the scheduler's timer wheel
    /// instead of delivering it immediately.
    pub async fn schedule(&self, task: Task, fire_at: DateTime<Utc>) {
        self.scheduler.schedule(task, fire_at).await;
    }

    pub async fn cancel(&self, task_id: &str) -> Result<(), SupervisorError> {
        let mut live = self.live_tasks.lock().await;
        let entry = live.get_mut(task_id).ok_or_else(|| SupervisorError::UnknownTask(task_id.to_string()))?;
        entry.task.cancel()?;
        Ok(())
    }

    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        self.live_tasks.lock().await.get(task_id).map(|e| e.task.clone())
    }

    pub async fn stats(&self) -> SupervisorStats {
        let live = self.live_tasks.lock().await;
        let queued = live.values().filter(|e| e.task.status == TaskStatus::Queued).count() as u64;
        let slots = self.slots.lock().await;
        let mut platform_slots = HashMap::new();
        for slot in slots.iter() {
            *platform_slots.entry(slot.platform.to_string()).or_insert(0) += 1;
        }
        SupervisorStats {
            queued,
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            platform_slots,
        }
    }

    fn try_deliver(&self, task: &mut Task) {
        let Some(platform) = task.platform else { return };
        if let Some(tx) = self.mailboxes.get(&platform) {
            if tx.try_send_task(task.clone()).is_err() {
                warn!(task_id = %task.id, %platform, "mailbox full, task will be redriven");
            }
        }
    }

    /// Ingestion loop: round-robins the platform-tagged external backend
    /// queues, forwarding each fetched task through the normal submission
    /// path. Suspends on the external read and on mailbox backpressure.
    pub async fn run_ingestion(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.queue_poll_interval);
        loop {
            ticker.tick().await;
            for platform in Platform::ALL {
                let key = format!("backend:tasks:{platform}");
                match self.queue.head_pop(&key).await {
                    Ok(Some(raw)) => match serde_json::from_str::<Task>(&raw) {
                        Ok(task) => {
                            if let Err(err) = self.submit(task).await {
                                error!(%err, "failed to ingest task");
                            }
                        }
                        Err(err) => error!(%err, platform = %platform, "malformed task record on ingestion queue"),
                    },
                    Ok(None) => {}
                    Err(err) => error!(%err, platform = %platform, "ingestion queue read failed"),
                }
            }
        }
    }

    /// Redrive sweep: retries mailbox delivery for anything still queued
    /// whose backoff window has elapsed.
    pub async fn run_redrive(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.queue_poll_interval);
        loop {
            ticker.tick().await;
            let now = Utc::now();
            let mut live = self.live_tasks.lock().await;
            for entry in live.values_mut() {
                if entry.task.status != TaskStatus::Queued {
                    continue;
                }
                if entry.retry_at.is_some_and(|at| at > now) {
                    continue;
                }
                self.try_deliver(&mut entry.task);
            }
        }
    }

    /// Health-check loop: respawns any worker slot whose task has died.
    pub async fn run_health_check(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.health_check_interval);
        loop {
            ticker.tick().await;
            let mut slots = self.slots.lock().await;
            for slot in slots.iter_mut() {
                if !slot.is_alive() {
                    slot.respawn();
                }
            }
        }
    }

    /// Stats loop: publishes aggregate counters to the external backend
    /// once a minute.
    pub async fn run_stats(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let stats = self.stats().await;
            if let Ok(json) = serde_json::to_string(&stats) {
                if let Err(err) = self.queue.set("orchestrator:stats", &json).await {
                    error!(%err, "failed to publish stats");
                }
            }
        }
    }

    async fn collect_results(self: Arc<Self>, mut results_rx: mpsc::Receiver<WorkerResult>) {
        while let Some(WorkerResult { task, retry }) = results_rx.recv().await {
            if retry {
                let delay = self.config.retry_delay_base * 2u32.pow(task.attempts);
                let delay = delay.min(std::time::Duration::from_secs(60));
                let retry_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
                let key = task.platform.map(|p| format!("tasks:{p}:pending"));
                if let (Some(key), Ok(json)) = (key, serde_json::to_string(&task)) {
                    if let Err(err) = self.queue.tail_push(&key, &json).await {
                        error!(%err, "failed to persist retry");
                    }
                }
                let mut live = self.live_tasks.lock().await;
                live.insert(task.id.clone(), LiveTask { task, retry_at: Some(retry_at) });
                continue;
            }

            if task.status == TaskStatus::Completed {
                self.processed.fetch_add(1, Ordering::Relaxed);
            } else if task.status == TaskStatus::Failed {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }

            self.live_tasks.lock().await.remove(&task.id);
            if let Ok(json) = serde_json::to_string(&task) {
                if let Err(err) = self.queue.tail_push("backend:results", &json).await {
                    error!(%err, "failed to publish result");
                }
            }
        }
    }

    async fn drain_scheduler(self: Arc<Self>, mut due_rx: mpsc::UnboundedReceiver<Task>) {
        while let Some(task) = due_rx.recv().await {
            if let Err(err) = self.submit(task).await {
                error!(%err, "failed to submit scheduled task");
            }
        }
    }

    /// Graceful stop: enqueues one shutdown sentinel per worker slot on
    /// each platform mailbox, waits up to 5s for them to drain, then
    /// force-aborts any stragglers.
    pub async fn stop(&self) {
        let mut per_platform_count: HashMap<Platform, usize> = HashMap::new();
        for slot in self.slots.lock().await.iter() {
            *per_platform_count.entry(slot.platform).or_insert(0) += 1;
        }
        for (platform, count) in per_platform_count {
            if let Some(tx) = self.mailboxes.get(&platform) {
                for _ in 0..count {
                    let _ = tx.send_shutdown().await;
                }
            }
        }

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let all_dead = {
                let slots = self.slots.lock().await;
                slots.iter().all(|s| !s.is_alive())
            };
            if all_dead || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        let slots = self.slots.lock().await;
        for slot in slots.iter() {
            if slot.is_alive() {
                warn!(platform = %slot.platform, slot_id = slot.slot_id, "force-terminating straggling worker slot");
                slot.abort();
            }
        }
        self.shutdown.notify_waiters();
        info!("supervisor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fabric_queue::MemoryQueue;
    use fabric_types::{Payload, TaskKind};
    use std::time::Duration;
    use tokio::time::timeout;

    use crate::adapter::{AdapterError, PlatformAdapter};

    struct EchoAdapter;

    #[async_trait]
    impl PlatformAdapter for EchoAdapter {
        async fn authenticate(&self) -> Result<(), AdapterError> {
            Ok(())
        }
        async fn post_content(&self, task: &Task) -> Result<Payload, AdapterError> {
            Ok(task.payload.clone())
        }
        async fn schedule_post(&self, task: &Task, _at: DateTime<Utc>) -> Result<Payload, AdapterError> {
            Ok(task.payload.clone())
        }
        async fn get_metrics(&self, _task: &Task) -> Result<Payload, AdapterError> {
            Ok(Payload::default())
        }
        async fn delete_post(&self, _post_id: &str) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    fn test_config() -> SupervisorConfig {
        SupervisorConfig {
            num_cores: 4,
            task_timeout: Duration::from_secs(5),
            health_check_interval: Duration::from_secs(30),
            queue_poll_interval: Duration::from_millis(10),
            max_retries: 2,
            retry_delay_base: Duration::from_millis(10),
            mailbox_capacity: 16,
        }
    }

    #[tokio::test]
    async fn submitted_task_is_executed_and_published() {
        let mut adapters = AdapterRegistry::new();
        adapters.register(Platform::Facebook, Arc::new(EchoAdapter));
        let queue: Arc<dyn PersistentQueue> = Arc::new(MemoryQueue::new());
        let supervisor = Supervisor::new(test_config(), queue.clone(), Arc::new(adapters));

        let task = Task::new("t1", TaskKind::PostContent, Some(Platform::Facebook));
        supervisor.submit(task).await.unwrap();

        timeout(Duration::from_secs(2), async {
            loop {
                if queue.head_pop("backend:results").await.unwrap().is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("task result was never published");

        assert_eq!(supervisor.stats().await.processed, 1);
    }

    #[tokio::test]
    async fn unknown_adapter_retries_then_fails_terminally() {
        let queue: Arc<dyn PersistentQueue> = Arc::new(MemoryQueue::new());
        let mut config = test_config();
        config.max_retries = 1;
        let supervisor = Supervisor::new(config, queue.clone(), Arc::new(AdapterRegistry::new()));

        let task = Task::new("t2", TaskKind::PostContent, Some(Platform::Instagram));
        supervisor.submit(task).await.unwrap();

        timeout(Duration::from_secs(2), async {
            loop {
                if queue.head_pop("backend:results").await.unwrap().is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("task never reached a terminal state");

        assert_eq!(supervisor.stats().await.failed, 1);
    }

    #[tokio::test]
    async fn cancel_marks_queued_task_cancelled() {
        let queue: Arc<dyn PersistentQueue> = Arc::new(MemoryQueue::new());
        // num_cores=4 allocates slots only to the 4 remainder-priority
        // platforms (§allocation), so Twitter has no worker slot and the
        // submitted task stays Queued until cancelled.
        let supervisor = Supervisor::new(test_config(), queue, Arc::new(AdapterRegistry::new()));

        let task = Task::new("t3", TaskKind::PostContent, Some(Platform::Twitter));
        supervisor.submit(task).await.unwrap();
        supervisor.cancel("t3").await.unwrap();
        let fetched = supervisor.get_task("t3").await.unwrap();
        assert_eq!(fetched.status, TaskStatus::Cancelled);
    }
}
