use std::sync::Arc;

use chrono::Utc;
use fabric_queue::{MailboxMessage, MailboxReceiver};
use fabric_types::{Platform, Task, TaskKind};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::adapter::AdapterError;
use crate::adapter_registry::AdapterRegistry;

/// Outcome of one task execution, reported back to the collector. `retry`
/// is set when the task was put back into `Queued` by `Task::fail` and
/// still needs to be re-delivered to a mailbox.
pub struct WorkerResult {
    pub task: Task,
    pub retry: bool,
}

/// A single supervised worker: one per allocated slot. The mailbox
/// receiver is shared behind a mutex so a respawned slot can keep
/// draining the same channel a dead one was reading from — queued
/// messages are never lost on restart.
pub struct WorkerSlot {
    pub platform: Platform,
    pub slot_id: usize,
    mailbox_rx: Arc<Mutex<MailboxReceiver>>,
    adapters: Arc<AdapterRegistry>,
    results_tx: mpsc::Sender<WorkerResult>,
    max_retries: u32,
    handle: JoinHandle<()>,
}

impl WorkerSlot {
    pub fn spawn(
        platform: Platform,
        slot_id: usize,
        mailbox_rx: Arc<Mutex<MailboxReceiver>>,
        adapters: Arc<AdapterRegistry>,
        results_tx: mpsc::Sender<WorkerResult>,
        max_retries: u32,
    ) -> Self {
        let handle = spawn_loop(
            platform,
            slot_id,
            mailbox_rx.clone(),
            adapters.clone(),
            results_tx.clone(),
            max_retries,
        );
        Self { platform, slot_id, mailbox_rx, adapters, results_tx, max_retries, handle }
    }

    pub fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Replace a dead task with a fresh one reusing the same mailbox.
    pub fn respawn(&mut self) {
        warn!(platform = %self.platform, slot_id = self.slot_id, "worker slot died, respawning");
        self.handle = spawn_loop(
            self.platform,
            self.slot_id,
            self.mailbox_rx.clone(),
            self.adapters.clone(),
            self.results_tx.clone(),
            self.max_retries,
        );
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

fn spawn_loop(
    platform: Platform,
    slot_id: usize,
    mailbox_rx: Arc<Mutex<MailboxReceiver>>,
    adapters: Arc<AdapterRegistry>,
    results_tx: mpsc::Sender<WorkerResult>,
    max_retries: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let msg = {
                let mut rx = mailbox_rx.lock().await;
                rx.recv().await
            };
            match msg {
                Some(MailboxMessage::Task(mut task)) => {
                    let outcome = execute(&adapters, &task).await;
                    let retry = match outcome {
                        Ok(payload) => {
                            let _ = task.complete(payload);
                            false
                        }
                        Err(err) => {
                            let before = task.attempts;
                            let _ = task.fail(err.to_string(), max_retries);
                            task.attempts > before && task.status == fabric_types::TaskStatus::Queued
                        }
                    };
                    if results_tx.send(WorkerResult { task, retry }).await.is_err() {
                        break;
                    }
                }
                Some(MailboxMessage::Shutdown) => {
                    info!(platform = %platform, slot_id, "worker slot shutting down");
                    break;
                }
                None => break,
            }
        }
    })
}

async fn execute(adapters: &AdapterRegistry, task: &Task) -> Result<fabric_types::Payload, AdapterError> {
    let Some(platform) = task.platform else {
        return Err(AdapterError::NotImplemented);
    };
    let adapter = adapters.get(platform);
    match task.kind {
        TaskKind::PostContent => adapter.post_content(task).await,
        TaskKind::SchedulePost => adapter.schedule_post(task, Utc::now()).await,
        TaskKind::AnalyzeMetrics | TaskKind::MonitorEngagement => adapter.get_metrics(task).await,
        TaskKind::GenerateContent | TaskKind::GenerateImage | TaskKind::GenerateVideo => {
            Err(AdapterError::NotImplemented)
        }
    }
}
