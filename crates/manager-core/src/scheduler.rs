use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fabric_types::Task;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

struct Entry {
    fire_at: DateTime<Utc>,
    task: Task,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at
    }
}
impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the soonest fire_at on top.
        other.fire_at.cmp(&self.fire_at)
    }
}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deferred-submit timer wheel backing `schedule_post`. Tasks pushed with
/// a future `fire_at` are handed back over `due_rx` once their time
/// arrives, in fire-order.
pub struct Scheduler {
    heap: Mutex<BinaryHeap<Entry>>,
    wake: Notify,
    due_tx: mpsc::UnboundedSender<Task>,
}

impl Scheduler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Task>) {
        let (due_tx, due_rx) = mpsc::unbounded_channel();
        let scheduler = Arc::new(Self { heap: Mutex::new(BinaryHeap::new()), wake: Notify::new(), due_tx });
        (scheduler, due_rx)
    }

    pub async fn schedule(&self, task: Task, fire_at: DateTime<Utc>) {
        self.heap.lock().await.push(Entry { fire_at, task });
        self.wake.notify_one();
    }

    pub async fn run(self: Arc<Self>, shutdown: Arc<Notify>) {
        loop {
            let next_wait = {
                let heap = self.heap.lock().await;
                heap.peek().map(|e| e.fire_at)
            };

            let sleep_for = match next_wait {
                Some(fire_at) => {
                    let delta = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                    Instant::now() + delta
                }
                None => Instant::now() + Duration::from_secs(3600),
            };

            tokio::select! {
                _ = sleep_until(sleep_for) => {}
                _ = self.wake.notified() => continue,
                _ = shutdown.notified() => return,
            }

            let due = {
                let mut heap = self.heap.lock().await;
                let mut due = Vec::new();
                let now = Utc::now();
                while let Some(entry) = heap.peek() {
                    if entry.fire_at <= now {
                        due.push(heap.pop().unwrap().task);
                    } else {
                        break;
                    }
                }
                due
            };

            for task in due {
                debug!(task_id = %task.id, "scheduled task is due");
                if self.due_tx.send(task).is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_types::TaskKind;

    #[tokio::test]
    async fn entries_fire_in_time_order() {
        let (scheduler, mut due_rx) = Scheduler::new();
        let shutdown = Arc::new(Notify::new());

        let now = Utc::now();
        scheduler
            .schedule(Task::new("later", TaskKind::SchedulePost, None), now + chrono::Duration::milliseconds(40))
            .await;
        scheduler
            .schedule(Task::new("sooner", TaskKind::SchedulePost, None), now + chrono::Duration::milliseconds(10))
            .await;

        let run_handle = tokio::spawn(scheduler.clone().run(shutdown.clone()));

        let first = due_rx.recv().await.unwrap();
        let second = due_rx.recv().await.unwrap();
        assert_eq!(first.id, "sooner");
        assert_eq!(second.id, "later");

        shutdown.notify_waiters();
        run_handle.abort();
    }
}
