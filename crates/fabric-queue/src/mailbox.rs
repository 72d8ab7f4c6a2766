use fabric_types::Task;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("mailbox is closed")]
    Closed,
    #[error("mailbox is full")]
    Full,
}

/// A message delivered to a worker slot: either a task to run, or the
/// shutdown sentinel. Once a consumer observes [`MailboxMessage::Shutdown`]
/// it must perform no further work and acknowledge termination.
#[derive(Debug, Clone)]
pub enum MailboxMessage {
    Task(Task),
    Shutdown,
}

/// A bounded, per-platform FIFO of task records. Built on a `tokio::mpsc`
/// channel, the same primitive the worker control loop uses to receive
/// commands.
pub struct Mailbox;

impl Mailbox {
    /// Create a bounded mailbox with the given capacity, returning its
    /// sender and receiver halves.
    pub fn bounded(capacity: usize) -> (MailboxSender, MailboxReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (MailboxSender { tx }, MailboxReceiver { rx })
    }
}

#[derive(Clone)]
pub struct MailboxSender {
    tx: mpsc::Sender<MailboxMessage>,
}

impl MailboxSender {
    /// Attempt an immediate, non-blocking delivery. Used by the
    /// submission path, which falls back to re-delivery from the
    /// persistent queue if this fails.
    pub fn try_send_task(&self, task: Task) -> Result<(), MailboxError> {
        self.tx.try_send(MailboxMessage::Task(task)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => MailboxError::Full,
            mpsc::error::TrySendError::Closed(_) => MailboxError::Closed,
        })
    }

    /// Deliver a task, waiting for capacity if the mailbox is full.
    pub async fn send_task(&self, task: Task) -> Result<(), MailboxError> {
        self.tx
            .send(MailboxMessage::Task(task))
            .await
            .map_err(|_| MailboxError::Closed)
    }

    /// Enqueue the shutdown sentinel. Delivered FIFO, after any tasks
    /// already queued ahead of it.
    pub async fn send_shutdown(&self) -> Result<(), MailboxError> {
        self.tx
            .send(MailboxMessage::Shutdown)
            .await
            .map_err(|_| MailboxError::Closed)
    }
}

pub struct MailboxReceiver {
    rx: mpsc::Receiver<MailboxMessage>,
}

impl MailboxReceiver {
    pub async fn recv(&mut self) -> Option<MailboxMessage> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_types::{Platform, TaskKind};

    #[tokio::test]
    async fn fifo_delivery_and_shutdown_sentinel() {
        let (tx, mut rx) = Mailbox::bounded(4);
        let t1 = Task::new("t1", TaskKind::PostContent, Some(Platform::Facebook));
        tx.send_task(t1).await.unwrap();
        tx.send_shutdown().await.unwrap();

        match rx.recv().await.unwrap() {
            MailboxMessage::Task(t) => assert_eq!(t.id, "t1"),
            MailboxMessage::Shutdown => panic!("expected task first"),
        }
        assert!(matches!(rx.recv().await.unwrap(), MailboxMessage::Shutdown));
    }

    #[tokio::test]
    async fn try_send_reports_full() {
        let (tx, _rx) = Mailbox::bounded(1);
        let t1 = Task::new("t1", TaskKind::PostContent, Some(Platform::Facebook));
        let t2 = Task::new("t2", TaskKind::PostContent, Some(Platform::Facebook));
        tx.try_send_task(t1).unwrap();
        assert!(matches!(tx.try_send_task(t2), Err(MailboxError::Full)));
    }
}
