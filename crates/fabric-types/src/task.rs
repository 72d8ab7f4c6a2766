use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Payload, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    GenerateContent,
    GenerateImage,
    PostContent,
    SchedulePost,
    AnalyzeMetrics,
    MonitorEngagement,
    GenerateVideo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Queued,
    Distributed,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task {id} is terminal ({status:?}) and cannot be mutated")]
    Terminal { id: String, status: TaskStatus },
    #[error("task {id} exceeded max_retries ({max_retries})")]
    RetriesExhausted { id: String, max_retries: u32 },
}

/// Canonical task record (§3 of the design: `id, kind, platform, owner,
/// payload, priority, status, attempts, result/error`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<i64>,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default)]
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub status: TaskStatus,
    #[serde(default, rename = "retries")]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, kind: TaskKind, platform: Option<Platform>) -> Self {
        Task {
            id: id.into(),
            kind,
            platform,
            user_id: None,
            brand_id: None,
            payload: Payload::default(),
            priority: 0,
            created_at: Utc::now(),
            status: TaskStatus::Pending,
            attempts: 0,
            result: None,
            error: None,
        }
    }

    /// Apply a terminal success outcome. Fails if already terminal.
    pub fn complete(&mut self, result: Payload) -> Result<(), TaskError> {
        self.ensure_not_terminal()?;
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.error = None;
        Ok(())
    }

    /// Apply a failure. If `attempts < max_retries`, the task is put back
    /// into `Queued` with `attempts` incremented so the caller can
    /// re-enqueue it; otherwise it becomes terminally `Failed`.
    pub fn fail(&mut self, error: impl Into<String>, max_retries: u32) -> Result<(), TaskError> {
        self.ensure_not_terminal()?;
        self.error = Some(error.into());
        if self.attempts < max_retries {
            self.attempts += 1;
            self.status = TaskStatus::Queued;
        } else {
            self.status = TaskStatus::Failed;
        }
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), TaskError> {
        self.ensure_not_terminal()?;
        self.status = TaskStatus::Cancelled;
        Ok(())
    }

    fn ensure_not_terminal(&self) -> Result<(), TaskError> {
        if self.status.is_terminal() {
            return Err(TaskError::Terminal {
                id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new("t1", TaskKind::GenerateContent, Some(Platform::Twitter))
    }

    #[test]
    fn complete_sets_terminal_status() {
        let mut t = task();
        t.complete(Payload::default()).unwrap();
        assert_eq!(t.status, TaskStatus::Completed);
        assert!(t.complete(Payload::default()).is_err());
    }

    #[test]
    fn fail_retries_until_exhausted() {
        let mut t = task();
        t.fail("boom", 2).unwrap();
        assert_eq!(t.status, TaskStatus::Queued);
        assert_eq!(t.attempts, 1);
        t.fail("boom", 2).unwrap();
        assert_eq!(t.status, TaskStatus::Queued);
        assert_eq!(t.attempts, 2);
        t.fail("boom", 2).unwrap();
        assert_eq!(t.status, TaskStatus::Failed);
    }

    #[test]
    fn zero_max_retries_is_immediately_terminal() {
        let mut t = task();
        t.fail("boom", 0).unwrap();
        assert_eq!(t.status, TaskStatus::Failed);
    }

    #[test]
    fn serde_round_trip() {
        let mut t = task();
        t.priority = 5;
        let json = serde_json::to_string(&t).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, t.id);
        assert_eq!(back.priority, 5);
        assert_eq!(back.status, TaskStatus::Pending);
    }
}
