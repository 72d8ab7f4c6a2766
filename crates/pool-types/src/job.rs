use chrono::{DateTime, Utc};
use fabric_types::TaskStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Image,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    /// One job, one worker.
    Parallel,
    /// One job split across every available worker.
    Combined,
    /// Choose parallel or combined based on estimated VRAM requirement.
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskRecord {
    pub id: String,
    pub worker_id: String,
    pub batch_size: u32,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A job submitted to the pool for GPU execution (§3: `id, type, request,
/// priority, mode, status, assigned_workers, subtasks, aggregated_result,
/// error`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributedJob {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub request: Value,
    #[serde(default)]
    pub priority: i64,
    pub mode: DistributionMode,
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_workers: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<SubtaskRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregated_result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

impl DistributedJob {
    pub fn batch_size(&self) -> u32 {
        self.request
            .get("batch_size")
            .and_then(Value::as_u64)
            .map(|n| n as u32)
            .unwrap_or(1)
    }

    pub fn model_id(&self) -> &str {
        self.request.get("model_id").and_then(Value::as_str).unwrap_or("")
    }

    pub fn requires_large_vram(&self) -> bool {
        self.request
            .get("requires_large_vram")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Mark every subtask resolved and compute the job's final status: it
    /// is `Completed` iff every subtask is `Completed`, otherwise `Failed`
    /// with the first encountered error surfaced.
    pub fn try_finalize(&mut self) -> bool {
        if self.subtasks.is_empty() {
            return false;
        }
        if !self.subtasks.iter().all(|s| s.status.is_terminal()) {
            return false;
        }

        let all_ok = self.subtasks.iter().all(|s| s.status == TaskStatus::Completed);
        if all_ok {
            let combined: Vec<Value> = self
                .subtasks
                .iter()
                .map(|s| s.result.clone().unwrap_or(Value::Null))
                .collect();
            self.aggregated_result = Some(Value::Array(combined));
            self.status = TaskStatus::Completed;
        } else {
            self.error = self
                .subtasks
                .iter()
                .find(|s| s.status == TaskStatus::Failed)
                .and_then(|s| s.error.clone());
            self.status = TaskStatus::Failed;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job_with_subtasks(statuses: &[(TaskStatus, Option<Value>)]) -> DistributedJob {
        let subtasks = statuses
            .iter()
            .enumerate()
            .map(|(i, (status, result))| SubtaskRecord {
                id: format!("j1_part{i}"),
                worker_id: format!("w{i}"),
                batch_size: 1,
                status: *status,
                result: result.clone(),
                error: if *status == TaskStatus::Failed {
                    Some("boom".into())
                } else {
                    None
                },
            })
            .collect();

        DistributedJob {
            id: "j1".into(),
            job_type: JobType::Image,
            request: json!({"batch_size": statuses.len()}),
            priority: 0,
            mode: DistributionMode::Combined,
            status: TaskStatus::Distributed,
            assigned_workers: vec![],
            subtasks,
            aggregated_result: None,
            error: None,
            created_at: Utc::now(),
            callback: None,
        }
    }

    #[test]
    fn finalizes_completed_when_all_subtasks_complete() {
        let mut job = job_with_subtasks(&[
            (TaskStatus::Completed, Some(json!("a"))),
            (TaskStatus::Completed, Some(json!("b"))),
        ]);
        assert!(job.try_finalize());
        assert_eq!(job.status, TaskStatus::Completed);
        assert_eq!(job.aggregated_result, Some(json!(["a", "b"])));
    }

    #[test]
    fn finalizes_failed_when_any_subtask_fails() {
        let mut job = job_with_subtasks(&[
            (TaskStatus::Completed, Some(json!("a"))),
            (TaskStatus::Failed, None),
        ]);
        assert!(job.try_finalize());
        assert_eq!(job.status, TaskStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn does_not_finalize_while_subtasks_pending() {
        let mut job = job_with_subtasks(&[(TaskStatus::Running, None)]);
        assert!(!job.try_finalize());
    }
}
