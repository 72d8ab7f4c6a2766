use std::time::Duration;

use pool_types::WorkerNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub gpu_count: u32,
    #[serde(default)]
    pub total_vram_gb: f64,
    #[serde(default)]
    pub free_vram_gb: f64,
    #[serde(default)]
    pub current_task: Option<String>,
    #[serde(default)]
    pub tasks_completed: u64,
    #[serde(default)]
    pub tasks_failed: u64,
}

#[derive(Debug, Serialize)]
struct DispatchRequest<'a> {
    task_id: &'a str,
    #[serde(flatten)]
    request: &'a Value,
}

#[derive(Debug, Deserialize)]
pub struct DispatchAck {
    pub task_id: String,
    pub status: String,
}

/// Thin RPC client to a single worker node's HTTP surface (`GET /status`,
/// `POST /generate/{image|video}`).
pub struct WorkerClient {
    http: reqwest::Client,
}

impl WorkerClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    pub async fn fetch_status(&self, node: &WorkerNode) -> anyhow::Result<StatusResponse> {
        let url = format!("{}/status", node.url());
        let res = self.http.get(url).timeout(STATUS_TIMEOUT).send().await?;
        if !res.status().is_success() {
            anyhow::bail!("http {}: status probe failed", res.status());
        }
        Ok(res.json().await?)
    }

    pub async fn dispatch(
        &self,
        node: &WorkerNode,
        job_type: &str,
        task_id: &str,
        request: &Value,
    ) -> anyhow::Result<DispatchAck> {
        let url = format!("{}/generate/{job_type}", node.url());
        let res = self
            .http
            .post(url)
            .timeout(DISPATCH_TIMEOUT)
            .json(&DispatchRequest { task_id, request })
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("http {status}: {body}");
        }
        Ok(res.json().await?)
    }
}

impl Default for WorkerClient {
    fn default() -> Self {
        Self::new()
    }
}
