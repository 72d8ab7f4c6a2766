use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use fabric_types::TaskStatus;
use futures_util::{SinkExt, StreamExt};
use pool_core::PoolEngine;
use pool_types::{ControlMessage, DistributedJob, DistributionMode, JobType, WorkerNode, WorkerStatus};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

pub fn router(engine: Arc<PoolEngine>) -> Router {
    Router::new()
        .route("/jobs", post(submit_job))
        .route("/jobs/:id", get(get_job).delete(cancel_job))
        .route("/stats", get(stats))
        .route("/ws/worker", get(ws_worker))
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
struct SubmitJobRequest {
    #[serde(rename = "type")]
    job_type: JobType,
    request: Value,
    #[serde(default)]
    priority: i64,
    #[serde(default = "default_mode")]
    mode: DistributionMode,
    #[serde(default)]
    callback: Option<String>,
}

fn default_mode() -> DistributionMode {
    DistributionMode::Auto
}

async fn submit_job(State(engine): State<Arc<PoolEngine>>, Json(req): Json<SubmitJobRequest>) -> impl IntoResponse {
    let id = Uuid::new_v4().to_string();
    let job = DistributedJob {
        id: id.clone(),
        job_type: req.job_type,
        request: req.request,
        priority: req.priority,
        mode: req.mode,
        status: TaskStatus::Pending,
        assigned_workers: vec![],
        subtasks: vec![],
        aggregated_result: None,
        error: None,
        created_at: Utc::now(),
        callback: req.callback,
    };
    engine.distributor.submit(job).await;
    Json(serde_json::json!({"task_id": id, "status": "pending"}))
}

async fn get_job(State(engine): State<Arc<PoolEngine>>, Path(id): Path<String>) -> impl IntoResponse {
    match engine.distributor.get_job(&id).await {
        Some(job) => Json(job).into_response(),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}

async fn cancel_job(State(engine): State<Arc<PoolEngine>>, Path(id): Path<String>) -> impl IntoResponse {
    match engine.distributor.cancel(&id).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(err) => (axum::http::StatusCode::CONFLICT, err.to_string()).into_response(),
    }
}

async fn stats(State(engine): State<Arc<PoolEngine>>) -> impl IntoResponse {
    let jobs_in_queue = engine.distributor.jobs_in_queue().await;
    let completed = engine.distributor.completed_count().await;
    let failed = engine.distributor.failed_count().await;
    let stats = engine.registry.stats(jobs_in_queue, completed, failed).await;
    Json(stats)
}

async fn ws_worker(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(engine): State<Arc<PoolEngine>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_worker_socket(socket, addr, engine))
}

async fn handle_worker_socket(socket: WebSocket, addr: SocketAddr, engine: Arc<PoolEngine>) {
    let (mut sink, mut stream) = socket.split();

    let first = match stream.next().await {
        Some(Ok(Message::Text(text))) => text,
        _ => return,
    };
    let worker_id = match serde_json::from_str::<ControlMessage>(&first) {
        Ok(ControlMessage::Register {
            worker_id,
            worker_name,
            api_port,
            gpu_count,
            total_vram_mb,
            supported_models: _,
        }) => {
            let port = api_port.unwrap_or(addr.port());
            let mut node = WorkerNode::new(worker_id.clone(), worker_name, addr.ip().to_string(), port);
            node.gpu_count = gpu_count;
            node.total_vram_gb = total_vram_mb / 1024.0;
            node.status = WorkerStatus::Online;
            node.last_heartbeat = Utc::now();
            engine.registry.register(node).await;
            worker_id
        }
        _ => {
            warn!(peer = %addr, "worker socket did not register first");
            return;
        }
    };

    let mut outbound = engine.hub.connect(worker_id.clone()).await;
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else { continue };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        let Ok(Message::Text(text)) = frame else { continue };
        match serde_json::from_str::<ControlMessage>(&text) {
            Ok(ControlMessage::Status {
                worker_id: _,
                gpu_count,
                total_vram_mb,
                free_vram_mb,
                gpus: _,
                current_task,
            }) => {
                if let Err(err) = engine.registry.touch_heartbeat(&worker_id).await {
                    warn!(worker = %worker_id, error = %err, "heartbeat for unknown worker");
                    continue;
                }
                if let Some(mut node) = engine.registry.get(&worker_id).await {
                    node.gpu_count = gpu_count;
                    node.total_vram_gb = total_vram_mb / 1024.0;
                    node.free_vram_gb = free_vram_mb / 1024.0;
                    node.current_task = current_task;
                    node.status = if node.current_task.is_some() { WorkerStatus::Busy } else { WorkerStatus::Online };
                    engine.registry.register(node).await;
                }
            }
            Ok(ControlMessage::TaskResult { task_id, status, result, error }) => {
                let status = parse_status(&status);
                if let Some(job) = find_parent_job(&engine, &task_id).await {
                    if job.id == task_id {
                        let _ = engine.distributor.record_job_result(&job.id, status, result, error).await;
                    } else {
                        let _ = engine
                            .distributor
                            .record_subtask_result(&job.id, &task_id, status, result, error)
                            .await;
                    }
                }
            }
            Ok(ControlMessage::Pong) | Ok(ControlMessage::TaskStatus { .. }) => {}
            Ok(other) => {
                warn!(worker = %worker_id, ?other, "unexpected frame from worker, dropping");
            }
            Err(err) => {
                warn!(worker = %worker_id, error = %err, "malformed control frame, dropping");
            }
        }
    }

    engine.hub.disconnect(&worker_id).await;
    writer.abort();
    info!(worker = %worker_id, "worker control channel closed");
}

fn parse_status(s: &str) -> TaskStatus {
    match s {
        "completed" => TaskStatus::Completed,
        "failed" => TaskStatus::Failed,
        "cancelled" => TaskStatus::Cancelled,
        "running" => TaskStatus::Running,
        _ => TaskStatus::Failed,
    }
}

/// A `task_id` may name either a parent job or one of its subtasks
/// (`<parent_id>_part<i>`); look up whichever job it belongs to.
async fn find_parent_job(engine: &PoolEngine, task_id: &str) -> Option<DistributedJob> {
    if let Some(job) = engine.distributor.get_job(task_id).await {
        return Some(job);
    }
    let parent_id = task_id.rsplit_once("_part")?.0;
    engine.distributor.get_job(parent_id).await
}
