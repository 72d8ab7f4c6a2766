use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fabric_types::TaskStatus;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;
use worker_core::{GenerationPipeline, WorkerState};

#[derive(Clone)]
struct TaskRecord {
    status: TaskStatus,
    result: Option<Value>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct HttpState {
    pub worker: Arc<WorkerState>,
    pub pipeline: Arc<dyn GenerationPipeline>,
    tasks: Arc<Mutex<HashMap<String, TaskRecord>>>,
}

impl HttpState {
    pub fn new(worker: Arc<WorkerState>, pipeline: Arc<dyn GenerationPipeline>) -> Self {
        Self {
            worker,
            pipeline,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/generate/:job_type", post(generate))
        .route("/task/:id", get(get_task).delete(cancel_task))
        .route("/model/load", post(load_model))
        .route("/model/unload", post(unload_model))
        .with_state(state)
}

async fn status(State(state): State<HttpState>) -> impl IntoResponse {
    let gpus = state.worker.gpu_monitor.snapshot().await;
    Json(serde_json::json!({
        "worker_id": state.worker.worker_id,
        "status": if state.worker.current_task().await.is_some() { "busy" } else { "online" },
        "gpu_count": gpus.len(),
        "gpus": gpus,
        "total_vram_gb": state.worker.gpu_monitor.total_vram_mb().await / 1024.0,
        "free_vram_gb": state.worker.gpu_monitor.free_vram_mb().await / 1024.0,
        "current_task": state.worker.current_task().await,
        "tasks_completed": state.worker.tasks_completed(),
        "tasks_failed": state.worker.tasks_failed(),
    }))
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(flatten)]
    request: Value,
}

async fn generate(
    State(state): State<HttpState>,
    Path(job_type): Path<String>,
    Json(body): Json<GenerateRequest>,
) -> impl IntoResponse {
    let task_id = body.task_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    state.tasks.lock().await.insert(
        task_id.clone(),
        TaskRecord { status: TaskStatus::Running, result: None, error: None },
    );
    state.worker.begin_task(task_id.clone()).await;

    let pipeline = state.pipeline.clone();
    let worker = state.worker.clone();
    let tasks = state.tasks.clone();
    let tid = task_id.clone();
    tokio::spawn(async move {
        let outcome = match job_type.as_str() {
            "video" => pipeline.generate_video(body.request).await,
            _ => pipeline.generate_image(body.request).await,
        };
        let record = match outcome {
            Ok(outcome) => {
                worker.finish_task(true).await;
                TaskRecord {
                    status: TaskStatus::Completed,
                    result: serde_json::to_value(&outcome).ok(),
                    error: None,
                }
            }
            Err(err) => {
                worker.finish_task(false).await;
                TaskRecord { status: TaskStatus::Failed, result: None, error: Some(err.to_string()) }
            }
        };
        tasks.lock().await.insert(tid, record);
    });

    Json(serde_json::json!({ "task_id": task_id, "status": "pending" }))
}

async fn get_task(State(state): State<HttpState>, Path(id): Path<String>) -> impl IntoResponse {
    let tasks = state.tasks.lock().await;
    match tasks.get(&id) {
        Some(rec) => Json(serde_json::json!({
            "task_id": id,
            "status": rec.status,
            "result": rec.result,
            "error": rec.error,
        }))
        .into_response(),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}

async fn cancel_task(State(state): State<HttpState>, Path(id): Path<String>) -> impl IntoResponse {
    let mut tasks = state.tasks.lock().await;
    match tasks.get_mut(&id) {
        Some(rec) if rec.status == TaskStatus::Running => {
            rec.status = TaskStatus::Cancelled;
            axum::http::StatusCode::NO_CONTENT.into_response()
        }
        Some(_) => (axum::http::StatusCode::CONFLICT, "task already terminal").into_response(),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ModelRequest {
    model_id: Option<String>,
    #[serde(default = "default_model_type")]
    model_type: String,
}

fn default_model_type() -> String {
    "image".to_string()
}

async fn load_model(State(state): State<HttpState>, Json(body): Json<ModelRequest>) -> impl IntoResponse {
    let Some(model_id) = body.model_id else {
        return axum::http::StatusCode::BAD_REQUEST.into_response();
    };
    match state.pipeline.load_model(&model_id, &body.model_type).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(err) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn unload_model(State(state): State<HttpState>, Json(body): Json<ModelRequest>) -> impl IntoResponse {
    match state.pipeline.unload_model(&body.model_type).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(err) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}
