use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use fabric_types::{Payload, Platform, Task, TaskKind};
use manager_core::Supervisor;
use serde::Deserialize;
use uuid::Uuid;

pub fn router(supervisor: Arc<Supervisor>) -> Router {
    Router::new()
        .route("/tasks", post(submit_task))
        .route("/tasks/:id", get(get_task).delete(cancel_task))
        .route("/stats", get(stats))
        .with_state(supervisor)
}

#[derive(Debug, Deserialize)]
struct SubmitTaskRequest {
    #[serde(rename = "type")]
    kind: TaskKind,
    platform: Option<Platform>,
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    brand_id: Option<i64>,
    #[serde(default)]
    payload: Payload,
    #[serde(default)]
    priority: i64,
    /// When set, the task is parked in the scheduler's timer wheel
    /// instead of being dispatched immediately.
    #[serde(default)]
    scheduled_at: Option<DateTime<Utc>>,
}

async fn submit_task(State(supervisor): State<Arc<Supervisor>>, Json(req): Json<SubmitTaskRequest>) -> impl IntoResponse {
    let id = Uuid::new_v4().to_string();
    let mut task = Task::new(id.clone(), req.kind, req.platform);
    task.user_id = req.user_id;
    task.brand_id = req.brand_id;
    task.payload = req.payload;
    task.priority = req.priority;

    if let Some(fire_at) = req.scheduled_at {
        supervisor.schedule(task, fire_at).await;
        return Json(serde_json::json!({"task_id": id, "status": "scheduled"})).into_response();
    }

    match supervisor.submit(task).await {
        Ok(()) => Json(serde_json::json!({"task_id": id, "status": "queued"})).into_response(),
        Err(err) => (axum::http::StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}

async fn get_task(State(supervisor): State<Arc<Supervisor>>, Path(id): Path<String>) -> impl IntoResponse {
    match supervisor.get_task(&id).await {
        Some(task) => Json(task).into_response(),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}

async fn cancel_task(State(supervisor): State<Arc<Supervisor>>, Path(id): Path<String>) -> impl IntoResponse {
    match supervisor.cancel(&id).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(err) => (axum::http::StatusCode::CONFLICT, err.to_string()).into_response(),
    }
}

async fn stats(State(supervisor): State<Arc<Supervisor>>) -> impl IntoResponse {
    Json(supervisor.stats().await)
}
