use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::GpuTelemetry;

/// Frames exchanged over the worker↔pool control channel (§4.3). Tagged
/// by `type` so both ends can dispatch on the same wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Register {
        worker_id: String,
        worker_name: String,
        api_port: Option<u16>,
        gpu_count: u32,
        total_vram_mb: f64,
        supported_models: Vec<String>,
    },
    Ping,
    Pong,
    Status {
        worker_id: String,
        gpu_count: u32,
        total_vram_mb: f64,
        free_vram_mb: f64,
        gpus: Vec<GpuTelemetry>,
        current_task: Option<String>,
    },
    Task {
        task_id: String,
        task_type: String,
        request: Value,
    },
    Cancel {
        task_id: String,
    },
    LoadModel {
        model_id: String,
        model_type: String,
    },
    UnloadModel {
        model_type: String,
    },
    TaskStatus {
        task_id: String,
        status: String,
    },
    TaskResult {
        task_id: String,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_round_trip() {
        let msg = ControlMessage::Ping;
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
        let back: ControlMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ControlMessage::Ping));
    }

    #[test]
    fn unknown_type_fails_to_parse_and_is_dropped_by_caller() {
        let raw = r#"{"type":"unknown_kind"}"#;
        assert!(serde_json::from_str::<ControlMessage>(raw).is_err());
    }
}
