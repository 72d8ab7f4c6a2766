use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use worker_core::{GenerationOutcome, GenerationPipeline, PipelineError};

/// A no-op pipeline standing in for the real diffusion/video model
/// runtime. Reports the request back as its own payload so the control
/// and HTTP surfaces can be exercised without a GPU.
pub struct StubPipeline {
    loaded_image_model: Mutex<Option<String>>,
    loaded_video_model: Mutex<Option<String>>,
}

impl StubPipeline {
    pub fn new() -> Self {
        Self {
            loaded_image_model: Mutex::new(None),
            loaded_video_model: Mutex::new(None),
        }
    }
}

impl Default for StubPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationPipeline for StubPipeline {
    async fn generate_image(&self, request: Value) -> Result<GenerationOutcome, PipelineError> {
        let model_id = self
            .loaded_image_model
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "stub-image".to_string());
        Ok(GenerationOutcome {
            payload: json!({ "echo": request }),
            seed: 0,
            generation_time_secs: 0.0,
            model_id,
        })
    }

    async fn generate_video(&self, request: Value) -> Result<GenerationOutcome, PipelineError> {
        let model_id = self
            .loaded_video_model
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "stub-video".to_string());
        Ok(GenerationOutcome {
            payload: json!({ "echo": request }),
            seed: 0,
            generation_time_secs: 0.0,
            model_id,
        })
    }

    async fn load_model(&self, model_id: &str, model_type: &str) -> Result<(), PipelineError> {
        match model_type {
            "video" => *self.loaded_video_model.lock().unwrap() = Some(model_id.to_string()),
            _ => *self.loaded_image_model.lock().unwrap() = Some(model_id.to_string()),
        }
        Ok(())
    }

    async fn unload_model(&self, model_type: &str) -> Result<(), PipelineError> {
        match model_type {
            "video" => *self.loaded_video_model.lock().unwrap() = None,
            _ => *self.loaded_image_model.lock().unwrap() = None,
        }
        Ok(())
    }
}
