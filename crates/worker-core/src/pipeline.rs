use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),
    #[error("generation failed: {0}")]
    Failed(String),
}

/// Result of a single generation call: the opaque payload (base64 images
/// or frames), the seed used, and wall-clock elapsed time.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GenerationOutcome {
    pub payload: Value,
    pub seed: u64,
    pub generation_time_secs: f64,
    pub model_id: String,
}

/// The boundary to the actual GPU model runtime. A real implementation
/// loads diffusion/video pipelines and runs inference; this crate only
/// carries the request/response shape across the control channel and the
/// worker's own HTTP surface.
#[async_trait]
pub trait GenerationPipeline: Send + Sync {
    async fn generate_image(&self, request: Value) -> Result<GenerationOutcome, PipelineError>;
    async fn generate_video(&self, request: Value) -> Result<GenerationOutcome, PipelineError>;
    async fn load_model(&self, model_id: &str, model_type: &str) -> Result<(), PipelineError>;
    async fn unload_model(&self, model_type: &str) -> Result<(), PipelineError>;
}
