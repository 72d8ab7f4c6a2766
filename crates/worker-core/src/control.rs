use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use pool_types::ControlMessage;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{error, info, warn};

type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

use crate::pipeline::GenerationPipeline;
use crate::state::WorkerState;

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(5);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Maintains the worker's control-channel connection to the pool,
/// reconnecting with exponential backoff on any channel error.
pub struct ControlClient {
    ws_url: String,
    heartbeat_period: Duration,
    state: Arc<WorkerState>,
    pipeline: Arc<dyn GenerationPipeline>,
}

impl ControlClient {
    pub fn new(
        ws_url: impl Into<String>,
        heartbeat_period: Duration,
        state: Arc<WorkerState>,
        pipeline: Arc<dyn GenerationPipeline>,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            heartbeat_period,
            state,
            pipeline,
        }
    }

    pub async fn run(self: Arc<Self>, shutdown: Arc<Notify>) {
        let mut delay = INITIAL_RECONNECT_DELAY;

        loop {
            tokio::select! {
                _ = shutdown.notified() => return,
                result = self.connect_and_serve(shutdown.clone()) => {
                    match result {
                        Ok(()) => {
                            info!("control channel closed cleanly");
                            delay = INITIAL_RECONNECT_DELAY;
                        }
                        Err(err) => {
                            warn!(error = %err, "control channel error");
                        }
                    }
                }
            }

            info!(delay_secs = delay.as_secs(), "reconnecting to pool");
            tokio::select! {
                _ = shutdown.notified() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = (delay * 2).min(MAX_RECONNECT_DELAY);
        }
    }

    async fn connect_and_serve(&self, shutdown: Arc<Notify>) -> anyhow::Result<()> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(&self.ws_url).await?;
        let (mut sink, mut stream) = ws_stream.split();

        let register = serde_json::to_string(&self.state.register_frame().await)?;
        sink.send(Message::Text(register)).await?;
        info!(worker = %self.state.worker_id, "registered with pool");

        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<ControlMessage>();
        let writer = tokio::spawn(async move {
            while let Some(msg) = writer_rx.recv().await {
                let Ok(text) = serde_json::to_string(&msg) else { continue };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        let heartbeat = {
            let state = self.state.clone();
            let tx = writer_tx.clone();
            let period = self.heartbeat_period;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    let status = state.status_frame().await;
                    if tx.send(status).is_err() {
                        return;
                    }
                }
            })
        };

        let result = self.read_loop(&mut stream, writer_tx, shutdown).await;
        heartbeat.abort();
        writer.abort();
        result
    }

    async fn read_loop(
        &self,
        stream: &mut WsStream,
        writer_tx: mpsc::UnboundedSender<ControlMessage>,
        shutdown: Arc<Notify>,
    ) -> anyhow::Result<()> {
        loop {
            let frame = tokio::select! {
                _ = shutdown.notified() => return Ok(()),
                frame = stream.next() => frame,
            };

            let Some(frame) = frame else { return Ok(()) };
            let msg = frame?;
            let Message::Text(text) = msg else { continue };

            match serde_json::from_str::<ControlMessage>(&text) {
                Ok(ControlMessage::Ping) => {
                    let _ = writer_tx.send(ControlMessage::Pong);
                }
                Ok(ControlMessage::Task { task_id, task_type, request }) => {
                    self.spawn_task(task_id, task_type, request, writer_tx.clone());
                }
                Ok(ControlMessage::Cancel { task_id }) => {
                    info!(task = %task_id, "cancel requested (best-effort)");
                }
                Ok(ControlMessage::LoadModel { model_id, model_type }) => {
                    if let Err(err) = self.pipeline.load_model(&model_id, &model_type).await {
                        error!(model = %model_id, error = %err, "failed to load model");
                    }
                }
                Ok(ControlMessage::UnloadModel { model_type }) => {
                    if let Err(err) = self.pipeline.unload_model(&model_type).await {
                        error!(error = %err, "failed to unload model");
                    }
                }
                Ok(other) => {
                    warn!(?other, "unexpected frame from pool, dropping");
                }
                Err(err) => {
                    error!(error = %err, raw = %text, "malformed control frame, dropping");
                }
            }
        }
    }

    /// Runs a dispatched job off the reader path so a long-running
    /// generation never blocks the control-channel read loop.
    fn spawn_task(
        &self,
        task_id: String,
        task_type: String,
        request: serde_json::Value,
        writer_tx: mpsc::UnboundedSender<ControlMessage>,
    ) {
        let state = self.state.clone();
        let pipeline = self.pipeline.clone();

        tokio::spawn(async move {
            state.begin_task(task_id.clone()).await;
            let _ = writer_tx.send(ControlMessage::TaskStatus {
                task_id: task_id.clone(),
                status: "running".to_string(),
            });

            let outcome = match task_type.as_str() {
                "image" => pipeline.generate_image(request).await,
                "video" => pipeline.generate_video(request).await,
                other => Err(crate::pipeline::PipelineError::Failed(format!("unknown task type: {other}"))),
            };

            let result_frame = match outcome {
                Ok(outcome) => {
                    state.finish_task(true).await;
                    ControlMessage::TaskResult {
                        task_id,
                        status: "completed".to_string(),
                        result: serde_json::to_value(&outcome).ok(),
                        error: None,
                    }
                }
                Err(err) => {
                    state.finish_task(false).await;
                    ControlMessage::TaskResult {
                        task_id,
                        status: "failed".to_string(),
                        result: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            let _ = writer_tx.send(result_frame);
        });
    }
}
