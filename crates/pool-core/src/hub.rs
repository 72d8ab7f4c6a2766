use std::collections::HashMap;

use pool_types::ControlMessage;
use tokio::sync::{mpsc, Mutex};

use crate::errors::PoolError;

/// Registry of live control-channel senders, one per connected worker,
/// used to push `cancel` / `load_model` / `unload_model` frames out-of-band
/// from whichever HTTP handler triggered them.
#[derive(Default)]
pub struct ControlHub {
    senders: Mutex<HashMap<String, mpsc::UnboundedSender<ControlMessage>>>,
}

impl ControlHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, worker_id: String) -> mpsc::UnboundedReceiver<ControlMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().await.insert(worker_id, tx);
        rx
    }

    pub async fn disconnect(&self, worker_id: &str) {
        self.senders.lock().await.remove(worker_id);
    }

    pub async fn send(&self, worker_id: &str, msg: ControlMessage) -> Result<(), PoolError> {
        let senders = self.senders.lock().await;
        let tx = senders
            .get(worker_id)
            .ok_or_else(|| PoolError::UnknownWorker(worker_id.to_string()))?;
        tx.send(msg)
            .map_err(|_| PoolError::UnknownWorker(worker_id.to_string()))
    }
}
