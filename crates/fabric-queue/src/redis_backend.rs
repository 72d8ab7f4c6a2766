use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::queue::{PersistentQueue, QueueError};

/// Redis-backed `PersistentQueue`. Lists map directly onto Redis lists
/// (`RPUSH`/`LPOP`); scalars map onto plain `SET`/`GET`.
pub struct RedisQueue {
    conn: ConnectionManager,
}

impl RedisQueue {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl PersistentQueue for RedisQueue {
    async fn tail_push(&self, key: &str, value: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(key, value)
            .await
            .map_err(|e| QueueError::Backend(e.into()))
    }

    async fn head_pop(&self, key: &str) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn.clone();
        conn.lpop(key, None)
            .await
            .map_err(|e| QueueError::Backend(e.into()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| QueueError::Backend(e.into()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| QueueError::Backend(e.into()))
    }
}
