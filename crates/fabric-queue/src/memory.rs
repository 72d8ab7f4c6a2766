use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::queue::{PersistentQueue, QueueError};

/// In-memory `PersistentQueue` used by tests and by standalone/dev runs
/// with no Redis configured.
#[derive(Default)]
pub struct MemoryQueue {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    scalars: Mutex<HashMap<String, String>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistentQueue for MemoryQueue {
    async fn tail_push(&self, key: &str, value: &str) -> Result<(), QueueError> {
        let mut lists = self.lists.lock().expect("memory queue lock poisoned");
        lists.entry(key.to_string()).or_default().push_back(value.to_string());
        Ok(())
    }

    async fn head_pop(&self, key: &str) -> Result<Option<String>, QueueError> {
        let mut lists = self.lists.lock().expect("memory queue lock poisoned");
        Ok(lists.get_mut(key).and_then(|q| q.pop_front()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), QueueError> {
        let mut scalars = self.scalars.lock().expect("memory queue lock poisoned");
        scalars.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, QueueError> {
        let scalars = self.scalars.lock().expect("memory queue lock poisoned");
        Ok(scalars.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_ordering() {
        let q = MemoryQueue::new();
        q.tail_push("k", "a").await.unwrap();
        q.tail_push("k", "b").await.unwrap();
        assert_eq!(q.head_pop("k").await.unwrap(), Some("a".to_string()));
        assert_eq!(q.head_pop("k").await.unwrap(), Some("b".to_string()));
        assert_eq!(q.head_pop("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn scalar_set_get() {
        let q = MemoryQueue::new();
        assert_eq!(q.get("stats").await.unwrap(), None);
        q.set("stats", "{}").await.unwrap();
        assert_eq!(q.get("stats").await.unwrap(), Some("{}".to_string()));
    }
}
