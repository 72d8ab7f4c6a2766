use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabric_types::{Payload, Platform, Task};

use crate::adapter::{AdapterError, PlatformAdapter};

/// Maps a platform tag to its concrete adapter. Platforms with no
/// registered adapter fall back to [`UnimplementedAdapter`], which
/// reports `AdapterError::NotImplemented` rather than panicking.
pub struct AdapterRegistry {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
    fallback: Arc<dyn PlatformAdapter>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            fallback: Arc::new(UnimplementedAdapter),
        }
    }

    pub fn register(&mut self, platform: Platform, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(platform, adapter);
    }

    pub fn get(&self, platform: Platform) -> Arc<dyn PlatformAdapter> {
        self.adapters.get(&platform).cloned().unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct UnimplementedAdapter;

#[async_trait]
impl PlatformAdapter for UnimplementedAdapter {
    async fn authenticate(&self) -> Result<(), AdapterError> {
        Err(AdapterError::NotImplemented)
    }

    async fn post_content(&self, _task: &Task) -> Result<Payload, AdapterError> {
        Err(AdapterError::NotImplemented)
    }

    async fn schedule_post(&self, _task: &Task, _at: DateTime<Utc>) -> Result<Payload, AdapterError> {
        Err(AdapterError::NotImplemented)
    }

    async fn get_metrics(&self, _task: &Task) -> Result<Payload, AdapterError> {
        Err(AdapterError::NotImplemented)
    }

    async fn delete_post(&self, _post_id: &str) -> Result<(), AdapterError> {
        Err(AdapterError::NotImplemented)
    }
}
