//! Local inventory: what the runtime actually has, one adapter per kind.
//!
//! Adapters return the complete current set or an error. There is no partial
//! answer, so a failed fetch can never be mistaken for an empty runtime.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::resources::{LocalResource, ResourceKind};

pub mod adapters;
pub mod agent_client;

pub use adapters::{AgentResource, HttpInventory};
pub use agent_client::AgentClient;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Agent request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Agent returned {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("Malformed agent response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("No inventory adapter registered for {0}")]
    NoAdapter(ResourceKind),
}

#[async_trait]
pub trait InventoryAdapter: Send + Sync {
    fn kind(&self) -> ResourceKind;

    async fn list(&self) -> Result<Vec<LocalResource>, InventoryError>;
}

/// The set of adapters, looked up by kind.
#[derive(Clone, Default)]
pub struct Inventory {
    adapters: HashMap<ResourceKind, Arc<dyn InventoryAdapter>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// One HTTP adapter per kind, all sharing `agent`.
    pub fn http(agent: AgentClient) -> Self {
        use crate::resources::{LocalContainer, LocalDisk, LocalDockerfile, LocalImage, LocalVm};

        Self::new()
            .with_adapter(Arc::new(HttpInventory::<LocalVm>::new(agent.clone())))
            .with_adapter(Arc::new(HttpInventory::<LocalDisk>::new(agent.clone())))
            .with_adapter(Arc::new(HttpInventory::<LocalDockerfile>::new(agent.clone())))
            .with_adapter(Arc::new(HttpInventory::<LocalImage>::new(agent.clone())))
            .with_adapter(Arc::new(HttpInventory::<LocalContainer>::new(agent)))
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn InventoryAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub async fn list(&self, kind: ResourceKind) -> Result<Vec<LocalResource>, InventoryError> {
        let adapter = self.adapters.get(&kind).ok_or(InventoryError::NoAdapter(kind))?;
        adapter.list().await
    }
}
