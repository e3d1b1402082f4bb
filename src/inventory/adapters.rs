use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::debug;

use super::{AgentClient, InventoryAdapter, InventoryError};
use crate::resources::{
    LocalContainer, LocalDisk, LocalDockerfile, LocalImage, LocalResource, LocalVm, ResourceKind,
};

/// A resource type the agent lists at a fixed endpoint.
pub trait AgentResource: DeserializeOwned + Send + Sync + 'static {
    const KIND: ResourceKind;
    const PATH: &'static str;

    fn into_local(self) -> LocalResource;
}

impl AgentResource for LocalVm {
    const KIND: ResourceKind = ResourceKind::Vm;
    const PATH: &'static str = "/api/vms";

    fn into_local(self) -> LocalResource {
        LocalResource::Vm(self)
    }
}

impl AgentResource for LocalDisk {
    const KIND: ResourceKind = ResourceKind::Disk;
    const PATH: &'static str = "/api/disks";

    fn into_local(self) -> LocalResource {
        LocalResource::Disk(self)
    }
}

impl AgentResource for LocalDockerfile {
    const KIND: ResourceKind = ResourceKind::Dockerfile;
    const PATH: &'static str = "/api/dockerfiles";

    fn into_local(self) -> LocalResource {
        LocalResource::Dockerfile(self)
    }
}

impl AgentResource for LocalImage {
    const KIND: ResourceKind = ResourceKind::Image;
    const PATH: &'static str = "/api/images";

    fn into_local(self) -> LocalResource {
        LocalResource::Image(self)
    }
}

impl AgentResource for LocalContainer {
    const KIND: ResourceKind = ResourceKind::Container;
    const PATH: &'static str = "/api/containers";

    fn into_local(self) -> LocalResource {
        LocalResource::Container(self)
    }
}

/// Lists one kind from the agent's JSON array endpoint.
pub struct HttpInventory<R> {
    agent: AgentClient,
    _resource: PhantomData<fn() -> R>,
}

impl<R: AgentResource> HttpInventory<R> {
    pub fn new(agent: AgentClient) -> Self {
        Self {
            agent,
            _resource: PhantomData,
        }
    }
}

#[async_trait]
impl<R: AgentResource> InventoryAdapter for HttpInventory<R> {
    fn kind(&self) -> ResourceKind {
        R::KIND
    }

    async fn list(&self) -> Result<Vec<LocalResource>, InventoryError> {
        let items: Vec<R> = self.agent.get_json(R::PATH).await?;
        debug!(kind = %R::KIND, count = items.len(), "Listed local resources.");
        Ok(items.into_iter().map(R::into_local).collect())
    }
}
