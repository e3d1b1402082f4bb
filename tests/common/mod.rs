#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use vmconsole::catalog::memory::MemoryCatalog;
use vmconsole::catalog::{CatalogError, CatalogRow, CatalogScope, CatalogStore, NewCatalogRow};
use vmconsole::inventory::{InventoryAdapter, InventoryError};
use vmconsole::resources::{
    AttributeSet, LocalContainer, LocalDisk, LocalDockerfile, LocalImage, LocalResource, LocalVm,
    ResourceKind,
};

pub fn disk(id: &str, size_gb: i64) -> LocalResource {
    LocalResource::Disk(LocalDisk {
        id: id.to_string(),
        size_gb,
    })
}

pub fn vm(id: &str, name: &str, cores: i32, status: &str) -> LocalResource {
    LocalResource::Vm(LocalVm {
        id: id.to_string(),
        name: name.to_string(),
        cores,
        memory_mb: 2048,
        status: status.to_string(),
        disk_path: Some(format!("/var/lib/vms/{name}.qcow2")),
        iso_path: None,
    })
}

pub fn dockerfile(name: &str, path: &str, content: &str) -> LocalResource {
    LocalResource::Dockerfile(LocalDockerfile {
        name: name.to_string(),
        path: path.to_string(),
        content: content.to_string(),
    })
}

pub fn image(id: &str, repository: &str, tag: &str) -> LocalResource {
    LocalResource::Image(LocalImage {
        id: id.to_string(),
        repository: Some(repository.to_string()),
        tag: Some(tag.to_string()),
        size_bytes: Some(1024),
    })
}

pub fn container(id: &str, name: &str, status: &str) -> LocalResource {
    LocalResource::Container(LocalContainer {
        id: id.to_string(),
        name: name.to_string(),
        image: "nginx:latest".to_string(),
        status: status.to_string(),
    })
}

/// An adapter returning a fixed list, or failing, as the test decides.
pub struct FakeAdapter {
    kind: ResourceKind,
    state: Mutex<Result<Vec<LocalResource>, u16>>,
}

impl FakeAdapter {
    pub fn new(kind: ResourceKind, resources: Vec<LocalResource>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: Mutex::new(Ok(resources)),
        })
    }

    pub fn failing(kind: ResourceKind, status: u16) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: Mutex::new(Err(status)),
        })
    }

    pub fn set(&self, resources: Vec<LocalResource>) {
        *self.state.lock().unwrap() = Ok(resources);
    }
}

#[async_trait]
impl InventoryAdapter for FakeAdapter {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn list(&self) -> Result<Vec<LocalResource>, InventoryError> {
        match &*self.state.lock().unwrap() {
            Ok(resources) => Ok(resources.clone()),
            Err(status) => Err(InventoryError::Status {
                url: format!("fake://{}", self.kind),
                status: *status,
                body: "agent unavailable".to_string(),
            }),
        }
    }
}

/// Wraps a [`MemoryCatalog`] and fails selected operations.
#[derive(Default)]
pub struct FlakyCatalog {
    pub inner: MemoryCatalog,
    failing_updates: Mutex<HashSet<i32>>,
    failing_deletes: Mutex<HashSet<i32>>,
    failing_lists: Mutex<HashSet<ResourceKind>>,
    writes: Mutex<Vec<String>>,
}

impl FlakyCatalog {
    pub fn fail_update(&self, row_id: i32) {
        self.failing_updates.lock().unwrap().insert(row_id);
    }

    pub fn fail_delete(&self, row_id: i32) {
        self.failing_deletes.lock().unwrap().insert(row_id);
    }

    pub fn fail_list(&self, kind: ResourceKind) {
        self.failing_lists.lock().unwrap().insert(kind);
    }

    /// Successful writes, as `create:<key>`, `update:<row id>`, `delete:<row id>`.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogStore for FlakyCatalog {
    async fn list(&self, scope: CatalogScope) -> Result<Vec<CatalogRow>, CatalogError> {
        if self.failing_lists.lock().unwrap().contains(&scope.kind) {
            return Err(CatalogError::Unavailable("metadata store timed out".into()));
        }
        self.inner.list(scope).await
    }

    async fn create(&self, scope: CatalogScope, row: NewCatalogRow) -> Result<CatalogRow, CatalogError> {
        let key = row.key.canonical();
        let created = self.inner.create(scope, row).await?;
        self.writes.lock().unwrap().push(format!("create:{key}"));
        Ok(created)
    }

    async fn update(&self, scope: CatalogScope, row_id: i32, changes: &AttributeSet) -> Result<(), CatalogError> {
        if self.failing_updates.lock().unwrap().contains(&row_id) {
            return Err(CatalogError::Unavailable(format!("update of {row_id} rejected")));
        }
        self.inner.update(scope, row_id, changes).await?;
        self.writes.lock().unwrap().push(format!("update:{row_id}"));
        Ok(())
    }

    async fn delete(&self, scope: CatalogScope, row_id: i32) -> Result<(), CatalogError> {
        if self.failing_deletes.lock().unwrap().contains(&row_id) {
            return Err(CatalogError::Unavailable(format!("delete of {row_id} rejected")));
        }
        self.inner.delete(scope, row_id).await?;
        self.writes.lock().unwrap().push(format!("delete:{row_id}"));
        Ok(())
    }
}
