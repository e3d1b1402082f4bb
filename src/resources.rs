//! Resource kinds and the local view of each resource as reported by the agent.
//!
//! Every local resource exposes its mirrored attributes as an [`AttributeSet`],
//! which is what the reconciler compares against the catalog row.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use crate::db::enums::ResourceKind;

/// A mirrored attribute, i.e. a catalog column that follows the local resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Cores,
    MemoryMb,
    Status,
    DiskPath,
    IsoPath,
    SizeGb,
    Content,
    Repository,
    Tag,
    SizeBytes,
    Image,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Cores => "cores",
            Field::MemoryMb => "memory_mb",
            Field::Status => "status",
            Field::DiskPath => "disk_path",
            Field::IsoPath => "iso_path",
            Field::SizeGb => "size_gb",
            Field::Content => "content",
            Field::Repository => "repository",
            Field::Tag => "tag",
            Field::SizeBytes => "size_bytes",
            Field::Image => "image",
        }
    }

    /// The mirrored fields tracked for a kind. Key-forming columns are not listed.
    pub fn mirrored_by(kind: ResourceKind) -> &'static [Field] {
        match kind {
            ResourceKind::Vm => &[
                Field::Name,
                Field::Cores,
                Field::MemoryMb,
                Field::Status,
                Field::DiskPath,
                Field::IsoPath,
            ],
            ResourceKind::Disk => &[Field::SizeGb],
            ResourceKind::Dockerfile => &[Field::Content],
            ResourceKind::Image => &[Field::Repository, Field::Tag, Field::SizeBytes],
            ResourceKind::Container => &[Field::Name, Field::Image, Field::Status],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(Option<i64>),
    Text(Option<String>),
}

/// Ordered map of mirrored attribute values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeSet(BTreeMap<Field, AttrValue>);

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, field: Field, value: Option<String>) -> Self {
        self.0.insert(field, AttrValue::Text(value));
        self
    }

    pub fn int(mut self, field: Field, value: Option<i64>) -> Self {
        self.0.insert(field, AttrValue::Int(value));
        self
    }

    pub fn insert(&mut self, field: Field, value: AttrValue) {
        self.0.insert(field, value);
    }

    pub fn get(&self, field: Field) -> Option<&AttrValue> {
        self.0.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &AttrValue)> {
        self.0.iter()
    }

    pub fn fields(&self) -> Vec<Field> {
        self.0.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fields of `self` whose value differs from `remote`, carrying the `self` value.
    /// A field absent on the remote side counts as changed.
    pub fn changed_fields(&self, remote: &AttributeSet) -> AttributeSet {
        let changed = self
            .0
            .iter()
            .filter(|(field, value)| remote.0.get(*field) != Some(*value))
            .map(|(field, value)| (*field, value.clone()))
            .collect();
        AttributeSet(changed)
    }
}

// --- Local resources, deserialized straight from the agent's JSON ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVm {
    pub id: String,
    pub name: String,
    pub cores: i32,
    #[serde(rename = "memory")]
    pub memory_mb: i64,
    pub status: String,
    #[serde(default)]
    pub disk_path: Option<String>,
    #[serde(default)]
    pub iso_path: Option<String>,
}

/// A virtual disk. `id` is the composite `<name>.<format>` the agent reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDisk {
    pub id: String,
    #[serde(rename = "size")]
    pub size_gb: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDockerfile {
    pub name: String,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalImage {
    pub id: String,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(rename = "size", default)]
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LocalResource {
    Vm(LocalVm),
    Disk(LocalDisk),
    Dockerfile(LocalDockerfile),
    Image(LocalImage),
    Container(LocalContainer),
}

impl LocalResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            LocalResource::Vm(_) => ResourceKind::Vm,
            LocalResource::Disk(_) => ResourceKind::Disk,
            LocalResource::Dockerfile(_) => ResourceKind::Dockerfile,
            LocalResource::Image(_) => ResourceKind::Image,
            LocalResource::Container(_) => ResourceKind::Container,
        }
    }

    /// The identifier the agent uses for this resource, for logs and error reports.
    pub fn local_ref(&self) -> &str {
        match self {
            LocalResource::Vm(vm) => &vm.id,
            LocalResource::Disk(disk) => &disk.id,
            LocalResource::Dockerfile(dockerfile) => &dockerfile.path,
            LocalResource::Image(image) => &image.id,
            LocalResource::Container(container) => &container.id,
        }
    }

    pub fn attributes(&self) -> AttributeSet {
        match self {
            LocalResource::Vm(vm) => AttributeSet::new()
                .text(Field::Name, Some(vm.name.clone()))
                .int(Field::Cores, Some(i64::from(vm.cores)))
                .int(Field::MemoryMb, Some(vm.memory_mb))
                .text(Field::Status, Some(vm.status.clone()))
                .text(Field::DiskPath, vm.disk_path.clone())
                .text(Field::IsoPath, vm.iso_path.clone()),
            LocalResource::Disk(disk) => AttributeSet::new().int(Field::SizeGb, Some(disk.size_gb)),
            LocalResource::Dockerfile(dockerfile) => {
                AttributeSet::new().text(Field::Content, Some(dockerfile.content.clone()))
            }
            LocalResource::Image(image) => AttributeSet::new()
                .text(Field::Repository, image.repository.clone())
                .text(Field::Tag, image.tag.clone())
                .int(Field::SizeBytes, image.size_bytes),
            LocalResource::Container(container) => AttributeSet::new()
                .text(Field::Name, Some(container.name.clone()))
                .text(Field::Image, Some(container.image.clone()))
                .text(Field::Status, Some(container.status.clone())),
        }
    }
}
