//! Natural keys: the join key between a local resource and its catalog row.
//!
//! Both derivations are pure. The composite disk id is parsed here and nowhere
//! else; everything downstream works with [`DiskKey`].

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

use crate::catalog::CatalogRow;
use crate::resources::{LocalResource, ResourceKind};

const DISK_ID_DELIMITER: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Malformed disk id '{0}': expected '<name>.<format>'")]
    MalformedDiskId(String),
    #[error("Empty {field} on {kind} resource")]
    EmptyField {
        kind: ResourceKind,
        field: &'static str,
    },
    #[error("Catalog row {row_id} ({kind}) is missing key column '{column}'")]
    MissingColumn {
        row_id: i32,
        kind: ResourceKind,
        column: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DiskKey {
    pub name: String,
    pub format: String,
}

impl DiskKey {
    pub fn new(name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: format.into().to_ascii_lowercase(),
        }
    }

    /// Parses the agent's composite disk id. Exactly two non-empty fields split by
    /// a single delimiter; surrounding whitespace is rejected, not trimmed.
    pub fn parse(composite: &str) -> Result<Self, KeyError> {
        let malformed = || KeyError::MalformedDiskId(composite.to_string());

        let mut parts = composite.split(DISK_ID_DELIMITER);
        let (Some(name), Some(format), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        let well_formed = |part: &str| !part.is_empty() && part.trim() == part;
        if !well_formed(name) || !well_formed(format) {
            return Err(malformed());
        }
        Ok(Self::new(name, format))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NaturalKey {
    Vm { id: String },
    Disk(DiskKey),
    Dockerfile { name: String, path: String },
    Image { local_id: String },
    Container { local_id: String },
}

/// Values for the key-forming catalog columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyColumns {
    pub local_id: Option<String>,
    pub name: Option<String>,
    pub format: Option<String>,
    pub path: Option<String>,
}

impl NaturalKey {
    pub fn kind(&self) -> ResourceKind {
        match self {
            NaturalKey::Vm { .. } => ResourceKind::Vm,
            NaturalKey::Disk(_) => ResourceKind::Disk,
            NaturalKey::Dockerfile { .. } => ResourceKind::Dockerfile,
            NaturalKey::Image { .. } => ResourceKind::Image,
            NaturalKey::Container { .. } => ResourceKind::Container,
        }
    }

    /// Stable string form stored in the `natural_key` column for the unique index.
    /// Components are escaped, so two different keys never share a canonical form.
    pub fn canonical(&self) -> String {
        match self {
            NaturalKey::Vm { id } => format!("vm:{}", escape(id)),
            NaturalKey::Disk(disk) => format!("disk:{}/{}", escape(&disk.name), escape(&disk.format)),
            NaturalKey::Dockerfile { name, path } => {
                format!("dockerfile:{}@{}", escape(name), escape(path))
            }
            NaturalKey::Image { local_id } => format!("image:{}", escape(local_id)),
            NaturalKey::Container { local_id } => format!("container:{}", escape(local_id)),
        }
    }

    pub fn columns(&self) -> KeyColumns {
        match self {
            NaturalKey::Vm { id } => KeyColumns {
                local_id: Some(id.clone()),
                ..Default::default()
            },
            NaturalKey::Disk(disk) => KeyColumns {
                name: Some(disk.name.clone()),
                format: Some(disk.format.clone()),
                ..Default::default()
            },
            NaturalKey::Dockerfile { name, path } => KeyColumns {
                name: Some(name.clone()),
                path: Some(path.clone()),
                ..Default::default()
            },
            NaturalKey::Image { local_id } | NaturalKey::Container { local_id } => KeyColumns {
                local_id: Some(local_id.clone()),
                ..Default::default()
            },
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

// Percent-escapes the canonical-form delimiters inside one key component.
fn escape(component: &str) -> Cow<'_, str> {
    if !component.contains(['%', '/', '@']) {
        return Cow::Borrowed(component);
    }
    let mut escaped = String::with_capacity(component.len() + 6);
    for c in component.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '/' => escaped.push_str("%2F"),
            '@' => escaped.push_str("%40"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

fn non_empty(kind: ResourceKind, field: &'static str, value: &str) -> Result<String, KeyError> {
    if value.is_empty() {
        return Err(KeyError::EmptyField { kind, field });
    }
    Ok(value.to_string())
}

pub fn local_key(resource: &LocalResource) -> Result<NaturalKey, KeyError> {
    let kind = resource.kind();
    match resource {
        LocalResource::Vm(vm) => Ok(NaturalKey::Vm {
            id: non_empty(kind, "id", &vm.id)?,
        }),
        LocalResource::Disk(disk) => DiskKey::parse(&disk.id).map(NaturalKey::Disk),
        LocalResource::Dockerfile(dockerfile) => Ok(NaturalKey::Dockerfile {
            name: non_empty(kind, "name", &dockerfile.name)?,
            path: non_empty(kind, "path", &dockerfile.path)?,
        }),
        LocalResource::Image(image) => Ok(NaturalKey::Image {
            local_id: non_empty(kind, "id", &image.id)?,
        }),
        LocalResource::Container(container) => Ok(NaturalKey::Container {
            local_id: non_empty(kind, "id", &container.id)?,
        }),
    }
}

pub fn row_key(row: &CatalogRow) -> Result<NaturalKey, KeyError> {
    let column = |value: &Option<String>, column: &'static str| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or(KeyError::MissingColumn {
                row_id: row.id,
                kind: row.kind,
                column,
            })
    };

    match row.kind {
        ResourceKind::Vm => Ok(NaturalKey::Vm {
            id: column(&row.local_id, "local_id")?,
        }),
        ResourceKind::Disk => Ok(NaturalKey::Disk(DiskKey::new(
            column(&row.name, "name")?,
            column(&row.format, "format")?,
        ))),
        ResourceKind::Dockerfile => Ok(NaturalKey::Dockerfile {
            name: column(&row.name, "name")?,
            path: column(&row.path, "path")?,
        }),
        ResourceKind::Image => Ok(NaturalKey::Image {
            local_id: column(&row.local_id, "local_id")?,
        }),
        ResourceKind::Container => Ok(NaturalKey::Container {
            local_id: column(&row.local_id, "local_id")?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{AttributeSet, LocalDisk, LocalDockerfile};
    use chrono::Utc;

    fn row(kind: ResourceKind) -> CatalogRow {
        CatalogRow {
            id: 7,
            user_id: 1,
            kind,
            local_id: None,
            name: None,
            format: None,
            path: None,
            attributes: AttributeSet::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parses_disk_composite_id() {
        assert_eq!(DiskKey::parse("work.qcow2").unwrap(), DiskKey::new("work", "qcow2"));
        assert_eq!(DiskKey::parse("Backup.RAW").unwrap().format, "raw");
    }

    #[test]
    fn rejects_malformed_disk_ids() {
        for id in ["work", "work.", ".qcow2", "a.b.c", "", " work.qcow2", "work.qcow2 ", "."] {
            assert_eq!(
                DiskKey::parse(id),
                Err(KeyError::MalformedDiskId(id.to_string())),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn local_and_row_keys_agree_for_disks() {
        let local = LocalResource::Disk(LocalDisk {
            id: "work.qcow2".into(),
            size_gb: 20,
        });
        let mut remote = row(ResourceKind::Disk);
        remote.name = Some("work".into());
        remote.format = Some("QCOW2".into());

        assert_eq!(local_key(&local).unwrap(), row_key(&remote).unwrap());
    }

    #[test]
    fn dockerfile_key_uses_name_and_path() {
        let a = LocalResource::Dockerfile(LocalDockerfile {
            name: "api".into(),
            path: "/srv/api/Dockerfile".into(),
            content: "FROM alpine".into(),
        });
        let b = LocalResource::Dockerfile(LocalDockerfile {
            name: "api".into(),
            path: "/srv/other/Dockerfile".into(),
            content: "FROM alpine".into(),
        });
        assert_ne!(local_key(&a).unwrap(), local_key(&b).unwrap());
    }

    #[test]
    fn row_missing_key_column_is_rejected() {
        let remote = row(ResourceKind::Image);
        assert_eq!(
            row_key(&remote),
            Err(KeyError::MissingColumn {
                row_id: 7,
                kind: ResourceKind::Image,
                column: "local_id",
            })
        );
    }

    #[test]
    fn canonical_form_distinguishes_kinds() {
        let image = NaturalKey::Image { local_id: "abc".into() };
        let container = NaturalKey::Container { local_id: "abc".into() };
        assert_ne!(image.canonical(), container.canonical());
        assert_eq!(NaturalKey::Disk(DiskKey::new("work", "qcow2")).canonical(), "disk:work/qcow2");
    }

    #[test]
    fn canonical_form_survives_delimiters_inside_components() {
        let dockerfiles = [
            NaturalKey::Dockerfile { name: "a@b".into(), path: "c".into() },
            NaturalKey::Dockerfile { name: "a".into(), path: "b@c".into() },
        ];
        assert_ne!(dockerfiles[0].canonical(), dockerfiles[1].canonical());

        let disks = [DiskKey::parse("a.b/c").unwrap(), DiskKey::parse("a/b.c").unwrap()];
        assert_ne!(disks[0], disks[1]);
        assert_ne!(
            NaturalKey::Disk(disks[0].clone()).canonical(),
            NaturalKey::Disk(disks[1].clone()).canonical()
        );

        // An escape sequence in a raw name must not read as an escaped delimiter.
        let literal = NaturalKey::Dockerfile { name: "a%40b".into(), path: "c".into() };
        assert_ne!(literal.canonical(), dockerfiles[0].canonical());
        assert_eq!(dockerfiles[0].canonical(), "dockerfile:a%40b@c");
    }
}
