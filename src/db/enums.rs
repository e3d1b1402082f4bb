use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "resource_kind_enum")]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[sea_orm(string_value = "vm")]
    Vm,
    #[sea_orm(string_value = "disk")]
    Disk,
    #[sea_orm(string_value = "dockerfile")]
    Dockerfile,
    #[sea_orm(string_value = "image")]
    Image,
    #[sea_orm(string_value = "container")]
    Container,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Vm,
        ResourceKind::Disk,
        ResourceKind::Dockerfile,
        ResourceKind::Image,
        ResourceKind::Container,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vm => "vm",
            ResourceKind::Disk => "disk",
            ResourceKind::Dockerfile => "dockerfile",
            ResourceKind::Image => "image",
            ResourceKind::Container => "container",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown resource kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}
