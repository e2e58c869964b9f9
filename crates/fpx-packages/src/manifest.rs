use std::collections::BTreeMap;

use fpx_core::{PackageId, ResourceMeta};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The subset of `package.json` fpx reads; everything else is kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PackageManifest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_dependency(mut self, id: impl Into<String>, version: impl Into<String>) -> Self {
        self.dependencies.insert(id.into(), version.into());
        self
    }

    pub fn package_id(&self) -> PackageId {
        PackageId::new(self.name.clone(), self.version.clone())
    }
}

/// Contents of a package's `.index.json`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageIndexFile {
    #[serde(
        rename = "index-version",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub index_version: Option<u32>,
    #[serde(default)]
    pub files: Vec<ResourceMeta>,
}

impl PackageIndexFile {
    pub fn new(files: Vec<ResourceMeta>) -> Self {
        Self {
            index_version: Some(1),
            files,
        }
    }
}
