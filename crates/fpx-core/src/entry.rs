use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::PackageId;

/// Descriptive fields copied out of a resource when a package index is generated.
const INDEXED_FIELDS: &[&str] = &[
    "id",
    "url",
    "name",
    "version",
    "kind",
    "type",
    "derivation",
    "content",
    "supplements",
    "valueSet",
    "baseDefinition",
    "sdType",
];

/// Descriptive metadata of one document as listed in a package's index file.
///
/// Well-known fields are typed; anything else a given index format carries is
/// kept verbatim in `extra` so filters can still match on it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMeta {
    pub filename: String,
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ResourceMeta {
    pub fn new(filename: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    /// Extract index metadata from a parsed resource document.
    ///
    /// Returns `None` for anything that is not a JSON object with a string
    /// `resourceType`.
    pub fn from_resource(filename: impl Into<String>, resource: &Value) -> Option<Self> {
        let object = resource.as_object()?;
        let resource_type = object.get("resourceType")?.as_str()?;

        let mut meta = Self::new(filename, resource_type);
        for field in INDEXED_FIELDS {
            let Some(value) = object.get(*field) else {
                continue;
            };
            if !matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
                continue;
            }
            meta.set_field(field, value.clone());
        }
        Some(meta)
    }

    fn set_field(&mut self, field: &str, value: Value) {
        let slot = match field {
            "id" => &mut self.id,
            "url" => &mut self.url,
            "name" => &mut self.name,
            "version" => &mut self.version,
            "kind" => &mut self.kind,
            "type" => &mut self.type_,
            "derivation" => &mut self.derivation,
            "content" => &mut self.content,
            _ => {
                self.extra.insert(field.to_owned(), value);
                return;
            }
        };
        *slot = scalar_text(&value).map(Cow::into_owned);
    }

    /// Look up a field by its wire name, rendering scalar values as text.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let typed = match name {
            "filename" => Some(self.filename.as_str()),
            "resourceType" => Some(self.resource_type.as_str()),
            "id" => self.id.as_deref(),
            "url" => self.url.as_deref(),
            "name" => self.name.as_deref(),
            "version" => self.version.as_deref(),
            "kind" => self.kind.as_deref(),
            "type" => self.type_.as_deref(),
            "derivation" => self.derivation.as_deref(),
            "content" => self.content.as_deref(),
            other => return self.extra.get(other).and_then(scalar_text),
        };
        typed.map(Cow::Borrowed)
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// A [`ResourceMeta`] stamped with the identity of the package that owns it.
///
/// Entries are immutable once built; indexes hand them out behind `Arc`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(rename = "__packageId")]
    pub package_id: String,
    #[serde(rename = "__packageVersion")]
    pub package_version: String,
}

impl IndexEntry {
    pub fn new(meta: ResourceMeta, package: &PackageId) -> Self {
        Self {
            meta,
            package_id: package.id.clone(),
            package_version: package.version.clone(),
        }
    }

    pub fn package(&self) -> PackageId {
        PackageId::new(self.package_id.clone(), self.package_version.clone())
    }

    pub fn is_from(&self, package: &PackageId) -> bool {
        package.is(&self.package_id, &self.package_version)
    }

    pub fn filename(&self) -> &str {
        &self.meta.filename
    }

    pub fn resource_type(&self) -> &str {
        &self.meta.resource_type
    }

    /// Field lookup including the `__packageId` / `__packageVersion` stamps.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "__packageId" => Some(Cow::Borrowed(self.package_id.as_str())),
            "__packageVersion" => Some(Cow::Borrowed(self.package_version.as_str())),
            _ => self.meta.field(name),
        }
    }
}
