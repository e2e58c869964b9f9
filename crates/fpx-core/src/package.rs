use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fully resolved package identity.
///
/// Two identities are equal iff both `id` and `version` match exactly; the
/// version is treated as an opaque string. The derived ordering (by `id`, then
/// `version`) is the canonical enumeration order used across fpx.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageId {
    pub id: String,
    pub version: String,
}

impl PackageId {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// `id#version`, the key used for visited sets and cache directory names.
    pub fn key(&self) -> String {
        format!("{}#{}", self.id, self.version)
    }

    pub fn is(&self, id: &str, version: &str) -> bool {
        self.id == id && self.version == version
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageRefError {
    #[error("empty package reference")]
    Empty,
    #[error("package reference `{0}` has an empty id")]
    MissingId(String),
    #[error("package reference `{0}` has an empty version")]
    MissingVersion(String),
}

/// A package reference as supplied by callers: `id@version`, `id#version`, a
/// bare `id`, or the object form `{ "id": .., "version": .. }`.
///
/// A reference without a version is resolved by the package manager (usually
/// to the greatest installed version).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PackageRef {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: Some(version.into()),
        }
    }

    pub fn unversioned(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }

    /// Returns the exact identity when the reference carries a version.
    pub fn as_exact(&self) -> Option<PackageId> {
        self.version
            .as_ref()
            .map(|version| PackageId::new(self.id.clone(), version.clone()))
    }
}

impl FromStr for PackageRef {
    type Err = PackageRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PackageRefError::Empty);
        }

        match trimmed.split_once(|c| c == '@' || c == '#') {
            Some((id, version)) => {
                let (id, version) = (id.trim(), version.trim());
                if id.is_empty() {
                    return Err(PackageRefError::MissingId(trimmed.to_owned()));
                }
                if version.is_empty() {
                    return Err(PackageRefError::MissingVersion(trimmed.to_owned()));
                }
                Ok(Self::new(id, version))
            }
            None => Ok(Self::unversioned(trimmed)),
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{version}", self.id),
            None => f.write_str(&self.id),
        }
    }
}

impl From<PackageId> for PackageRef {
    fn from(value: PackageId) -> Self {
        Self {
            id: value.id,
            version: Some(value.version),
        }
    }
}

impl From<&PackageId> for PackageRef {
    fn from(value: &PackageId) -> Self {
        value.clone().into()
    }
}

impl<'de> Deserialize<'de> for PackageRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Object { id: String, version: Option<String> },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Object { id, version } => {
                if id.trim().is_empty() {
                    return Err(serde::de::Error::custom(PackageRefError::MissingId(id)));
                }
                Ok(Self { id, version })
            }
        }
    }
}
