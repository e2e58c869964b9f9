use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{IndexEntry, PackageRef, PackageRefError};

/// Filter key that restricts a lookup to one package and its dependencies.
pub const PACKAGE_FIELD: &str = "package";

/// Fields that accept the canonical `value|version` shorthand, in priority order.
const PIPED_FIELDS: [&str; 3] = ["url", "name", "id"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("filter term `{0}` is not of the form field=value")]
    MissingSeparator(String),
    #[error("filter term `{0}` has an empty field name")]
    EmptyField(String),
    #[error("invalid package filter: {0}")]
    Package(#[from] PackageRefError),
}

/// Exact-match constraints over [`IndexEntry`] fields plus an optional package scope.
///
/// Field names are the wire names used in package index files (`resourceType`,
/// `url`, `__packageId`, ...). Filters are values: [`LookupFilter::normalize`]
/// returns a new filter and never rewrites the receiver.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    package: Option<PackageRef>,
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

impl LookupFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an exact-match constraint. `package` is routed to the
    /// package scope instead of the field constraints.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        let field = field.into();
        let value = value.into();
        if field == PACKAGE_FIELD {
            // Keep the raw text when it does not parse; resolution reports it later.
            self.package = Some(
                value
                    .parse()
                    .unwrap_or_else(|_| PackageRef::unversioned(value)),
            );
        } else {
            self.fields.insert(field, value);
        }
        self
    }

    pub fn resource_type(self, value: impl Into<String>) -> Self {
        self.with("resourceType", value)
    }

    pub fn id(self, value: impl Into<String>) -> Self {
        self.with("id", value)
    }

    pub fn url(self, value: impl Into<String>) -> Self {
        self.with("url", value)
    }

    pub fn name(self, value: impl Into<String>) -> Self {
        self.with("name", value)
    }

    pub fn version(self, value: impl Into<String>) -> Self {
        self.with("version", value)
    }

    pub fn package(mut self, package: impl Into<PackageRef>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Build a filter from `field=value` terms.
    pub fn from_pairs<I, S>(terms: I) -> Result<Self, FilterParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new();
        for term in terms {
            let term = term.as_ref();
            let Some((field, value)) = term.split_once('=') else {
                return Err(FilterParseError::MissingSeparator(term.to_owned()));
            };
            let field = field.trim();
            if field.is_empty() {
                return Err(FilterParseError::EmptyField(term.to_owned()));
            }
            if field == PACKAGE_FIELD {
                filter.package = Some(value.parse()?);
            } else {
                filter.fields.insert(field.to_owned(), value.to_owned());
            }
        }
        Ok(filter)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn package_ref(&self) -> Option<&PackageRef> {
        self.package.as_ref()
    }

    /// Canonical form of this filter.
    ///
    /// The first of `url`, `name`, `id` (in that order) whose value contains a
    /// `|` is split: the part before the pipe replaces the field and the part
    /// after becomes the `version` constraint. Later piped fields are left as-is.
    pub fn normalize(&self) -> Self {
        let mut out = self.clone();
        for field in PIPED_FIELDS {
            let split = out
                .fields
                .get(field)
                .and_then(|value| value.split_once('|'))
                .map(|(base, version)| (base.to_owned(), version.to_owned()));
            let Some((base, version)) = split else {
                continue;
            };
            out.fields.insert(field.to_owned(), base);
            out.fields.insert("version".to_owned(), version);
            break;
        }
        out
    }

    /// Whether every field constraint is present on `entry` with an exactly
    /// equal value. The package scope is not consulted here.
    pub fn matches(&self, entry: &IndexEntry) -> bool {
        self.fields.iter().all(|(field, expected)| {
            entry
                .field(field)
                .is_some_and(|actual| actual.as_ref() == expected.as_str())
        })
    }
}

impl FromStr for LookupFilter {
    type Err = FilterParseError;

    /// Parses comma-separated `field=value` terms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_pairs(s.split(',').map(str::trim).filter(|t| !t.is_empty()))
    }
}

impl fmt::Display for LookupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first = true;
        for (field, value) in &self.fields {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{field}={value}")?;
        }
        if let Some(package) = &self.package {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{PACKAGE_FIELD}={package}")?;
        }
        f.write_str("}")
    }
}
