//! Core shared types for fpx.
//!
//! Package identity, the per-document metadata stored in package indexes, and
//! the lookup filters evaluated against that metadata. This crate performs no
//! IO; everything async lives behind `fpx-packages`.

mod entry;
mod filter;
mod keys;
mod package;
mod version;

pub use entry::{IndexEntry, ResourceMeta};
pub use filter::{FilterParseError, LookupFilter, PACKAGE_FIELD};
pub use keys::{entry_keys, filter_keys, KEY_SHAPES};
pub use package::{PackageId, PackageRef, PackageRefError};
pub use version::{compare_versions, is_strict_semver, package_id_major};
