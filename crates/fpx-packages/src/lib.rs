//! The package-management boundary used by the explorer.
//!
//! [`PackageManager`] is the small set of asynchronous capabilities the
//! explorer needs from a package cache: resolve references, make sure a
//! package is present, and read its manifest, index file and documents.
//! Acquisition (downloads, registries) is not part of this crate.

mod error;
mod fs;
mod manifest;
mod memory;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fpx_core::{compare_versions, PackageId, PackageRef};
use serde_json::Value;

pub use error::PackageError;
pub use fs::{default_cache_path, FsPackageManager, CACHE_ENV};
pub use manifest::{PackageIndexFile, PackageManifest};
pub use memory::MemoryPackageManager;

#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Every locally available version of `id`, in no particular order.
    async fn installed_versions(&self, id: &str) -> Result<Vec<String>, PackageError>;

    /// Normalize a reference to an exact identity.
    ///
    /// Unversioned references resolve to the greatest installed version.
    async fn to_package_id(&self, reference: &PackageRef) -> Result<PackageId, PackageError> {
        if let Some(exact) = reference.as_exact() {
            return Ok(exact);
        }
        let versions = self.installed_versions(&reference.id).await?;
        versions
            .into_iter()
            .max_by(|a, b| compare_versions(a, b))
            .map(|version| PackageId::new(reference.id.clone(), version))
            .ok_or_else(|| PackageError::NotInstalled {
                package: reference.to_string(),
            })
    }

    /// Ensure the package is materialized locally. Idempotent.
    async fn install(&self, package: &PackageId) -> Result<(), PackageError>;

    /// Parsed `package.json`, or `None` when the package ships no manifest.
    async fn manifest(&self, package: &PackageId) -> Result<Option<PackageManifest>, PackageError>;

    /// Direct dependency declarations (`id -> version`).
    async fn dependencies(
        &self,
        package: &PackageId,
    ) -> Result<BTreeMap<String, String>, PackageError> {
        Ok(self
            .manifest(package)
            .await?
            .map(|manifest| manifest.dependencies)
            .unwrap_or_default())
    }

    async fn package_index(&self, package: &PackageId) -> Result<PackageIndexFile, PackageError>;

    /// Directory holding the package's documents.
    fn package_dir(&self, package: &PackageId) -> PathBuf;

    /// Read and parse one document of `package`.
    async fn read_document(
        &self,
        package: &PackageId,
        filename: &str,
    ) -> Result<Value, PackageError> {
        let path = self.package_dir(package).join(filename);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PackageError::DocumentNotFound {
                    package: package.to_string(),
                    filename: filename.to_owned(),
                })
            }
            Err(source) => return Err(PackageError::Io { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| PackageError::Json { path, source })
    }

    /// Root of the on-disk cache, when there is one.
    fn cache_path(&self) -> Option<&Path> {
        None
    }
}
