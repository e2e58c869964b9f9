use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fpx_core::{PackageId, ResourceMeta};
use serde::de::DeserializeOwned;

use crate::{PackageError, PackageIndexFile, PackageManager, PackageManifest};

/// Environment variable overriding the package cache root.
pub const CACHE_ENV: &str = "FPX_PACKAGE_CACHE";

const MANIFEST_FILE: &str = "package.json";
const INDEX_FILE: &str = ".index.json";

/// Default package cache root.
///
/// Discovery order:
/// 1. `FPX_PACKAGE_CACHE`
/// 2. `~/.fhir/packages` (the cache shared with other FHIR tooling)
pub fn default_cache_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CACHE_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".fhir").join("packages"))
}

/// Reads the standard FHIR package cache layout:
///
/// ```text
/// <root>/<id>#<version>/package/package.json
/// <root>/<id>#<version>/package/.index.json
/// <root>/<id>#<version>/package/*.json
/// ```
///
/// Packages must already be unpacked into the cache; `install` only checks
/// for their presence.
#[derive(Debug, Clone)]
pub struct FsPackageManager {
    root: PathBuf,
}

impl FsPackageManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn discover() -> Option<Self> {
        default_cache_path().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PackageError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PackageError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PackageError::Json {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Build an index by parsing every top-level `*.json` document in `dir`.
    async fn scan_index(dir: &Path) -> Result<PackageIndexFile, PackageError> {
        let io_err = |source| PackageError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut read_dir = tokio::fs::read_dir(dir).await.map_err(io_err)?;
        let mut files = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(io_err)? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.ends_with(".json") || name.starts_with('.') || name == MANIFEST_FILE {
                continue;
            }
            let path = entry.path();
            match Self::read_json::<serde_json::Value>(&path).await {
                Ok(Some(resource)) => {
                    if let Some(meta) = ResourceMeta::from_resource(name, &resource) {
                        files.push(meta);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(
                        target: "fpx.packages",
                        path = %path.display(),
                        error = %err,
                        "skipping unreadable document while indexing"
                    );
                }
            }
        }
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(PackageIndexFile::new(files))
    }
}

#[async_trait]
impl PackageManager for FsPackageManager {
    async fn installed_versions(&self, id: &str) -> Result<Vec<String>, PackageError> {
        let mut read_dir = match tokio::fs::read_dir(&self.root).await {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PackageError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let prefix = format!("{id}#");
        let mut versions = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|source| PackageError::Io {
                path: self.root.clone(),
                source,
            })?
        {
            let name = entry.file_name();
            let Some(version) = name.to_str().and_then(|n| n.strip_prefix(&prefix)) else {
                continue;
            };
            let unpacked = tokio::fs::metadata(entry.path().join("package"))
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            if !version.is_empty() && unpacked {
                versions.push(version.to_owned());
            }
        }
        Ok(versions)
    }

    async fn install(&self, package: &PackageId) -> Result<(), PackageError> {
        let manifest = self.package_dir(package).join(MANIFEST_FILE);
        match tokio::fs::metadata(&manifest).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(PackageError::NotInstalled {
                package: package.to_string(),
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(
                    target: "fpx.packages",
                    package = %package,
                    root = %self.root.display(),
                    "package missing from cache"
                );
                Err(PackageError::NotInstalled {
                    package: package.to_string(),
                })
            }
            Err(source) => Err(PackageError::Io {
                path: manifest,
                source,
            }),
        }
    }

    async fn manifest(&self, package: &PackageId) -> Result<Option<PackageManifest>, PackageError> {
        Self::read_json(&self.package_dir(package).join(MANIFEST_FILE)).await
    }

    async fn package_index(&self, package: &PackageId) -> Result<PackageIndexFile, PackageError> {
        let dir = self.package_dir(package);
        if let Some(index) = Self::read_json(&dir.join(INDEX_FILE)).await? {
            return Ok(index);
        }
        tracing::debug!(
            target: "fpx.packages",
            package = %package,
            "no .index.json; scanning package documents"
        );
        Self::scan_index(&dir).await
    }

    fn package_dir(&self, package: &PackageId) -> PathBuf {
        self.root.join(package.key()).join("package")
    }

    fn cache_path(&self) -> Option<&Path> {
        Some(&self.root)
    }
}
