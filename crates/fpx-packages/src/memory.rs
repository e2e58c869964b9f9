use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use fpx_core::{PackageId, ResourceMeta};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::{PackageError, PackageIndexFile, PackageManager, PackageManifest};

#[derive(Debug, Clone)]
struct MemoryPackage {
    manifest: PackageManifest,
    index: PackageIndexFile,
    documents: HashMap<String, Value>,
}

/// A [`PackageManager`] over packages registered in memory.
///
/// Every registered package counts as installed. Index and document reads are
/// counted per package so callers can observe caching behaviour.
#[derive(Debug, Default)]
pub struct MemoryPackageManager {
    packages: RwLock<BTreeMap<PackageId, MemoryPackage>>,
    index_reads: Mutex<HashMap<PackageId, usize>>,
    document_reads: Mutex<HashMap<PackageId, usize>>,
}

impl MemoryPackageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package; its index is derived from the documents.
    pub fn add_package<I>(&self, manifest: PackageManifest, documents: I) -> PackageId
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let documents: HashMap<String, Value> = documents.into_iter().collect();
        let mut files: Vec<ResourceMeta> = documents
            .iter()
            .filter_map(|(filename, doc)| ResourceMeta::from_resource(filename.clone(), doc))
            .collect();
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        self.add_package_with_index(manifest, PackageIndexFile::new(files), documents)
    }

    /// Register a package with an explicit index, which may disagree with the
    /// documents (index files are authoritative for lookups).
    pub fn add_package_with_index(
        &self,
        manifest: PackageManifest,
        index: PackageIndexFile,
        documents: HashMap<String, Value>,
    ) -> PackageId {
        let id = manifest.package_id();
        self.packages.write().insert(
            id.clone(),
            MemoryPackage {
                manifest,
                index,
                documents,
            },
        );
        id
    }

    /// How many times the index of `package` has been requested.
    pub fn index_reads(&self, package: &PackageId) -> usize {
        self.index_reads.lock().get(package).copied().unwrap_or(0)
    }

    /// How many documents of `package` have been read.
    pub fn document_reads(&self, package: &PackageId) -> usize {
        self.document_reads.lock().get(package).copied().unwrap_or(0)
    }

    fn with_package<T>(
        &self,
        package: &PackageId,
        f: impl FnOnce(&MemoryPackage) -> T,
    ) -> Result<T, PackageError> {
        self.packages
            .read()
            .get(package)
            .map(f)
            .ok_or_else(|| PackageError::NotInstalled {
                package: package.to_string(),
            })
    }
}

#[async_trait]
impl PackageManager for MemoryPackageManager {
    async fn installed_versions(&self, id: &str) -> Result<Vec<String>, PackageError> {
        Ok(self
            .packages
            .read()
            .keys()
            .filter(|pkg| pkg.id == id)
            .map(|pkg| pkg.version.clone())
            .collect())
    }

    async fn install(&self, package: &PackageId) -> Result<(), PackageError> {
        self.with_package(package, |_| ())
    }

    async fn manifest(&self, package: &PackageId) -> Result<Option<PackageManifest>, PackageError> {
        self.with_package(package, |p| Some(p.manifest.clone()))
    }

    async fn package_index(&self, package: &PackageId) -> Result<PackageIndexFile, PackageError> {
        let index = self.with_package(package, |p| p.index.clone())?;
        *self.index_reads.lock().entry(package.clone()).or_default() += 1;
        Ok(index)
    }

    fn package_dir(&self, package: &PackageId) -> PathBuf {
        PathBuf::from("memory").join(package.key()).join("package")
    }

    async fn read_document(
        &self,
        package: &PackageId,
        filename: &str,
    ) -> Result<Value, PackageError> {
        let document = self
            .with_package(package, |p| p.documents.get(filename).cloned())?
            .ok_or_else(|| PackageError::DocumentNotFound {
                package: package.to_string(),
                filename: filename.to_owned(),
            })?;
        *self.document_reads.lock().entry(package.clone()).or_default() += 1;
        Ok(document)
    }
}
