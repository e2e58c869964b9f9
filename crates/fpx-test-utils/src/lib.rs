//! Utilities shared by fpx tests.
//!
//! [`PackageGraphBuilder`] describes a graph of packages with their documents
//! once; the same description can back an in-memory package manager or be
//! written out as an on-disk FHIR package cache.

mod fixtures;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use fpx_core::{PackageId, PackageRef, ResourceMeta};
use fpx_packages::{FsPackageManager, MemoryPackageManager, PackageIndexFile, PackageManifest};
use serde_json::Value;
use tempfile::TempDir;

pub use fixtures::{
    code_system, fhir_context, fhir_graph, structure_definition, value_set, CORE, EXTENSIONS,
    IG_A, IG_B, IG_BUNDLE, SDC, TERMINOLOGY,
};

#[derive(Debug, Clone)]
struct FixturePackage {
    manifest: PackageManifest,
    documents: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct PackageGraphBuilder {
    packages: BTreeMap<PackageId, FixturePackage>,
}

fn exact(reference: &str) -> PackageId {
    reference
        .parse::<PackageRef>()
        .ok()
        .and_then(|r| r.as_exact())
        .unwrap_or_else(|| panic!("fixture package `{reference}` must be `id@version`"))
}

impl PackageGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a package and its direct dependencies (all `id@version`).
    pub fn package(mut self, reference: &str, dependencies: &[&str]) -> Self {
        let id = exact(reference);
        let mut manifest = PackageManifest::new(id.id.clone(), id.version.clone());
        for dep in dependencies {
            let dep = exact(dep);
            manifest.dependencies.insert(dep.id, dep.version);
        }
        self.packages.insert(
            id,
            FixturePackage {
                manifest,
                documents: BTreeMap::new(),
            },
        );
        self
    }

    /// Add a resource stored as `<resourceType>-<id>.json`.
    pub fn resource(self, package: &str, resource: Value) -> Self {
        let filename = format!(
            "{}-{}.json",
            resource["resourceType"].as_str().expect("resourceType"),
            resource["id"].as_str().expect("id")
        );
        self.document(package, &filename, resource)
    }

    pub fn document(mut self, package: &str, filename: &str, document: Value) -> Self {
        let id = exact(package);
        self.packages
            .get_mut(&id)
            .unwrap_or_else(|| panic!("fixture package `{package}` not declared"))
            .documents
            .insert(filename.to_owned(), document);
        self
    }

    pub fn build(&self) -> MemoryPackageManager {
        let manager = MemoryPackageManager::new();
        for package in self.packages.values() {
            manager.add_package(
                package.manifest.clone(),
                package
                    .documents
                    .iter()
                    .map(|(name, doc)| (name.clone(), doc.clone())),
            );
        }
        manager
    }

    /// Write the graph in the FHIR package cache layout under `root`.
    ///
    /// With `with_index` unset no `.index.json` is written and readers must
    /// scan the documents.
    pub fn write_cache(&self, root: &Path, with_index: bool) {
        for (id, package) in &self.packages {
            let dir = root.join(id.key()).join("package");
            fs::create_dir_all(&dir).expect("create package dir");
            write_json(&dir.join("package.json"), &package.manifest);

            let mut files = Vec::new();
            for (name, doc) in &package.documents {
                write_json(&dir.join(name), doc);
                files.extend(ResourceMeta::from_resource(name.clone(), doc));
            }
            if with_index {
                write_json(&dir.join(".index.json"), &PackageIndexFile::new(files));
            }
        }
    }
}

fn write_json(path: &Path, value: &impl serde::Serialize) {
    let text = serde_json::to_string_pretty(value).expect("serialize fixture");
    fs::write(path, text).unwrap_or_else(|err| panic!("write {}: {err}", path.display()));
}

/// An on-disk package cache that is removed on drop.
pub struct TempPackageCache {
    dir: TempDir,
}

impl TempPackageCache {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manager(&self) -> FsPackageManager {
        FsPackageManager::new(self.dir.path())
    }
}

/// Write `graph` (with index files) into a fresh temporary package cache.
pub fn write_package_cache(graph: &PackageGraphBuilder) -> TempPackageCache {
    let dir = tempfile::tempdir().expect("tempdir");
    graph.write_cache(dir.path(), true);
    TempPackageCache { dir }
}
