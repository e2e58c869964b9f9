use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fpx_config::{ConfigError, ExplorerConfig};
use fpx_core::{IndexEntry, LookupFilter, PackageId, PackageRef};
use fpx_packages::{PackageError, PackageManager, PackageManifest};
use serde::Serialize;
use serde_json::Value;

use crate::cache::{BoundedCache, CacheStats};
use crate::closure::{dependency_closure, minimal_roots, union_scope};
use crate::index::PackageIndex;
use crate::policy::{DuplicateResolver, ImplicitPackagePolicy, PolicyContext};
use crate::{ExplorerError, Logger, NoopLogger};

/// Capacities of the explorer's caches; `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLimits {
    pub index_packages: Option<usize>,
    pub documents: Option<usize>,
    pub closures: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ExplorerOptions {
    pub context: Vec<PackageRef>,
    pub skip_examples: bool,
    pub cache: CacheLimits,
    pub policy: ImplicitPackagePolicy,
}

impl ExplorerOptions {
    pub fn new(context: impl IntoIterator<Item = PackageRef>) -> Self {
        Self {
            context: context.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Default for ExplorerOptions {
    fn default() -> Self {
        Self {
            context: Vec::new(),
            skip_examples: true,
            cache: CacheLimits::default(),
            policy: ImplicitPackagePolicy::default(),
        }
    }
}

impl TryFrom<&ExplorerConfig> for ExplorerOptions {
    type Error = ConfigError;

    fn try_from(config: &ExplorerConfig) -> Result<Self, Self::Error> {
        let policy = ImplicitPackagePolicy::from_config(&config.policy)
            .map_err(|err| ConfigError::Invalid(format!("policy: {err}")))?;
        Ok(Self {
            context: config.context_refs()?,
            skip_examples: config.skip_examples,
            cache: CacheLimits {
                index_packages: config.cache.index_packages,
                documents: config.cache.documents,
                closures: config.cache.closures,
            },
            policy,
        })
    }
}

/// Entry counts and hit rates of every explorer cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExplorerCacheStats {
    pub indexes: CacheStats,
    pub documents: CacheStats,
    pub closures: CacheStats,
}

/// Query engine over the canonical scope of a package context.
///
/// The scope is resolved once by [`Explorer::create`]; package indexes,
/// documents and dependency closures are cached lazily afterwards. All caches
/// are add-if-absent, so concurrent queries on a shared explorer are safe.
pub struct Explorer {
    manager: Arc<dyn PackageManager>,
    logger: Arc<dyn Logger>,
    skip_examples: bool,
    policy: ImplicitPackagePolicy,
    resolver: DuplicateResolver,
    roots: Vec<PackageId>,
    scope: Vec<PackageId>,
    indexes: BoundedCache<PackageId, Arc<PackageIndex>>,
    documents: BoundedCache<PathBuf, Arc<Value>>,
    closures: BoundedCache<PackageId, Arc<Vec<PackageId>>>,
}

impl Explorer {
    pub async fn create(
        manager: Arc<dyn PackageManager>,
        options: ExplorerOptions,
    ) -> Result<Self, ExplorerError> {
        Self::create_with_logger(manager, options, Arc::new(NoopLogger)).await
    }

    pub async fn create_with_logger(
        manager: Arc<dyn PackageManager>,
        options: ExplorerOptions,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, ExplorerError> {
        let mut explorer = Self {
            manager,
            logger,
            skip_examples: options.skip_examples,
            policy: options.policy,
            resolver: DuplicateResolver::default(),
            roots: Vec::new(),
            scope: Vec::new(),
            indexes: BoundedCache::new("indexes", options.cache.index_packages),
            documents: BoundedCache::new("documents", options.cache.documents),
            closures: BoundedCache::new("closures", options.cache.closures),
        };
        explorer.resolve_context(&options.context).await?;
        Ok(explorer)
    }

    async fn resolve_context(&mut self, context: &[PackageRef]) -> Result<(), ExplorerError> {
        let mut seen = HashSet::new();
        let mut initial = Vec::new();
        for reference in context {
            let package = self
                .manager
                .to_package_id(reference)
                .await
                .map_err(init_error(reference))?;
            if seen.insert(package.clone()) {
                initial.push(package);
            }
        }

        let mut closures = Vec::with_capacity(initial.len());
        for root in initial {
            self.manager.install(&root).await.map_err(init_error(&root))?;
            let closure = dependency_closure(
                self.manager.as_ref(),
                &root,
                self.skip_examples,
                self.logger.as_ref(),
            )
            .await
            .map_err(init_error(&root))?;
            self.closures
                .get_or_insert(root.clone(), Arc::new(closure.clone()));
            closures.push((root, closure));
        }

        let roots = minimal_roots(&closures);
        let scope = union_scope(&roots, &closures);
        for package in &scope {
            self.manager
                .install(package)
                .await
                .map_err(init_error(package))?;
        }

        self.logger.info(&format!(
            "context resolved: {} root(s), {} package(s) in scope",
            roots.len(),
            scope.len()
        ));
        self.roots = roots;
        self.scope = scope;
        Ok(())
    }

    /// The canonical scope: every package searched, sorted by id then version.
    pub fn context_packages(&self) -> &[PackageId] {
        &self.scope
    }

    /// The non-redundant subset of the context's roots, sorted.
    pub fn normalized_root_packages(&self) -> &[PackageId] {
        &self.roots
    }

    pub fn cache_path(&self) -> Option<&Path> {
        self.manager.cache_path()
    }

    pub fn cache_stats(&self) -> ExplorerCacheStats {
        ExplorerCacheStats {
            indexes: self.indexes.stats(),
            documents: self.documents.stats(),
            closures: self.closures.stats(),
        }
    }

    async fn to_package_id(&self, reference: &PackageRef) -> Result<PackageId, ExplorerError> {
        self.manager
            .to_package_id(reference)
            .await
            .map_err(ExplorerError::upstream(format!("resolve package {reference}")))
    }

    async fn closure_of(&self, package: &PackageId) -> Result<Arc<Vec<PackageId>>, ExplorerError> {
        if let Some(closure) = self.closures.get(package) {
            return Ok(closure);
        }
        let closure = dependency_closure(
            self.manager.as_ref(),
            package,
            self.skip_examples,
            self.logger.as_ref(),
        )
        .await
        .map_err(ExplorerError::upstream(format!(
            "expand dependencies of {package}"
        )))?;
        Ok(self
            .closures
            .get_or_insert(package.clone(), Arc::new(closure)))
    }

    /// `package` plus its transitive dependencies, sorted.
    pub async fn expand_package_dependencies(
        &self,
        package: &PackageRef,
    ) -> Result<Vec<PackageId>, ExplorerError> {
        let package = self.to_package_id(package).await?;
        Ok(self.closure_of(&package).await?.as_ref().clone())
    }

    /// Direct dependency declarations of `package`, sorted.
    pub async fn direct_dependencies(
        &self,
        package: &PackageRef,
    ) -> Result<Vec<PackageId>, ExplorerError> {
        let package = self.to_package_id(package).await?;
        let dependencies = self
            .manager
            .dependencies(&package)
            .await
            .map_err(ExplorerError::upstream(format!("read dependencies of {package}")))?;
        Ok(dependencies
            .into_iter()
            .map(|(id, version)| PackageId::new(id, version))
            .collect())
    }

    pub async fn package_manifest(
        &self,
        package: &PackageRef,
    ) -> Result<PackageManifest, ExplorerError> {
        let package = self.to_package_id(package).await?;
        self.manager
            .manifest(&package)
            .await
            .map_err(ExplorerError::upstream(format!("read manifest of {package}")))?
            .ok_or_else(|| ExplorerError::ManifestUnavailable {
                package: package.to_string(),
            })
    }

    async fn ensure_indexed(&self, package: &PackageId) -> Result<Arc<PackageIndex>, ExplorerError> {
        if let Some(index) = self.indexes.get(package) {
            return Ok(index);
        }
        let file = self
            .manager
            .package_index(package)
            .await
            .map_err(ExplorerError::upstream(format!("read index of {package}")))?;
        let index = Arc::new(PackageIndex::build(package.clone(), file));
        self.logger
            .debug(&format!("indexed {package}: {} entries", index.len()));
        Ok(self.indexes.get_or_insert(package.clone(), index))
    }

    /// Matches across the scope, deduplicated by `(filename, package)`, plus
    /// the resolved `package` of the filter when it has one.
    async fn collect_matches(
        &self,
        filter: &LookupFilter,
    ) -> Result<(Vec<Arc<IndexEntry>>, Option<PackageId>), ExplorerError> {
        let (restriction, package) = match filter.package_ref() {
            Some(reference) => {
                let package = self.to_package_id(reference).await?;
                let closure = self.closure_of(&package).await?;
                let allowed: HashSet<PackageId> = closure.iter().cloned().collect();
                (Some(allowed), Some(package))
            }
            None => (None, None),
        };

        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        for scoped in &self.scope {
            if restriction
                .as_ref()
                .is_some_and(|allowed| !allowed.contains(scoped))
            {
                continue;
            }
            let index = self.ensure_indexed(scoped).await?;
            for entry in index.query(filter) {
                let key = (
                    entry.filename().to_owned(),
                    entry.package_id.clone(),
                    entry.package_version.clone(),
                );
                if seen.insert(key) {
                    matches.push(entry);
                }
            }
        }
        Ok((matches, package))
    }

    /// Metadata of every document matching `filter`.
    pub async fn lookup_meta(
        &self,
        filter: &LookupFilter,
    ) -> Result<Vec<Arc<IndexEntry>>, ExplorerError> {
        let filter = filter.normalize();
        Ok(self.collect_matches(&filter).await?.0)
    }

    /// Every matching document, enriched with its owning package and filename.
    pub async fn lookup(&self, filter: &LookupFilter) -> Result<Vec<Value>, ExplorerError> {
        let entries = self.lookup_meta(filter).await?;
        let mut documents = Vec::with_capacity(entries.len());
        for entry in &entries {
            documents.push(self.enriched_document(entry).await?);
        }
        Ok(documents)
    }

    /// The single entry matching `filter`, after duplicate resolution.
    pub async fn resolve_meta(
        &self,
        filter: &LookupFilter,
    ) -> Result<Arc<IndexEntry>, ExplorerError> {
        let normalized = filter.normalize();
        let (matches, package) = self.collect_matches(&normalized).await?;
        if matches.is_empty() {
            return Err(ExplorerError::NoMatch {
                filter: filter.to_string(),
            });
        }

        let cx = PolicyContext {
            filter: &normalized,
            package: package.as_ref(),
            policy: &self.policy,
        };
        let resolution = self.resolver.resolve(matches, &cx);
        if let Some(entry) = resolution.unique() {
            if let Some(rule) = resolution.rule {
                self.logger.debug(&format!(
                    "{filter}: picked {} from {} by {rule}",
                    entry.filename(),
                    entry.package()
                ));
            }
            return Ok(entry.clone());
        }

        let candidates: Vec<String> = resolution
            .entries
            .iter()
            .map(|e| format!("{} ({})", e.package(), e.filename()))
            .collect();
        self.logger.warn(&format!(
            "{filter}: {} candidates left unresolved",
            candidates.len()
        ));
        Err(ExplorerError::Ambiguous {
            filter: filter.to_string(),
            candidates,
        })
    }

    /// The single document matching `filter`, enriched like [`Explorer::lookup`].
    pub async fn resolve(&self, filter: &LookupFilter) -> Result<Value, ExplorerError> {
        let entry = self.resolve_meta(filter).await?;
        self.enriched_document(&entry).await
    }

    async fn document(&self, entry: &IndexEntry) -> Result<Arc<Value>, ExplorerError> {
        let package = entry.package();
        let path = self.manager.package_dir(&package).join(entry.filename());
        if let Some(document) = self.documents.get(&path) {
            return Ok(document);
        }
        let document = self
            .manager
            .read_document(&package, entry.filename())
            .await
            .map_err(ExplorerError::upstream(format!(
                "read {} from {package}",
                entry.filename()
            )))?;
        Ok(self.documents.get_or_insert(path, Arc::new(document)))
    }

    async fn enriched_document(&self, entry: &IndexEntry) -> Result<Value, ExplorerError> {
        let document = self.document(entry).await?;
        Ok(enrich(&document, entry))
    }
}

fn init_error(package: impl fmt::Display) -> impl FnOnce(PackageError) -> ExplorerError {
    let package = package.to_string();
    move |source| ExplorerError::Initialization { package, source }
}

fn enrich(document: &Value, entry: &IndexEntry) -> Value {
    let mut enriched = document.clone();
    if let Value::Object(map) = &mut enriched {
        map.insert("__packageId".to_owned(), entry.package_id.clone().into());
        map.insert(
            "__packageVersion".to_owned(),
            entry.package_version.clone().into(),
        );
        map.insert("__filename".to_owned(), entry.filename().into());
    }
    enriched
}
