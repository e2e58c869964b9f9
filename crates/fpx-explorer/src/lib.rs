//! Package-context explorer for FHIR packages.
//!
//! An [`Explorer`] is created from a list of root packages. It resolves their
//! dependency closures once, drops redundant roots, and then answers metadata
//! and document queries across the resulting scope. When several documents
//! match a query that expects one, an ordered chain of [`DuplicateRule`]s
//! decides which one wins.

mod cache;
mod closure;
mod error;
mod explorer;
mod index;
mod logger;
mod policy;

pub use cache::CacheStats;
pub use closure::EXAMPLES_MARKER;
pub use error::ExplorerError;
pub use explorer::{CacheLimits, Explorer, ExplorerCacheStats, ExplorerOptions};
pub use index::PackageIndex;
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use policy::{
    Candidates, DuplicateResolver, DuplicateRule, ExplicitPackage, ImplicitFamily,
    ImplicitFamilyBias, ImplicitOverCore, ImplicitPackagePolicy, ImplicitVersionBias,
    PolicyContext, Resolution, SemverCollapse,
};
