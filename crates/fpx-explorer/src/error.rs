use fpx_packages::PackageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("failed to initialize context package `{package}`")]
    Initialization {
        package: String,
        #[source]
        source: PackageError,
    },

    #[error("no resources match {filter}")]
    NoMatch { filter: String },

    #[error("multiple resources match {filter}: {}", .candidates.join(", "))]
    Ambiguous {
        filter: String,
        /// `id@version (filename)` of every unresolved candidate.
        candidates: Vec<String>,
    },

    #[error("manifest unavailable for package `{package}`")]
    ManifestUnavailable { package: String },

    #[error("failed to {operation}")]
    Upstream {
        operation: String,
        #[source]
        source: PackageError,
    },
}

impl ExplorerError {
    pub(crate) fn upstream(operation: impl Into<String>) -> impl FnOnce(PackageError) -> Self {
        let operation = operation.into();
        move |source| ExplorerError::Upstream { operation, source }
    }

    /// Whether the failure is a query outcome (nothing or too much matched)
    /// rather than an operational error.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            ExplorerError::NoMatch { .. } | ExplorerError::Ambiguous { .. }
        )
    }
}
