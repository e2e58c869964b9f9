use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("package `{package}` is not installed")]
    NotInstalled { package: String },

    #[error("document `{filename}` not found in package `{package}`")]
    DocumentNotFound { package: String, filename: String },

    #[error("failed to read `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{path}`")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
