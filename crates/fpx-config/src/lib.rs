//! Configuration for fpx (`fpx.toml`) and tracing setup.

mod logging;

use std::path::{Path, PathBuf};

use fpx_core::PackageRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use logging::{init_tracing, LoggingConfig};

/// Environment variable pointing at an explicit config file.
pub const FPX_CONFIG_ENV_VAR: &str = "FPX_CONFIG";

pub const CONFIG_FILE_NAME: &str = "fpx.toml";

/// Default pattern recognizing core (base) packages such as `hl7.fhir.r4.core`.
pub const DEFAULT_CORE_PATTERN: &str = r"^hl7\.fhir\.r\d+[a-z]?\.core$";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Root packages (`id@version`, `id#version` or a bare `id`).
    pub context: Vec<String>,

    /// Package cache root. Falls back to `FPX_PACKAGE_CACHE`, then `~/.fhir/packages`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,

    /// Do not walk dependencies whose id contains `examples`.
    pub skip_examples: bool,

    pub cache: CacheConfig,
    pub policy: PolicyConfig,
    pub logging: LoggingConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            context: Vec::new(),
            cache_path: None,
            skip_examples: true,
            cache: CacheConfig::default(),
            policy: PolicyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Capacities of the explorer's in-memory caches. Unset means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Packages whose index entries are kept.
    pub index_packages: Option<usize>,
    /// Parsed documents kept (keyed by path).
    pub documents: Option<usize>,
    /// Dependency closures kept.
    pub closures: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Regexes recognizing core packages by id.
    pub core_patterns: Vec<String>,
    /// Implicit support-package families, preferred over core packages.
    pub implicit: Vec<ImplicitFamilyConfig>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            core_patterns: vec![DEFAULT_CORE_PATTERN.to_owned()],
            implicit: vec![
                ImplicitFamilyConfig {
                    name: "terminology".to_owned(),
                    patterns: vec![r"^hl7\.terminology(\.r\d+[a-z]?)?$".to_owned()],
                    resource_types: ["CodeSystem", "ValueSet", "ConceptMap", "NamingSystem"]
                        .into_iter()
                        .map(str::to_owned)
                        .collect(),
                },
                ImplicitFamilyConfig {
                    name: "extensions".to_owned(),
                    patterns: vec![r"^hl7\.fhir\.uv\.extensions(\.r\d+[a-z]?)?$".to_owned()],
                    resource_types: Vec::new(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplicitFamilyConfig {
    pub name: String,
    pub patterns: Vec<String>,
    /// Resource types this family is authoritative for. Empty means the
    /// family is preferred for every other resource type.
    #[serde(default)]
    pub resource_types: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // Keep the message only; the default Display embeds a source snippet.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl ExplorerConfig {
    /// Load and validate a config file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::load_from_str(&text)?;
        tracing::debug!(target: "fpx.config", path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: ExplorerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that context references parse and every pattern compiles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.context_refs()?;

        for pattern in &self.policy.core_patterns {
            check_pattern("policy.core_patterns", pattern)?;
        }
        for family in &self.policy.implicit {
            if family.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "policy.implicit entries need a non-empty `name`".to_owned(),
                ));
            }
            if family.patterns.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "policy.implicit `{}` has no patterns",
                    family.name
                )));
            }
            for pattern in &family.patterns {
                check_pattern(&format!("policy.implicit `{}`", family.name), pattern)?;
            }
        }
        Ok(())
    }

    pub fn context_refs(&self) -> Result<Vec<PackageRef>, ConfigError> {
        self.context
            .iter()
            .map(|raw| {
                raw.parse::<PackageRef>().map_err(|err| {
                    ConfigError::Invalid(format!("context entry `{raw}`: {err}"))
                })
            })
            .collect()
    }
}

fn check_pattern(location: &str, pattern: &str) -> Result<(), ConfigError> {
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|err| ConfigError::Invalid(format!("{location}: invalid pattern `{pattern}`: {err}")))
}

/// Locate the config file for `start`.
///
/// Search order:
/// 1) `$FPX_CONFIG` (relative paths are resolved against `start`)
/// 2) `fpx.toml` in `start` or the nearest ancestor that has one
pub fn discover_config_path(start: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(FPX_CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        let candidate = PathBuf::from(value);
        return Some(if candidate.is_absolute() {
            candidate
        } else {
            start.join(candidate)
        });
    }
    find_config_upwards(start)
}

fn find_config_upwards(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

/// Load the config for `start`, or the defaults when none is found.
pub fn load_for_dir(start: &Path) -> Result<(ExplorerConfig, Option<PathBuf>), ConfigError> {
    match discover_config_path(start) {
        Some(path) => Ok((ExplorerConfig::load_from_path(&path)?, Some(path))),
        None => Ok((ExplorerConfig::default(), None)),
    }
}
