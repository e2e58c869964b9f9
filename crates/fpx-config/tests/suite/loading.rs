use fpx_config::{ConfigError, ExplorerConfig, ImplicitFamilyConfig, PolicyConfig};
use fpx_core::PackageRef;
use pretty_assertions::assert_eq;

#[test]
fn empty_file_yields_defaults() {
    let config = ExplorerConfig::load_from_str("").unwrap();
    assert_eq!(config, ExplorerConfig::default());
    assert!(config.skip_examples);
    assert_eq!(config.policy, PolicyConfig::default());
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn loads_full_config_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fpx.toml");
    std::fs::write(
        &path,
        r#"
context = ["hl7.fhir.uv.sdc@3.0.0", "hl7.terminology.r4"]
cache_path = "/var/cache/fhir"
skip_examples = false

[cache]
index_packages = 16
documents = 256

[policy]
core_patterns = ['^acme\.core$']

[[policy.implicit]]
name = "acme-terminology"
patterns = ['^acme\.terminology$']
resource_types = ["ValueSet"]

[logging]
level = "debug"
json = true
"#,
    )
    .unwrap();

    let config = ExplorerConfig::load_from_path(&path).unwrap();
    assert_eq!(
        config.context_refs().unwrap(),
        vec![
            PackageRef::new("hl7.fhir.uv.sdc", "3.0.0"),
            PackageRef::unversioned("hl7.terminology.r4"),
        ]
    );
    assert_eq!(config.cache_path.as_deref(), Some(std::path::Path::new("/var/cache/fhir")));
    assert!(!config.skip_examples);
    assert_eq!(config.cache.index_packages, Some(16));
    assert_eq!(config.cache.closures, None);
    assert_eq!(
        config.policy.implicit,
        vec![ImplicitFamilyConfig {
            name: "acme-terminology".to_owned(),
            patterns: vec![r"^acme\.terminology$".to_owned()],
            resource_types: vec!["ValueSet".to_owned()],
        }]
    );
    assert!(config.logging.json);
    assert!(config.logging.stderr);
}

#[test]
fn rejects_invalid_patterns_and_references() {
    let err = ExplorerConfig::load_from_str("[policy]\ncore_patterns = ['(']\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "{err}");

    let err = ExplorerConfig::load_from_str("context = ['pkg@']\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "{err}");

    let err = ExplorerConfig::load_from_str("context = 3\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err}");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ExplorerConfig::load_from_path(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
