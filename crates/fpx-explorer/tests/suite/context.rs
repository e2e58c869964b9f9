use std::sync::Arc;

use fpx_core::{PackageId, PackageRef};
use fpx_explorer::{Explorer, ExplorerError, ExplorerOptions};
use fpx_packages::PackageError;
use fpx_test_utils::{
    fhir_context, fhir_graph, write_package_cache, CORE, EXTENSIONS, IG_A, IG_B, IG_BUNDLE, SDC,
    TERMINOLOGY,
};
use pretty_assertions::assert_eq;

use super::{fhir_explorer, fhir_explorer_with, fhir_options, id};

fn ids(references: &[&str]) -> Vec<PackageId> {
    references.iter().map(|r| id(r)).collect()
}

#[tokio::test(flavor = "current_thread")]
async fn scope_is_the_sorted_union_of_root_closures() {
    let (_, explorer) = fhir_explorer().await;
    assert_eq!(
        explorer.context_packages(),
        ids(&[IG_A, IG_B, IG_BUNDLE, CORE, EXTENSIONS, SDC, TERMINOLOGY])
    );
}

#[tokio::test(flavor = "current_thread")]
async fn covered_roots_are_dropped() {
    let (_, explorer) = fhir_explorer().await;
    assert_eq!(
        explorer.normalized_root_packages(),
        ids(&[IG_BUNDLE, EXTENSIONS, SDC, TERMINOLOGY])
    );
}

#[tokio::test(flavor = "current_thread")]
async fn context_order_and_duplicates_do_not_matter() {
    let (_, forward) = fhir_explorer().await;

    let mut context: Vec<PackageRef> = fhir_context()
        .iter()
        .rev()
        .map(|r| r.parse().unwrap())
        .collect();
    context.push(PackageRef::unversioned("hl7.fhir.uv.sdc"));
    context.push(id(CORE).into());
    let (_, reversed) = fhir_explorer_with(ExplorerOptions::new(context)).await;

    assert_eq!(forward.context_packages(), reversed.context_packages());
    assert_eq!(
        forward.normalized_root_packages(),
        reversed.normalized_root_packages()
    );
}

#[tokio::test(flavor = "current_thread")]
async fn expands_dependencies_of_any_installed_package() {
    let (_, explorer) = fhir_explorer().await;

    let sdc = explorer
        .expand_package_dependencies(&PackageRef::unversioned("hl7.fhir.uv.sdc"))
        .await
        .unwrap();
    assert_eq!(sdc, ids(&[CORE, SDC]));

    let bundle = explorer
        .expand_package_dependencies(&id(IG_BUNDLE).into())
        .await
        .unwrap();
    assert_eq!(bundle, ids(&[IG_A, IG_B, IG_BUNDLE, CORE]));
}

#[tokio::test(flavor = "current_thread")]
async fn direct_dependencies_include_undownloaded_examples() {
    let (_, explorer) = fhir_explorer().await;
    let deps = explorer
        .direct_dependencies(&id(IG_A).into())
        .await
        .unwrap();
    assert_eq!(deps, ids(&["example.ig.a.examples@1.0.0", CORE]));
}

#[tokio::test(flavor = "current_thread")]
async fn reads_package_manifest() {
    let (_, explorer) = fhir_explorer().await;
    let manifest = explorer.package_manifest(&id(SDC).into()).await.unwrap();
    assert_eq!(manifest.name, "hl7.fhir.uv.sdc");
    assert_eq!(manifest.version, "3.0.0");
    assert_eq!(
        manifest.dependencies.get("hl7.fhir.r4.core").map(String::as_str),
        Some("4.0.1")
    );
}

#[tokio::test(flavor = "current_thread")]
async fn walking_examples_fails_when_they_are_not_installed() {
    let manager = Arc::new(fhir_graph().build());
    let options = ExplorerOptions {
        skip_examples: false,
        ..fhir_options()
    };
    let err = Explorer::create(manager, options).await.err().unwrap();
    match err {
        ExplorerError::Initialization { package, source } => {
            assert_eq!(package, "example.ig.bundle@1.0.0");
            assert!(matches!(source, PackageError::NotInstalled { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn unknown_context_package_fails_initialization() {
    let manager = Arc::new(fhir_graph().build());
    let options = ExplorerOptions::new([id(CORE).into(), PackageRef::unversioned("nope")]);
    let err = Explorer::create(manager, options).await.err().unwrap();
    assert!(
        matches!(&err, ExplorerError::Initialization { package, .. } if package == "nope"),
        "{err}"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn filesystem_cache_yields_the_same_context() {
    let cache = write_package_cache(&fhir_graph());
    let explorer = Explorer::create(Arc::new(cache.manager()), fhir_options())
        .await
        .unwrap();
    let (_, in_memory) = fhir_explorer().await;

    assert_eq!(explorer.context_packages(), in_memory.context_packages());
    assert_eq!(
        explorer.normalized_root_packages(),
        in_memory.normalized_root_packages()
    );
    assert_eq!(explorer.cache_path(), Some(cache.path()));
    assert_eq!(in_memory.cache_path(), None);
}

#[tokio::test(flavor = "current_thread")]
async fn missing_manifest_is_reported() {
    let cache = write_package_cache(&fhir_graph());
    let explorer = Explorer::create(Arc::new(cache.manager()), fhir_options())
        .await
        .unwrap();
    let err = explorer
        .package_manifest(&PackageRef::new("not.downloaded", "1.0.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::ManifestUnavailable { .. }), "{err}");
}
