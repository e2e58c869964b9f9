use fpx_core::{PackageId, PackageRef};
use fpx_packages::{FsPackageManager, PackageError, PackageManager};
use fpx_test_utils::{fhir_graph, write_package_cache, CORE, SDC};
use pretty_assertions::assert_eq;

fn id(reference: &str) -> PackageId {
    reference
        .parse::<PackageRef>()
        .unwrap()
        .as_exact()
        .unwrap()
}

#[tokio::test(flavor = "current_thread")]
async fn reads_manifest_and_index_from_cache_layout() {
    let cache = write_package_cache(&fhir_graph());
    let manager = cache.manager();
    let sdc = id(SDC);

    manager.install(&sdc).await.unwrap();
    let manifest = manager.manifest(&sdc).await.unwrap().unwrap();
    assert_eq!(manifest.package_id(), sdc);

    let deps = manager.dependencies(&sdc).await.unwrap();
    assert_eq!(
        deps.into_iter().collect::<Vec<_>>(),
        vec![("hl7.fhir.r4.core".to_owned(), "4.0.1".to_owned())]
    );

    let index = manager.package_index(&sdc).await.unwrap();
    let mut names: Vec<_> = index.files.iter().map(|f| f.filename.as_str()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "StructureDefinition-sdc-questionnaire.json",
            "ValueSet-observation-status.json"
        ]
    );
    assert_eq!(manager.cache_path(), Some(cache.path()));
}

#[tokio::test(flavor = "current_thread")]
async fn scans_documents_when_index_file_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    fhir_graph().write_cache(dir.path(), false);
    let manager = FsPackageManager::new(dir.path());

    let index = manager.package_index(&id(CORE)).await.unwrap();
    assert_eq!(index.files.len(), 6);
    let observation = index
        .files
        .iter()
        .find(|f| f.id.as_deref() == Some("Observation"))
        .unwrap();
    assert_eq!(observation.filename, "StructureDefinition-Observation.json");
    assert_eq!(
        observation.url.as_deref(),
        Some("http://hl7.org/fhir/StructureDefinition/Observation")
    );
}

#[tokio::test(flavor = "current_thread")]
async fn missing_packages_are_reported() {
    let cache = write_package_cache(&fhir_graph());
    let manager = cache.manager();

    let err = manager
        .install(&PackageId::new("hl7.fhir.r5.core", "5.0.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, PackageError::NotInstalled { .. }));

    let resolved = manager
        .to_package_id(&PackageRef::unversioned("hl7.fhir.r4.core"))
        .await
        .unwrap();
    assert_eq!(resolved, id(CORE));

    let err = manager
        .read_document(&id(CORE), "StructureDefinition-Missing.json")
        .await
        .unwrap_err();
    assert!(matches!(err, PackageError::DocumentNotFound { .. }));
}

#[tokio::test(flavor = "current_thread")]
async fn reads_documents_from_package_dir() {
    let cache = write_package_cache(&fhir_graph());
    let manager = cache.manager();
    let doc = manager
        .read_document(&id(CORE), "StructureDefinition-Patient.json")
        .await
        .unwrap();
    assert_eq!(doc["url"], "http://hl7.org/fhir/StructureDefinition/Patient");
}
