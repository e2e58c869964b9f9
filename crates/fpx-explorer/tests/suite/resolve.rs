use std::sync::Arc;

use fpx_core::LookupFilter;
use fpx_explorer::{Explorer, ExplorerError};
use fpx_test_utils::{fhir_graph, value_set, EXTENSIONS, IG_BUNDLE, SDC};
use pretty_assertions::assert_eq;

use super::{fhir_explorer, fhir_options, filter, id};

#[tokio::test(flavor = "current_thread")]
async fn single_match_resolves_to_document() {
    let (_, explorer) = fhir_explorer().await;
    let document = explorer
        .resolve(&filter("resourceType=StructureDefinition,name=Patient"))
        .await
        .unwrap();
    assert_eq!(document["id"], "Patient");
    assert_eq!(document["__packageId"], "hl7.fhir.r4.core");
    assert_eq!(document["__packageVersion"], "4.0.1");
    assert_eq!(document["__filename"], "StructureDefinition-Patient.json");
}

#[tokio::test(flavor = "current_thread")]
async fn lone_core_copy_wins_over_other_packages() {
    let (_, explorer) = fhir_explorer().await;
    let entry = explorer
        .resolve_meta(&LookupFilter::new().url("http://hl7.org/fhir/ValueSet/observation-status"))
        .await
        .unwrap();
    assert_eq!(entry.package_id, "hl7.fhir.r4.core");
}

#[tokio::test(flavor = "current_thread")]
async fn explicit_package_overrides_core() {
    let (_, explorer) = fhir_explorer().await;
    let entry = explorer
        .resolve_meta(
            &LookupFilter::new()
                .url("http://hl7.org/fhir/ValueSet/observation-status")
                .package(id(SDC)),
        )
        .await
        .unwrap();
    assert!(entry.is_from(&id(SDC)));
}

#[tokio::test(flavor = "current_thread")]
async fn implicit_packages_win_over_core() {
    let (_, explorer) = fhir_explorer().await;

    let act_code = explorer
        .resolve_meta(
            &LookupFilter::new()
                .resource_type("ValueSet")
                .url("http://terminology.hl7.org/ValueSet/v3-ActCode"),
        )
        .await
        .unwrap();
    assert_eq!(act_code.package_id, "hl7.terminology.r4");
    assert_eq!(act_code.meta.version.as_deref(), Some("2.0.0"));

    let absent_reason = explorer
        .resolve_meta(
            &LookupFilter::new().url("http://hl7.org/fhir/StructureDefinition/data-absent-reason"),
        )
        .await
        .unwrap();
    assert!(absent_reason.is_from(&id(EXTENSIONS)));
}

#[tokio::test(flavor = "current_thread")]
async fn terminology_copy_wins_over_ig_republication() {
    // SDC ships its own copy of a terminology ValueSet next to core and terminology.
    let manager = fhir_graph()
        .resource(
            SDC,
            value_set(
                "v3-ActCode",
                "http://terminology.hl7.org/ValueSet/v3-ActCode",
                "2.0.0",
            ),
        )
        .build();
    let explorer = Explorer::create(Arc::new(manager), fhir_options())
        .await
        .unwrap();
    let query = LookupFilter::new()
        .resource_type("ValueSet")
        .url("http://terminology.hl7.org/ValueSet/v3-ActCode");

    assert_eq!(explorer.lookup_meta(&query).await.unwrap().len(), 3);
    let entry = explorer.resolve_meta(&query).await.unwrap();
    assert_eq!(entry.package_id, "hl7.terminology.r4");

    // Naming the IG still picks its copy.
    let entry = explorer.resolve_meta(&query.package(id(SDC))).await.unwrap();
    assert!(entry.is_from(&id(SDC)));
}

#[tokio::test(flavor = "current_thread")]
async fn newest_semver_in_one_package_wins() {
    let (_, explorer) = fhir_explorer().await;
    let document = explorer
        .resolve(&LookupFilter::new().url("http://example.org/fhir/StructureDefinition/thing"))
        .await
        .unwrap();
    assert_eq!(document["id"], "thing-v2");
    assert_eq!(document["version"], "1.2.0");
}

#[tokio::test(flavor = "current_thread")]
async fn unrelated_copies_stay_ambiguous() {
    let (_, explorer) = fhir_explorer().await;
    let shared = LookupFilter::new().url("http://example.org/fhir/StructureDefinition/shared");

    let err = explorer.resolve_meta(&shared).await.unwrap_err();
    match &err {
        ExplorerError::Ambiguous { candidates, .. } => assert_eq!(
            candidates,
            &vec![
                "example.ig.a@1.0.0 (StructureDefinition-shared.json)".to_owned(),
                "example.ig.b@1.0.0 (StructureDefinition-shared.json)".to_owned(),
            ]
        ),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_lookup_failure());

    // the bundle only re-exports both IGs, so naming it does not help
    let err = explorer
        .resolve_meta(&shared.package(id(IG_BUNDLE)))
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::Ambiguous { .. }), "{err}");
}

#[tokio::test(flavor = "current_thread")]
async fn nothing_matching_is_an_error() {
    let (_, explorer) = fhir_explorer().await;
    let err = explorer
        .resolve(&filter("resourceType=StructureDefinition,id=Nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::NoMatch { .. }), "{err}");
    assert!(err.is_lookup_failure());
}

#[tokio::test(flavor = "current_thread")]
async fn resolution_is_repeatable() {
    let (_, explorer) = fhir_explorer().await;
    let query = LookupFilter::new().url("http://hl7.org/fhir/ValueSet/observation-status");
    let first = explorer.resolve(&query).await.unwrap();
    let second = explorer.resolve(&query).await.unwrap();
    assert_eq!(first, second);
}
