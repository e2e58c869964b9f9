use std::sync::Arc;

use fpx_core::{LookupFilter, PackageRef};
use fpx_explorer::{CacheLimits, Explorer, ExplorerOptions, Logger};
use fpx_test_utils::{fhir_graph, CORE, IG_A, SDC};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::{fhir_explorer, fhir_explorer_with, fhir_options, filter, id};

fn limits(cache: CacheLimits) -> ExplorerOptions {
    ExplorerOptions {
        cache,
        ..fhir_options()
    }
}

#[tokio::test(flavor = "current_thread")]
async fn package_index_is_read_once() {
    let (manager, explorer) = fhir_explorer().await;
    for query in [
        "resourceType=StructureDefinition,id=Observation",
        "resourceType=StructureDefinition,id=Patient",
        "url=http://hl7.org/fhir/ValueSet/observation-status",
    ] {
        explorer.lookup_meta(&filter(query)).await.unwrap();
    }
    assert_eq!(manager.index_reads(&id(CORE)), 1);
    assert_eq!(manager.index_reads(&id(SDC)), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn documents_are_parsed_once() {
    let (manager, explorer) = fhir_explorer().await;
    let observation = filter("resourceType=StructureDefinition,id=Observation");
    explorer.resolve(&observation).await.unwrap();
    explorer.resolve(&observation).await.unwrap();
    assert_eq!(manager.document_reads(&id(CORE)), 1);

    let stats = explorer.cache_stats();
    assert_eq!(stats.documents.entries, 1);
    assert_eq!(stats.documents.hits, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn bounded_document_cache_evicts() {
    let (manager, explorer) = fhir_explorer_with(limits(CacheLimits {
        documents: Some(1),
        ..CacheLimits::default()
    }))
    .await;
    for name in ["Observation", "Patient", "Observation"] {
        explorer
            .resolve(&LookupFilter::new().resource_type("StructureDefinition").id(name))
            .await
            .unwrap();
    }
    assert_eq!(manager.document_reads(&id(CORE)), 3);
    assert_eq!(explorer.cache_stats().documents.entries, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn zero_capacity_disables_index_caching() {
    let (manager, explorer) = fhir_explorer_with(limits(CacheLimits {
        index_packages: Some(0),
        ..CacheLimits::default()
    }))
    .await;
    let query = filter("resourceType=StructureDefinition,id=Observation");
    explorer.lookup_meta(&query).await.unwrap();
    explorer.lookup_meta(&query).await.unwrap();
    assert_eq!(manager.index_reads(&id(CORE)), 2);
    assert_eq!(explorer.cache_stats().indexes.entries, 0);
}

#[tokio::test(flavor = "current_thread")]
async fn context_closures_are_reused() {
    let (_, explorer) = fhir_explorer().await;
    // one closure per distinct context root
    assert_eq!(explorer.cache_stats().closures.entries, 5);

    explorer
        .expand_package_dependencies(&id(SDC).into())
        .await
        .unwrap();
    explorer
        .expand_package_dependencies(&id(IG_A).into())
        .await
        .unwrap();

    let closures = explorer.cache_stats().closures;
    assert_eq!(closures.entries, 6);
    assert_eq!(closures.hits, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_agree() {
    let (_, explorer) = fhir_explorer().await;
    let explorer = Arc::new(explorer);
    let queries = [
        "url=http://hl7.org/fhir/ValueSet/observation-status",
        "url=http://terminology.hl7.org/ValueSet/v3-ActCode",
        "url=http://hl7.org/fhir/StructureDefinition/data-absent-reason",
        "url=http://example.org/fhir/StructureDefinition/thing",
    ];

    let mut handles = Vec::new();
    for _ in 0..8 {
        for query in queries {
            let explorer = Arc::clone(&explorer);
            handles.push(tokio::spawn(async move {
                let doc = explorer.resolve(&filter(query)).await.unwrap();
                (query, doc["__packageId"].as_str().unwrap().to_owned())
            }));
        }
    }

    let mut winners = std::collections::BTreeMap::new();
    for handle in handles {
        let (query, package) = handle.await.unwrap();
        if let Some(previous) = winners.insert(query, package.clone()) {
            assert_eq!(previous, package, "{query}");
        }
    }
    assert_eq!(
        winners.into_values().collect::<Vec<_>>(),
        vec![
            "example.ig.a",
            "hl7.fhir.uv.extensions.r4",
            "hl7.fhir.r4.core",
            "hl7.terminology.r4",
        ]
    );
}

#[derive(Default)]
struct RecordingLogger {
    lines: Mutex<Vec<String>>,
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        self.lines.lock().push(format!("info: {message}"));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().push(format!("warn: {message}"));
    }
}

#[tokio::test(flavor = "current_thread")]
async fn injected_logger_receives_events() {
    let logger = Arc::new(RecordingLogger::default());
    let explorer = Explorer::create_with_logger(
        Arc::new(fhir_graph().build()),
        ExplorerOptions::new([PackageRef::from(id(IG_A)), id(CORE).into()]),
        logger.clone(),
    )
    .await
    .unwrap();

    explorer
        .resolve_meta(&LookupFilter::new().url("http://example.org/fhir/StructureDefinition/nowhere"))
        .await
        .unwrap_err();

    let lines = logger.lines.lock().clone();
    assert_eq!(
        lines,
        vec!["info: context resolved: 1 root(s), 2 package(s) in scope".to_owned()]
    );
}
