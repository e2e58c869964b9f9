mod caching;
mod context;
mod resolve;

use std::sync::Arc;

use fpx_core::{LookupFilter, PackageId, PackageRef};
use fpx_explorer::{Explorer, ExplorerOptions};
use fpx_packages::MemoryPackageManager;
use fpx_test_utils::{fhir_context, fhir_graph};

pub(crate) fn id(reference: &str) -> PackageId {
    reference
        .parse::<PackageRef>()
        .unwrap()
        .as_exact()
        .unwrap()
}

pub(crate) fn fhir_options() -> ExplorerOptions {
    ExplorerOptions::new(fhir_context().iter().map(|r| r.parse().unwrap()))
}

pub(crate) fn filter(text: &str) -> LookupFilter {
    text.parse().unwrap()
}

pub(crate) async fn fhir_explorer_with(
    options: ExplorerOptions,
) -> (Arc<MemoryPackageManager>, Explorer) {
    let manager = Arc::new(fhir_graph().build());
    let explorer = Explorer::create(manager.clone(), options).await.unwrap();
    (manager, explorer)
}

pub(crate) async fn fhir_explorer() -> (Arc<MemoryPackageManager>, Explorer) {
    fhir_explorer_with(fhir_options()).await
}
