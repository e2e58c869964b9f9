use serde_json::{json, Value};

use crate::PackageGraphBuilder;

pub const CORE: &str = "hl7.fhir.r4.core@4.0.1";
pub const SDC: &str = "hl7.fhir.uv.sdc@3.0.0";
pub const TERMINOLOGY: &str = "hl7.terminology.r4@5.0.0";
pub const EXTENSIONS: &str = "hl7.fhir.uv.extensions.r4@1.0.0";
pub const IG_A: &str = "example.ig.a@1.0.0";
pub const IG_B: &str = "example.ig.b@1.0.0";
pub const IG_BUNDLE: &str = "example.ig.bundle@1.0.0";

pub fn structure_definition(id: &str, url: &str, version: &str) -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "id": id,
        "url": url,
        "name": id,
        "version": version,
        "status": "active",
        "kind": "resource",
        "type": id,
        "derivation": "specialization"
    })
}

pub fn value_set(id: &str, url: &str, version: &str) -> Value {
    json!({
        "resourceType": "ValueSet",
        "id": id,
        "url": url,
        "name": id,
        "version": version,
        "status": "active"
    })
}

pub fn code_system(id: &str, url: &str, version: &str) -> Value {
    json!({
        "resourceType": "CodeSystem",
        "id": id,
        "url": url,
        "name": id,
        "version": version,
        "status": "active",
        "content": "complete"
    })
}

fn extension(id: &str, version: &str) -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "id": id,
        "url": format!("http://hl7.org/fhir/StructureDefinition/{id}"),
        "name": id,
        "version": version,
        "kind": "complex-type",
        "type": "Extension",
        "derivation": "constraint"
    })
}

/// A small FHIR R4 package graph.
///
/// ```text
/// hl7.fhir.uv.sdc@3.0.0 ──────────┐
/// hl7.fhir.uv.extensions.r4@1.0.0 ┼─> hl7.fhir.r4.core@4.0.1
/// example.ig.bundle ─> ig.a, ig.b ┘
/// example.ig.a ─> example.ig.a.examples (not installed)
/// hl7.terminology.r4@5.0.0
/// ```
///
/// Duplicates are planted for each tie-break: `observation-status` lives in
/// core and sdc, `v3-ActCode` in core and terminology, `data-absent-reason`
/// in core and extensions, `shared` in ig.a and ig.b, and ig.a carries two
/// versions of `thing`.
pub fn fhir_graph() -> PackageGraphBuilder {
    PackageGraphBuilder::new()
        .package(CORE, &[])
        .resource(
            CORE,
            structure_definition(
                "Observation",
                "http://hl7.org/fhir/StructureDefinition/Observation",
                "4.0.1",
            ),
        )
        .resource(
            CORE,
            structure_definition(
                "Patient",
                "http://hl7.org/fhir/StructureDefinition/Patient",
                "4.0.1",
            ),
        )
        .resource(CORE, extension("data-absent-reason", "4.0.1"))
        .resource(
            CORE,
            value_set(
                "observation-status",
                "http://hl7.org/fhir/ValueSet/observation-status",
                "4.0.1",
            ),
        )
        .resource(
            CORE,
            code_system(
                "observation-status",
                "http://hl7.org/fhir/observation-status",
                "4.0.1",
            ),
        )
        .resource(
            CORE,
            value_set(
                "v3-ActCode",
                "http://terminology.hl7.org/ValueSet/v3-ActCode",
                "2018-08-12",
            ),
        )
        .package(TERMINOLOGY, &[])
        .resource(
            TERMINOLOGY,
            value_set(
                "v3-ActCode",
                "http://terminology.hl7.org/ValueSet/v3-ActCode",
                "2.0.0",
            ),
        )
        .resource(
            TERMINOLOGY,
            code_system(
                "v3-ActCode",
                "http://terminology.hl7.org/CodeSystem/v3-ActCode",
                "2.0.0",
            ),
        )
        .package(EXTENSIONS, &[CORE])
        .resource(EXTENSIONS, extension("data-absent-reason", "1.0.0"))
        .package(SDC, &[CORE])
        .resource(
            SDC,
            structure_definition(
                "sdc-questionnaire",
                "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire",
                "3.0.0",
            ),
        )
        .resource(
            SDC,
            value_set(
                "observation-status",
                "http://hl7.org/fhir/ValueSet/observation-status",
                "4.0.1",
            ),
        )
        .package(IG_A, &[CORE, "example.ig.a.examples@1.0.0"])
        .resource(
            IG_A,
            structure_definition(
                "shared",
                "http://example.org/fhir/StructureDefinition/shared",
                "current",
            ),
        )
        .resource(
            IG_A,
            structure_definition(
                "thing-v1",
                "http://example.org/fhir/StructureDefinition/thing",
                "1.0.0",
            ),
        )
        .resource(
            IG_A,
            structure_definition(
                "thing-v2",
                "http://example.org/fhir/StructureDefinition/thing",
                "1.2.0",
            ),
        )
        .package(IG_B, &[CORE])
        .resource(
            IG_B,
            structure_definition(
                "shared",
                "http://example.org/fhir/StructureDefinition/shared",
                "current",
            ),
        )
        .package(IG_BUNDLE, &[IG_A, IG_B])
}

/// Root packages for [`fhir_graph`]; core is listed although sdc already pulls it in.
pub fn fhir_context() -> Vec<String> {
    [SDC, IG_BUNDLE, TERMINOLOGY, EXTENSIONS, CORE]
        .into_iter()
        .map(str::to_owned)
        .collect()
}
