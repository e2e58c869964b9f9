use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

fn strict_semver_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$")
            .expect("semver regex is valid")
    })
}

fn fhir_major_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.r(\d+)[a-z]?(\.|$)").expect("release regex is valid"))
}

fn numeric_parts(version: &str) -> [u64; 3] {
    let core = version
        .split(|c| c == '-' || c == '+')
        .next()
        .unwrap_or_default();
    let mut parts = [0u64; 3];
    for (slot, raw) in parts.iter_mut().zip(core.split('.')) {
        *slot = raw.trim().parse().unwrap_or(0);
    }
    parts
}

/// Orders package versions by their numeric `major.minor.patch` prefix.
///
/// Missing or non-numeric components count as zero. Ties on the numeric part
/// fall back to "release sorts after pre-release", then to plain string order
/// so the result is total.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    numeric_parts(a)
        .cmp(&numeric_parts(b))
        .then_with(|| {
            let a_pre = a.contains('-');
            let b_pre = b.contains('-');
            b_pre.cmp(&a_pre)
        })
        .then_with(|| a.cmp(b))
}

pub fn is_strict_semver(version: &str) -> bool {
    strict_semver_regex().is_match(version)
}

/// FHIR release number encoded in a package id (`hl7.fhir.r4.core` -> 4).
pub fn package_id_major(package_id: &str) -> Option<u32> {
    fhir_major_regex()
        .captures(package_id)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
