//! Tie-breaking between several documents matching one query.
//!
//! The policy is an ordered chain of [`DuplicateRule`]s. Each rule takes the
//! current candidates and returns either a narrowed set or the candidates
//! unchanged; the chain stops as soon as exactly one candidate is left. If no
//! rule gets there the original candidates are reported back as ambiguous.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use fpx_config::PolicyConfig;
use fpx_core::{
    compare_versions, is_strict_semver, package_id_major, IndexEntry, LookupFilter, PackageId,
};
use regex::Regex;

/// A recognized family of implicit support packages.
#[derive(Debug, Clone)]
pub struct ImplicitFamily {
    name: String,
    patterns: Vec<Regex>,
    resource_types: BTreeSet<String>,
}

impl ImplicitFamily {
    pub fn new(
        name: impl Into<String>,
        patterns: Vec<Regex>,
        resource_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            patterns,
            resource_types: resource_types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, package_id: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(package_id))
    }

    /// Whether this family is authoritative for `resource_type`.
    pub fn covers(&self, resource_type: &str) -> bool {
        self.resource_types.contains(resource_type)
    }

    pub fn is_generic(&self) -> bool {
        self.resource_types.is_empty()
    }
}

/// Naming conventions that tell core packages and implicit support packages apart.
#[derive(Debug, Clone)]
pub struct ImplicitPackagePolicy {
    core: Vec<Regex>,
    families: Vec<ImplicitFamily>,
}

impl ImplicitPackagePolicy {
    pub fn new(core: Vec<Regex>, families: Vec<ImplicitFamily>) -> Self {
        Self { core, families }
    }

    pub fn from_config(config: &PolicyConfig) -> Result<Self, regex::Error> {
        let core = compile_all(&config.core_patterns)?;
        let mut families = Vec::with_capacity(config.implicit.len());
        for family in &config.implicit {
            families.push(ImplicitFamily::new(
                family.name.clone(),
                compile_all(&family.patterns)?,
                family.resource_types.iter().cloned(),
            ));
        }
        Ok(Self::new(core, families))
    }

    pub fn is_core(&self, package_id: &str) -> bool {
        self.core.iter().any(|re| re.is_match(package_id))
    }

    /// The first family recognizing `package_id`.
    pub fn family_of(&self, package_id: &str) -> Option<&ImplicitFamily> {
        self.families.iter().find(|f| f.matches(package_id))
    }

    pub fn is_implicit(&self, package_id: &str) -> bool {
        self.family_of(package_id).is_some()
    }

    pub fn families(&self) -> &[ImplicitFamily] {
        &self.families
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p)).collect()
}

impl Default for ImplicitPackagePolicy {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default()).expect("default policy patterns are valid")
    }
}

/// Inputs shared by every rule of one resolution.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// The normalized filter of the query.
    pub filter: &'a LookupFilter,
    /// The filter's `package`, already resolved to an exact identity.
    pub package: Option<&'a PackageId>,
    pub policy: &'a ImplicitPackagePolicy,
}

pub type Candidates = Vec<Arc<IndexEntry>>;

pub trait DuplicateRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Return a narrowed candidate set, or `candidates` unchanged when the
    /// rule does not apply.
    fn apply(&self, candidates: Candidates, cx: &PolicyContext<'_>) -> Candidates;
}

/// A match owned by exactly the package the filter asked for wins.
pub struct ExplicitPackage;

impl DuplicateRule for ExplicitPackage {
    fn name(&self) -> &'static str {
        "explicit-package"
    }

    fn apply(&self, candidates: Candidates, cx: &PolicyContext<'_>) -> Candidates {
        let Some(package) = cx.package else {
            return candidates;
        };
        let owned: Candidates = candidates
            .iter()
            .filter(|e| e.is_from(package))
            .cloned()
            .collect();
        if owned.len() == 1 {
            owned
        } else {
            candidates
        }
    }
}

/// Implicit packages outrank core packages; a lone core match outranks the rest.
pub struct ImplicitOverCore;

impl DuplicateRule for ImplicitOverCore {
    fn name(&self) -> &'static str {
        "implicit-over-core"
    }

    fn apply(&self, candidates: Candidates, cx: &PolicyContext<'_>) -> Candidates {
        let has_implicit = candidates
            .iter()
            .any(|e| cx.policy.is_implicit(&e.package_id));
        let core: Candidates = candidates
            .iter()
            .filter(|e| cx.policy.is_core(&e.package_id))
            .cloned()
            .collect();

        if has_implicit && !core.is_empty() {
            return candidates
                .into_iter()
                .filter(|e| !cx.policy.is_core(&e.package_id))
                .collect();
        }
        if !has_implicit && core.len() == 1 {
            return core;
        }
        candidates
    }
}

/// Among implicit packages of different families, the family authoritative
/// for the filter's `resourceType` wins; without one, the generic families win.
pub struct ImplicitFamilyBias;

impl DuplicateRule for ImplicitFamilyBias {
    fn name(&self) -> &'static str {
        "implicit-family"
    }

    fn apply(&self, candidates: Candidates, cx: &PolicyContext<'_>) -> Candidates {
        let families: Option<BTreeSet<&str>> = candidates
            .iter()
            .map(|e| cx.policy.family_of(&e.package_id).map(ImplicitFamily::name))
            .collect();
        let Some(families) = families.filter(|f| f.len() > 1) else {
            return candidates;
        };

        let resource_type = cx.filter.get("resourceType");
        let covering: BTreeSet<&str> = cx
            .policy
            .families()
            .iter()
            .filter(|f| families.contains(f.name()))
            .filter(|f| resource_type.is_some_and(|rt| f.covers(rt)))
            .map(ImplicitFamily::name)
            .collect();
        let preferred = if covering.is_empty() {
            cx.policy
                .families()
                .iter()
                .filter(|f| families.contains(f.name()) && f.is_generic())
                .map(ImplicitFamily::name)
                .collect()
        } else {
            covering
        };

        let narrowed: Candidates = candidates
            .iter()
            .filter(|e| {
                cx.policy
                    .family_of(&e.package_id)
                    .is_some_and(|f| preferred.contains(f.name()))
            })
            .cloned()
            .collect();
        if narrowed.is_empty() {
            candidates
        } else {
            narrowed
        }
    }
}

/// The top implicit-package match wins: newest package version first, then
/// the highest release number in the package id. Other matches are dropped.
pub struct ImplicitVersionBias;

impl DuplicateRule for ImplicitVersionBias {
    fn name(&self) -> &'static str {
        "implicit-version"
    }

    fn apply(&self, candidates: Candidates, cx: &PolicyContext<'_>) -> Candidates {
        let mut implicit: Candidates = candidates
            .iter()
            .filter(|e| cx.policy.is_implicit(&e.package_id))
            .cloned()
            .collect();
        if implicit.is_empty() {
            return candidates;
        }

        implicit.sort_by(|a, b| {
            compare_versions(&b.package_version, &a.package_version)
                .then_with(|| package_id_major(&b.package_id).cmp(&package_id_major(&a.package_id)))
                .then_with(|| a.package_id.cmp(&b.package_id))
                .then_with(|| a.filename().cmp(b.filename()))
        });
        implicit.truncate(1);
        implicit
    }
}

/// Several versions of one document in the same package: the greatest
/// semantic version wins.
pub struct SemverCollapse;

impl DuplicateRule for SemverCollapse {
    fn name(&self) -> &'static str {
        "semver-collapse"
    }

    fn apply(&self, candidates: Candidates, _cx: &PolicyContext<'_>) -> Candidates {
        let Some(first) = candidates.first() else {
            return candidates;
        };
        let same_package = candidates.iter().all(|e| e.package_id == first.package_id);
        let versions: Option<Vec<&str>> = candidates
            .iter()
            .map(|e| e.meta.version.as_deref().filter(|v| is_strict_semver(v)))
            .collect();
        let Some(versions) = versions.filter(|_| same_package) else {
            return candidates;
        };

        let Some(best) = versions
            .iter()
            .copied()
            .max_by(|a, b| compare_versions(a, b))
        else {
            return candidates;
        };
        let top: Candidates = candidates
            .iter()
            .zip(&versions)
            .filter(|(_, v)| compare_versions(v, best) == Ordering::Equal)
            .map(|(e, _)| e.clone())
            .collect();
        if top.len() == 1 {
            top
        } else {
            candidates
        }
    }
}

/// Outcome of running the chain.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// One entry when resolved; otherwise the original candidates.
    pub entries: Candidates,
    /// The rule that produced the single entry.
    pub rule: Option<&'static str>,
}

impl Resolution {
    pub fn unique(&self) -> Option<&Arc<IndexEntry>> {
        match self.entries.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// The ordered rule chain.
pub struct DuplicateResolver {
    rules: Vec<Box<dyn DuplicateRule>>,
}

impl DuplicateResolver {
    pub fn new(rules: Vec<Box<dyn DuplicateRule>>) -> Self {
        Self { rules }
    }

    pub fn resolve(&self, matches: Candidates, cx: &PolicyContext<'_>) -> Resolution {
        if matches.len() <= 1 {
            return Resolution {
                entries: matches,
                rule: None,
            };
        }

        let mut current = matches.clone();
        for rule in &self.rules {
            current = rule.apply(current, cx);
            if current.len() == 1 {
                return Resolution {
                    entries: current,
                    rule: Some(rule.name()),
                };
            }
            if current.is_empty() {
                break;
            }
        }
        Resolution {
            entries: matches,
            rule: None,
        }
    }
}

impl Default for DuplicateResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExplicitPackage),
            Box::new(ImplicitOverCore),
            Box::new(ImplicitFamilyBias),
            Box::new(ImplicitVersionBias),
            Box::new(SemverCollapse),
        ])
    }
}
