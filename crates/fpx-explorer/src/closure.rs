use std::collections::{BTreeSet, HashSet};

use fpx_core::{PackageId, PackageRef};
use fpx_packages::{PackageError, PackageManager};

use crate::Logger;

/// Dependency ids containing this marker are not walked when examples are skipped.
pub const EXAMPLES_MARKER: &str = "examples";

/// Transitive dependency closure of `root`, itself included, sorted.
///
/// The walk uses an explicit stack and a visited set keyed by `id#version`, so
/// dependency cycles and deep graphs terminate without recursion.
pub(crate) async fn dependency_closure(
    manager: &dyn PackageManager,
    root: &PackageId,
    skip_examples: bool,
    logger: &dyn Logger,
) -> Result<Vec<PackageId>, PackageError> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut closure = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(package) = stack.pop() {
        if !visited.insert(package.key()) {
            continue;
        }

        let dependencies = manager.dependencies(&package).await?;
        for (id, version) in dependencies {
            if skip_examples && id.contains(EXAMPLES_MARKER) {
                logger.debug(&format!(
                    "not walking example package {id}@{version} (from {package})"
                ));
                continue;
            }
            let dependency = manager.to_package_id(&PackageRef::new(id, version)).await?;
            if !visited.contains(&dependency.key()) {
                stack.push(dependency);
            }
        }
        closure.push(package);
    }

    closure.sort();
    Ok(closure)
}

/// The roots that are not covered by another root's closure.
///
/// `R` is dropped when some other root `S` reaches it and either `R` does not
/// reach `S` back, or both reach each other and `S` sorts first. Roots inside a
/// cycle therefore collapse onto the smallest member, and the union of the
/// kept closures equals the union of all closures.
pub(crate) fn minimal_roots(closures: &[(PackageId, Vec<PackageId>)]) -> Vec<PackageId> {
    let reach: Vec<HashSet<&PackageId>> = closures
        .iter()
        .map(|(_, closure)| closure.iter().collect())
        .collect();

    let mut kept: Vec<PackageId> = closures
        .iter()
        .enumerate()
        .filter(|(r_idx, (root, _))| {
            !closures.iter().enumerate().any(|(s_idx, (other, _))| {
                s_idx != *r_idx
                    && other != root
                    && reach[s_idx].contains(root)
                    && (!reach[*r_idx].contains(other) || other < root)
            })
        })
        .map(|(_, (root, _))| root.clone())
        .collect();

    if kept.is_empty() {
        // Every root is mutually redundant: keep the first in canonical order.
        kept.extend(closures.iter().map(|(root, _)| root.clone()).min());
    }
    kept.sort();
    kept.dedup();
    kept
}

/// Union of the closures of `roots`, deduplicated and sorted.
pub(crate) fn union_scope<'a>(
    roots: &[PackageId],
    closures: impl IntoIterator<Item = &'a (PackageId, Vec<PackageId>)>,
) -> Vec<PackageId> {
    let roots: HashSet<&PackageId> = roots.iter().collect();
    closures
        .into_iter()
        .filter(|(root, _)| roots.contains(root))
        .flat_map(|(_, closure)| closure.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
