use std::borrow::Cow;

use crate::{IndexEntry, LookupFilter, PackageId};

/// Pseudo-field naming the owning package inside a composite key shape.
const PKG: &str = "@pkg";

/// Field combinations bucketed by the fast index, most selective first.
pub const KEY_SHAPES: &[&[&str]] = &[
    &[PKG, "resourceType", "id", "derivation"],
    &[PKG, "resourceType", "url"],
    &["resourceType", "url", "version"],
    &["resourceType", "url"],
    &["url", "version"],
    &["url"],
    &["resourceType", "name", "version"],
    &["resourceType", "id", "version"],
    &["resourceType", "name"],
    &["resourceType", "id"],
];

const SEP: char = '\u{1f}';

fn build_key<'a>(
    shape_idx: usize,
    shape: &[&str],
    mut value: impl FnMut(&str) -> Option<Cow<'a, str>>,
) -> Option<String> {
    let mut key = shape_idx.to_string();
    for field in shape {
        let v = value(field)?;
        if v.is_empty() {
            return None;
        }
        key.push(SEP);
        key.push_str(&v);
    }
    Some(key)
}

/// Every composite key under which `entry` is reachable.
pub fn entry_keys(entry: &IndexEntry) -> Vec<String> {
    let pkg = entry.package().key();
    KEY_SHAPES
        .iter()
        .enumerate()
        .filter_map(|(idx, shape)| {
            build_key(idx, shape, |field| {
                if field == PKG {
                    Some(pkg.as_str().into())
                } else {
                    entry.field(field)
                }
            })
        })
        .collect()
}

/// Composite keys fully determined by `filter` when searching inside `package`.
///
/// The filter is expected to be normalized already; shapes whose fields are not
/// all constrained by the filter produce no key.
pub fn filter_keys(filter: &LookupFilter, package: &PackageId) -> Vec<String> {
    let pkg = package.key();
    KEY_SHAPES
        .iter()
        .enumerate()
        .filter_map(|(idx, shape)| {
            build_key(idx, shape, |field| {
                if field == PKG {
                    Some(pkg.as_str().into())
                } else {
                    filter.get(field).map(Into::into)
                }
            })
        })
        .collect()
}
