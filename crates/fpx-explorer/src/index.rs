use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use fpx_core::{entry_keys, filter_keys, IndexEntry, LookupFilter, PackageId};
use fpx_packages::PackageIndexFile;

/// Index entries of one package plus the composite-key buckets over them.
#[derive(Debug)]
pub struct PackageIndex {
    package: PackageId,
    entries: Vec<Arc<IndexEntry>>,
    buckets: HashMap<String, Vec<usize>>,
}

impl PackageIndex {
    pub fn build(package: PackageId, file: PackageIndexFile) -> Self {
        let entries: Vec<Arc<IndexEntry>> = file
            .files
            .into_iter()
            .map(|meta| Arc::new(IndexEntry::new(meta, &package)))
            .collect();

        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, entry) in entries.iter().enumerate() {
            for key in entry_keys(entry) {
                buckets.entry(key).or_default().push(position);
            }
        }

        Self {
            package,
            entries,
            buckets,
        }
    }

    pub fn package(&self) -> &PackageId {
        &self.package
    }

    pub fn entries(&self) -> &[Arc<IndexEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of the buckets hit by the filter's composite keys, in index order.
    ///
    /// Candidates still have to be checked with [`LookupFilter::matches`].
    pub fn fast_candidates(&self, filter: &LookupFilter) -> Vec<&Arc<IndexEntry>> {
        let positions: BTreeSet<usize> = filter_keys(filter, &self.package)
            .iter()
            .filter_map(|key| self.buckets.get(key))
            .flatten()
            .copied()
            .collect();
        positions.into_iter().map(|pos| &self.entries[pos]).collect()
    }

    /// Every entry matching `filter`, checked one by one.
    pub fn scan(&self, filter: &LookupFilter) -> Vec<Arc<IndexEntry>> {
        self.entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect()
    }

    /// Matches for a normalized filter: fast-path candidates when any bucket
    /// is hit, otherwise a full scan.
    pub fn query(&self, filter: &LookupFilter) -> Vec<Arc<IndexEntry>> {
        let candidates = self.fast_candidates(filter);
        if candidates.is_empty() {
            return self.scan(filter);
        }
        candidates
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect()
    }
}
