use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Records request-body components that point at other components.
///
/// Recording and resolution are separate phases: every `record` call
/// happens first, then `resolve` collapses each chain exactly once.
#[derive(Debug, Default)]
pub struct RefMap {
    records: BTreeMap<String, String>,
}

impl RefMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: impl Into<String>, target: impl Into<String>) {
        self.records.insert(key.into(), target.into());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Follows every recorded chain to its first unrecorded target. A walk
    /// that revisits a key resolves to nothing and the key is dropped.
    pub fn resolve(self) -> ResolvedRefs {
        let mut resolved = BTreeMap::new();
        let mut dropped = BTreeSet::new();

        for key in self.records.keys() {
            match self.walk(key) {
                Some(target) => {
                    debug!("Resolved reference {} -> {}", key, target);
                    resolved.insert(key.clone(), target);
                }
                None => {
                    warn!("Reference chain starting at {} is cyclic, dropping it", key);
                    dropped.insert(key.clone());
                }
            }
        }

        ResolvedRefs { resolved, dropped }
    }

    fn walk(&self, key: &str) -> Option<String> {
        let mut visited = BTreeSet::new();
        let mut current = key;

        while let Some(next) = self.records.get(current) {
            if !visited.insert(current) {
                return None;
            }
            current = next.as_str();
        }

        Some(current.to_string())
    }
}

/// Outcome of [`RefMap::resolve`]
#[derive(Debug, Default, Clone)]
pub struct ResolvedRefs {
    resolved: BTreeMap<String, String>,
    dropped: BTreeSet<String>,
}

impl ResolvedRefs {
    /// Final target for `key`. Keys that were never recorded resolve to
    /// themselves; keys dropped for cycling resolve to `None`.
    pub fn target<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        if self.dropped.contains(key) {
            return None;
        }
        Some(self.resolved.get(key).map(String::as_str).unwrap_or(key))
    }
}
