use log::debug;
use std::collections::BTreeMap;

use crate::export::{ApiItem, Collection};

/// A folder keyed by its full slash-joined tag path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderRecord {
    /// Final path segment
    pub name: String,
    /// Full path of the parent folder; empty for roots
    pub parent: String,
    pub items: Vec<ApiItem>,
}

/// Flat folder records built from tag paths, linked into a forest on demand
#[derive(Debug, Default)]
pub struct FolderTree {
    records: BTreeMap<String, FolderRecord>,
}

impl FolderTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a tag into its non-empty segments
    pub fn segments(tag: &str) -> Vec<&str> {
        tag.split('/').map(str::trim).filter(|s| !s.is_empty()).collect()
    }

    /// Files `item` under the folder for `tag`, creating the folder and every
    /// ancestor first. Returns the item back when the tag has no segments.
    pub fn insert(&mut self, tag: &str, item: ApiItem) -> Option<ApiItem> {
        let segments = Self::segments(tag);
        if segments.is_empty() {
            return Some(item);
        }

        let key = self.ensure(&segments);
        if let Some(record) = self.records.get_mut(&key) {
            record.items.push(item);
        }
        None
    }

    /// Creates `A`, `A/B`, ... up to the full path and returns its key
    fn ensure(&mut self, segments: &[&str]) -> String {
        let mut parent = String::new();
        for depth in 1..=segments.len() {
            let key = segments[..depth].join("/");
            if !self.records.contains_key(&key) {
                debug!("Creating folder {}", key);
                self.records.insert(
                    key.clone(),
                    FolderRecord {
                        name: segments[depth - 1].to_string(),
                        parent: parent.clone(),
                        items: Vec::new(),
                    },
                );
            }
            parent = key;
        }
        parent
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FolderRecord> {
        self.records.get(path)
    }

    /// Links every record under its parent; records without a parent are
    /// the roots of the returned forest
    pub fn into_forest(mut self) -> Vec<Collection> {
        let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, record) in &self.records {
            children
                .entry(record.parent.clone())
                .or_default()
                .push(key.clone());
        }

        let roots = children.remove("").unwrap_or_default();
        roots
            .iter()
            .filter_map(|key| self.build(key, &children))
            .collect()
    }

    fn build(
        &mut self,
        key: &str,
        children: &BTreeMap<String, Vec<String>>,
    ) -> Option<Collection> {
        let record = self.records.remove(key)?;
        let nested: Vec<Collection> = children
            .get(key)
            .map(|keys| keys.iter().filter_map(|k| self.build(k, children)).collect())
            .unwrap_or_default();

        Some(Collection {
            name: record.name,
            items: record.items,
            children: nested,
        })
    }
}
