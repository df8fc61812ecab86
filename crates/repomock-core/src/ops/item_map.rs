//! Insertion-ordered path → record map backing a workspace.

use std::collections::{HashMap, HashSet};

use crate::model::ItemRecord;

/// Flat ordered map of item records keyed by path
///
/// Lookup goes through the hash index; iteration follows the key order
/// vector, which is what gives siblings their order.
#[derive(Debug, Clone, Default)]
pub struct ItemMap {
    records: HashMap<String, ItemRecord>,
    order: Vec<String>,
}

impl ItemMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&ItemRecord> {
        self.records.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut ItemRecord> {
        self.records.get_mut(path)
    }

    /// Insert or overwrite by path; an overwritten key keeps its position
    pub fn insert(&mut self, record: ItemRecord) -> Option<ItemRecord> {
        let key = record.path.clone();
        let previous = self.records.insert(key.clone(), record);
        if previous.is_none() {
            self.order.push(key);
        }
        previous
    }

    pub fn remove(&mut self, path: &str) -> Option<ItemRecord> {
        let removed = self.records.remove(path)?;
        self.order.retain(|k| k != path);
        Some(removed)
    }

    /// Remove every record whose key matches, returning them in key order
    pub fn remove_where<F>(&mut self, mut matches: F) -> Vec<ItemRecord>
    where
        F: FnMut(&str) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.order.len());
        for key in self.order.drain(..) {
            if matches(&key) {
                if let Some(record) = self.records.remove(&key) {
                    removed.push(record);
                }
            } else {
                kept.push(key);
            }
        }
        self.order = kept;
        removed
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Records in key order
    pub fn values(&self) -> impl Iterator<Item = &ItemRecord> {
        self.order.iter().filter_map(|k| self.records.get(k))
    }

    /// Records in arbitrary order, for bulk state updates
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut ItemRecord> {
        self.records.values_mut()
    }

    /// Move `moved` keys (kept in their given order) to sit directly before
    /// `before`, or at the end when `before` is `None` or absent
    pub(crate) fn reposition(&mut self, moved: &[String], before: Option<&str>) {
        let moved_set: HashSet<&str> = moved.iter().map(String::as_str).collect();
        let mut rest: Vec<String> = self
            .order
            .drain(..)
            .filter(|k| !moved_set.contains(k.as_str()))
            .collect();
        let at = before
            .and_then(|b| rest.iter().position(|k| k == b))
            .unwrap_or(rest.len());
        rest.splice(at..at, moved.iter().cloned());
        self.order = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(paths: &[&str]) -> ItemMap {
        let mut map = ItemMap::new();
        for p in paths {
            map.insert(ItemRecord::container(*p));
        }
        map
    }

    #[test]
    fn test_insert_overwrite_keeps_position() {
        let mut map = map_of(&["/a", "/b", "/c"]);
        map.insert(ItemRecord::container("/a"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["/a", "/b", "/c"]);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_remove_where_returns_in_order() {
        let mut map = map_of(&["/a", "/a/x", "/b", "/a/y"]);
        let removed = map.remove_where(|k| k.starts_with("/a"));
        let paths: Vec<_> = removed.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/a/x", "/a/y"]);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["/b"]);
    }

    #[test]
    fn test_reposition_before_and_end() {
        let mut map = map_of(&["/p/one", "/p/two", "/p/three"]);
        map.reposition(&["/p/three".to_string()], Some("/p/two"));
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            vec!["/p/one", "/p/three", "/p/two"]
        );

        map.reposition(&["/p/one".to_string()], None);
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            vec!["/p/three", "/p/two", "/p/one"]
        );
    }
}
