use std::cell::RefCell;
use std::rc::Rc;

use regex_lite::Regex;

use super::item_map::ItemMap;
use crate::errors::{RepoError, Result};
use crate::model::{DirtyState, ItemRecord};
use crate::path;

/// Item map shared by every session logged in to one workspace
pub type SharedItems = Rc<RefCell<ItemMap>>;

/// Path-keyed item store for one session
///
/// Single-threaded by construction (`Rc<RefCell<_>>`). Several stores may
/// share one `ItemMap`; each tracks its own "known structural change" flag.
#[derive(Debug, Clone)]
pub struct ItemStore {
    items: SharedItems,
    same_name_siblings_supported: bool,
    has_known_changes: bool,
}

impl ItemStore {
    /// Create a store over an item map
    pub fn new(items: SharedItems, same_name_siblings_supported: bool) -> Self {
        Self {
            items,
            same_name_siblings_supported,
            has_known_changes: false,
        }
    }

    /// Handle to the underlying shared map
    pub fn shared(&self) -> SharedItems {
        Rc::clone(&self.items)
    }

    pub fn same_name_siblings_supported(&self) -> bool {
        self.same_name_siblings_supported
    }

    pub fn get(&self, path: &str) -> Option<ItemRecord> {
        self.items.borrow().get(path).cloned()
    }

    /// Get a record that must exist
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if nothing is stored at `path`.
    pub fn get_required(&self, path: &str) -> Result<ItemRecord> {
        self.get(path).ok_or_else(|| RepoError::PathNotFound {
            path: path.to_string(),
        })
    }

    /// Get a record that must exist and be a container
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if absent, `NotAContainer` if it is a leaf.
    pub fn get_container(&self, path: &str) -> Result<ItemRecord> {
        let record = self.get_required(path)?;
        if !record.is_container() {
            return Err(RepoError::NotAContainer {
                path: path.to_string(),
            });
        }
        Ok(record)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.items.borrow().contains(path)
    }

    /// Insert or overwrite the record at its path
    pub fn put(&mut self, record: ItemRecord) {
        tracing::debug!(path = %record.path, "put item");
        self.items.borrow_mut().insert(record);
    }

    /// Apply `update` to the record at `path`
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if nothing is stored at `path`.
    pub fn update<F>(&mut self, path: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut ItemRecord),
    {
        let mut items = self.items.borrow_mut();
        let record = items.get_mut(path).ok_or_else(|| RepoError::PathNotFound {
            path: path.to_string(),
        })?;
        update(record);
        Ok(())
    }

    /// Delete `path` and everything beneath it
    ///
    /// Returns `false` (and changes nothing) when `path` is absent.
    pub fn remove_subtree(&mut self, path: &str) -> bool {
        if !self.exists(path) {
            return false;
        }
        let removed = self
            .items
            .borrow_mut()
            .remove_where(|key| path::is_self_or_descendant(key, path));
        tracing::debug!(path, removed = removed.len(), "removed subtree");
        self.has_known_changes = true;
        true
    }

    /// Relocate the subtree at `src` to `dst`, returning the number of records moved
    ///
    /// Every (old, new) key pair is computed before the map is touched; the
    /// relocated records keep identity tokens and dirty state, and land after
    /// the destination parent's existing children.
    ///
    /// # Errors
    ///
    /// - `IndexedDestination` if `dst` ends in a sibling index such as `a[2]`
    /// - `ItemExists` if `dst` is occupied
    /// - `PathNotFound` if the parent of `dst` is not a container, or `src` is absent
    /// - `NotAContainer` if `src` is a leaf
    /// - `InvalidArgument` when moving the root or moving a subtree into itself
    pub fn move_subtree(&mut self, src: &str, dst: &str) -> Result<usize> {
        if path::has_sibling_index(path::name(dst)) {
            return Err(RepoError::IndexedDestination {
                path: dst.to_string(),
            });
        }
        if self.exists(dst) {
            return Err(RepoError::ItemExists {
                path: dst.to_string(),
            });
        }
        let dst_parent = path::parent(dst).ok_or_else(|| RepoError::InvalidArgument {
            reason: "cannot move onto the root".to_string(),
        })?;
        match self.get(&dst_parent) {
            Some(parent) if parent.is_container() => {}
            _ => return Err(RepoError::PathNotFound { path: dst_parent }),
        }
        let source = self.get_required(src)?;
        if !source.is_container() {
            return Err(RepoError::NotAContainer {
                path: src.to_string(),
            });
        }
        if src == path::ROOT || path::is_self_or_descendant(dst, src) {
            return Err(RepoError::InvalidArgument {
                reason: format!("cannot move {} into its own subtree {}", src, dst),
            });
        }

        let relocations: Vec<(String, String)> = self
            .items
            .borrow()
            .keys()
            .filter(|key| path::is_self_or_descendant(key, src))
            .map(|key| (key.to_string(), path::relocate(key, src, dst)))
            .collect();

        let mut items = self.items.borrow_mut();
        let moved: Vec<ItemRecord> = relocations
            .iter()
            .filter_map(|(old, new)| items.remove(old).map(|record| record.relocated(new.as_str())))
            .collect();
        let count = moved.len();
        for record in moved {
            items.insert(record);
        }
        drop(items);

        tracing::debug!(src, dst, moved = count, "moved subtree");
        self.has_known_changes = true;
        Ok(count)
    }

    /// Move the child `moved` of `parent` (with its subtree) directly before
    /// sibling `before`, or to the end when `before` is `None`
    ///
    /// Every other key keeps its relative order.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if `parent`, `moved` or `before` does not exist
    /// and `NotAContainer` if any of them is a property. Only child nodes are
    /// ordered.
    pub fn reorder_siblings(&mut self, parent: &str, moved: &str, before: Option<&str>) -> Result<()> {
        self.get_container(parent)?;
        let moved_path = self.get_container(&path::join(parent, moved))?.path;
        let before_path = match before {
            Some(name) => Some(self.get_container(&path::join(parent, name))?.path),
            None => None,
        };
        if before_path.as_deref() == Some(moved_path.as_str()) {
            return Ok(());
        }

        let mut items = self.items.borrow_mut();
        let subtree: Vec<String> = items
            .keys()
            .filter(|key| path::is_self_or_descendant(key, &moved_path))
            .map(str::to_string)
            .collect();
        items.reposition(&subtree, before_path.as_deref());
        drop(items);

        tracing::debug!(parent, moved, before = ?before, "reordered siblings");
        self.has_known_changes = true;
        Ok(())
    }

    /// Direct children of `parent`, in order, optionally filtered
    ///
    /// Children are matched with the anchored pattern `^<parent>/[^/]+$`, so
    /// grandchildren and same-prefix siblings never match.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the child pattern fails to compile.
    pub fn list_children(
        &self,
        parent: &str,
        predicate: Option<&dyn Fn(&ItemRecord) -> bool>,
    ) -> Result<Vec<ItemRecord>> {
        let pattern = Regex::new(&path::child_pattern(parent)).map_err(|e| RepoError::Internal {
            message: format!("child pattern for {}: {}", parent, e),
        })?;
        let items = self.items.borrow();
        let children = items
            .values()
            .filter(|record| pattern.is_match(&record.path))
            .filter(|record| predicate.map_or(true, |p| p(*record)))
            .cloned()
            .collect();
        Ok(children)
    }

    /// Records at `root` and beneath it, in key order
    pub fn subtree(&self, root: &str) -> Vec<ItemRecord> {
        self.items
            .borrow()
            .values()
            .filter(|record| path::is_self_or_descendant(&record.path, root))
            .cloned()
            .collect()
    }

    /// Find a container by identity token
    pub fn find_by_identity(&self, identity: &str) -> Option<ItemRecord> {
        self.items
            .borrow()
            .values()
            .find(|record| record.is_container() && record.identity == identity)
            .cloned()
    }

    /// True after a structural mutation or while any record is new or changed
    pub fn has_pending_changes(&self) -> bool {
        self.has_known_changes
            || self
                .items
                .borrow()
                .values()
                .any(|record| record.dirty != DirtyState::Clean)
    }

    /// Reset every record to clean and clear the structural change flag
    pub fn commit(&mut self) {
        for record in self.items.borrow_mut().values_mut() {
            record.dirty = DirtyState::Clean;
        }
        self.has_known_changes = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    fn store_with(paths: &[&str]) -> ItemStore {
        let mut map = ItemMap::new();
        map.insert(ItemRecord::container("/"));
        for p in paths {
            map.insert(ItemRecord::container(*p));
        }
        ItemStore::new(Rc::new(RefCell::new(map)), false)
    }

    fn child_names(store: &ItemStore, parent: &str) -> Vec<String> {
        store
            .list_children(parent, None)
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    #[test]
    fn test_remove_subtree_absent_is_noop() {
        let mut store = store_with(&["/a"]);
        store.commit();
        assert!(!store.remove_subtree("/missing"));
        assert!(!store.has_pending_changes());
    }

    #[test]
    fn test_remove_subtree_spares_prefix_siblings() {
        let mut store = store_with(&["/a", "/a/child1", "/a/child1/x", "/a/child10"]);
        assert!(store.remove_subtree("/a/child1"));
        assert!(!store.exists("/a/child1/x"));
        assert!(store.exists("/a/child10"));
    }

    #[test]
    fn test_move_rejects_leaf_source() {
        let mut store = store_with(&["/a"]);
        store.put(ItemRecord::leaf("/a/p", Value::from("v")));
        let err = store.move_subtree("/a/p", "/q").unwrap_err();
        assert!(matches!(err, RepoError::NotAContainer { .. }));
    }

    #[test]
    fn test_move_into_own_subtree_rejected() {
        let mut store = store_with(&["/a", "/a/b"]);
        let err = store.move_subtree("/a", "/a/b/c").unwrap_err();
        assert!(matches!(err, RepoError::InvalidArgument { .. }));
        assert!(store.exists("/a/b"));
    }

    #[test]
    fn test_reorder_missing_sibling() {
        let mut store = store_with(&["/p", "/p/one"]);
        let err = store.reorder_siblings("/p", "one", Some("nope")).unwrap_err();
        assert!(matches!(err, RepoError::PathNotFound { .. }));
        assert_eq!(child_names(&store, "/p"), vec!["one"]);
    }

    #[test]
    fn test_list_children_with_predicate() {
        let mut store = store_with(&["/p", "/p/a"]);
        store.put(ItemRecord::leaf("/p/prop", Value::from("v")));
        let only_leaves: &dyn Fn(&ItemRecord) -> bool = &|r| r.is_leaf();
        let leaves = store.list_children("/p", Some(only_leaves)).unwrap();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].name(), "prop");
    }

    #[test]
    fn test_commit_clears_pending() {
        let mut store = store_with(&["/a"]);
        assert!(store.has_pending_changes());
        store.commit();
        assert!(!store.has_pending_changes());
        store.update("/a", |r| r.mark_changed()).unwrap();
        assert!(store.has_pending_changes());
    }

    #[test]
    fn test_same_name_siblings_flag_does_not_permit_overwrite() {
        let mut map = ItemMap::new();
        map.insert(ItemRecord::container("/"));
        map.insert(ItemRecord::container("/a"));
        map.insert(ItemRecord::container("/x"));
        map.insert(ItemRecord::container("/x/a"));
        let mut store = ItemStore::new(Rc::new(RefCell::new(map)), true);

        assert!(store.same_name_siblings_supported());
        let err = store.move_subtree("/a", "/x/a").unwrap_err();
        assert!(matches!(err, RepoError::ItemExists { .. }));
    }

    #[test]
    fn test_reorder_rejects_properties() {
        let mut store = store_with(&["/p", "/p/one", "/p/two"]);
        store.put(ItemRecord::leaf("/p/prop", Value::from("v")));

        let err = store.reorder_siblings("/p", "prop", None).unwrap_err();
        assert!(matches!(err, RepoError::NotAContainer { .. }));
        let err = store.reorder_siblings("/p", "two", Some("prop")).unwrap_err();
        assert!(matches!(err, RepoError::NotAContainer { .. }));
        assert_eq!(child_names(&store, "/p"), vec!["one", "two", "prop"]);
    }
}
