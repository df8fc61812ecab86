use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::Value;
use crate::path;

/// Unsaved-change state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirtyState {
    /// Created since the last save
    New,
    /// Existed at the last save and was modified since
    Changed,
    Clean,
}

/// What an item is: a container of children, or a leaf holding values
///
/// A container's ordered child names are not stored on the record; they are
/// the order of its children's keys in the item map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    Container,
    Leaf { values: Vec<Value>, multiple: bool },
}

/// One item in the store, keyed by its normalized path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Normalized absolute path (the store key)
    pub path: String,

    pub kind: ItemKind,

    pub dirty: DirtyState,

    /// Stable identity token (UUID v7), survives moves
    pub identity: String,
}

impl ItemRecord {
    /// Create a new container record at `path`
    pub fn container(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ItemKind::Container,
            dirty: DirtyState::New,
            identity: Uuid::now_v7().to_string(),
        }
    }

    /// Create a new single-valued leaf record at `path`
    pub fn leaf(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            kind: ItemKind::Leaf {
                values: vec![value],
                multiple: false,
            },
            dirty: DirtyState::New,
            identity: Uuid::now_v7().to_string(),
        }
    }

    /// Create a new multi-valued leaf record at `path`
    pub fn multi_leaf(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            path: path.into(),
            kind: ItemKind::Leaf {
                values,
                multiple: true,
            },
            dirty: DirtyState::New,
            identity: Uuid::now_v7().to_string(),
        }
    }

    /// Local name (final path segment)
    pub fn name(&self) -> &str {
        path::name(&self.path)
    }

    pub fn parent_path(&self) -> Option<String> {
        path::parent(&self.path)
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, ItemKind::Container)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ItemKind::Leaf { .. })
    }

    /// All values of a leaf; `None` for containers
    pub fn values(&self) -> Option<&[Value]> {
        match &self.kind {
            ItemKind::Leaf { values, .. } => Some(values),
            ItemKind::Container => None,
        }
    }

    /// First value of a leaf
    pub fn value(&self) -> Option<&Value> {
        self.values().and_then(|v| v.first())
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self.kind, ItemKind::Leaf { multiple: true, .. })
    }

    pub fn is_new(&self) -> bool {
        self.dirty == DirtyState::New
    }

    pub fn is_modified(&self) -> bool {
        self.dirty == DirtyState::Changed
    }

    /// Record a modification; new records stay new
    pub fn mark_changed(&mut self) {
        if self.dirty == DirtyState::Clean {
            self.dirty = DirtyState::Changed;
        }
    }

    /// Copy of this record at another path, keeping identity and dirty state
    pub fn relocated(&self, new_path: impl Into<String>) -> Self {
        Self {
            path: new_path.into(),
            ..self.clone()
        }
    }
}
