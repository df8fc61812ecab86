//! Repository: named workspaces and session login.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::RepositoryConfig;
use crate::errors::{RepoError, Result};
use crate::model::{DirtyState, ItemRecord, Value};
use crate::ops::{ItemMap, SharedItems};
use crate::path;
use crate::session::Session;
use crate::types::{PRIMARY_TYPE_PROPERTY, ROOT_TYPE};

/// An in-memory repository
///
/// Workspaces are created on first login and live as long as the repository.
/// Sessions logged in to the same workspace share its items; separate
/// repositories never share anything.
#[derive(Debug, Default)]
pub struct Repository {
    config: RepositoryConfig,
    workspaces: RefCell<HashMap<String, SharedItems>>,
}

impl Repository {
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            config,
            workspaces: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Open a session for the configured default user and workspace
    ///
    /// # Errors
    ///
    /// See [`Self::login`].
    pub fn new_session(&self) -> Result<Session> {
        self.login(None, None)
    }

    /// Open a session, falling back to the configured default user and
    /// workspace
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a blank workspace name, or any error
    /// raised while loading the standard types or existing authorizables.
    pub fn login(&self, user_id: Option<&str>, workspace: Option<&str>) -> Result<Session> {
        let user_id = user_id.unwrap_or(&self.config.default_user_id);
        let workspace = workspace.unwrap_or(&self.config.default_workspace);
        if workspace.trim().is_empty() {
            return Err(RepoError::InvalidArgument {
                reason: "workspace name must not be blank".to_string(),
            });
        }

        let items = self.workspace(workspace);
        tracing::debug!(user_id, workspace, "login");
        Session::open(user_id, workspace, items, &self.config)
    }

    pub fn workspace_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workspaces.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    fn workspace(&self, name: &str) -> SharedItems {
        let mut workspaces = self.workspaces.borrow_mut();
        let items = workspaces
            .entry(name.to_string())
            .or_insert_with(|| Rc::new(RefCell::new(root_items())));
        Rc::clone(items)
    }
}

/// A fresh item map holding only the saved root container
fn root_items() -> ItemMap {
    let mut map = ItemMap::new();
    let mut root = ItemRecord::container(path::ROOT);
    root.dirty = DirtyState::Clean;
    let mut root_type = ItemRecord::leaf(
        path::join(path::ROOT, PRIMARY_TYPE_PROPERTY),
        Value::Name(ROOT_TYPE.to_string()),
    );
    root_type.dirty = DirtyState::Clean;
    map.insert(root);
    map.insert(root_type);
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_created_once() {
        let repo = Repository::default();
        let a = repo.workspace("ws");
        let b = repo.workspace("ws");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(repo.workspace_names(), vec!["ws"]);
    }

    #[test]
    fn test_blank_workspace_rejected() {
        let repo = Repository::default();
        let err = repo.login(None, Some(" ")).unwrap_err();
        assert!(matches!(err, RepoError::InvalidArgument { .. }));
    }
}
