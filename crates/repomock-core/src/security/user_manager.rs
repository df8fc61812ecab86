use std::collections::BTreeSet;
use std::time::Instant;

use super::membership::{MembershipResolver, SearchType};
use crate::errors::{RepoError, Result};
use crate::model::authorizable::PRINCIPAL_NAME_PROPERTY;
use crate::model::{Authorizable, AuthorizableKind, Value};
use crate::ops::node_ops;
use crate::ops::ItemStore;
use crate::path;
use crate::types::standard::{
    AUTHORIZABLE_FOLDER_TYPE, AUTHORIZABLE_ID_PROPERTY, DISABLED_PROPERTY, GROUP_TYPE, SYSTEM_USER_TYPE,
    USER_TYPE,
};
use crate::types::{ResolveMode, TypeRegistry};

pub const USERS_PATH: &str = "/home/users";
pub const SYSTEM_USERS_PATH: &str = "/home/users/system";
pub const GROUPS_PATH: &str = "/home/groups";
const HOME_PATH: &str = "/home";

/// User and group management for one session
///
/// Borrows the session's membership resolver together with its item store,
/// so every authorizable keeps a home node in the workspace.
pub struct UserManager<'a> {
    membership: &'a mut MembershipResolver,
    store: &'a mut ItemStore,
    types: &'a TypeRegistry,
    user_id: &'a str,
}

impl<'a> UserManager<'a> {
    pub fn new(
        membership: &'a mut MembershipResolver,
        store: &'a mut ItemStore,
        types: &'a TypeRegistry,
        user_id: &'a str,
    ) -> Self {
        Self {
            membership,
            store,
            types,
            user_id,
        }
    }

    /// Create a group with its home node under `intermediate_path`
    /// (default `/home/groups`)
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableExists` if the id is taken, or any item store
    /// error raised while creating the home node.
    pub fn create_group(&mut self, id: &str, intermediate_path: Option<&str>) -> Result<Authorizable> {
        self.create(
            id,
            intermediate_path.unwrap_or(GROUPS_PATH),
            GROUP_TYPE,
            AuthorizableKind::Group {
                declared_members: BTreeSet::new(),
            },
        )
    }

    /// Create a user with its home node under `intermediate_path`
    /// (default `/home/users`)
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_group`].
    pub fn create_user(&mut self, id: &str, intermediate_path: Option<&str>) -> Result<Authorizable> {
        self.create(
            id,
            intermediate_path.unwrap_or(USERS_PATH),
            USER_TYPE,
            AuthorizableKind::User { system: false },
        )
    }

    /// Create a system user with its home node under `intermediate_path`
    /// (default `/home/users/system`)
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_group`].
    pub fn create_system_user(&mut self, id: &str, intermediate_path: Option<&str>) -> Result<Authorizable> {
        self.create(
            id,
            intermediate_path.unwrap_or(SYSTEM_USERS_PATH),
            SYSTEM_USER_TYPE,
            AuthorizableKind::User { system: true },
        )
    }

    fn create(
        &mut self,
        id: &str,
        intermediate_path: &str,
        node_type: &str,
        kind: AuthorizableKind,
    ) -> Result<Authorizable> {
        let start = Instant::now();
        crate::log_op_start!("create_authorizable", authorizable_id = id, type_name = node_type);

        let result = self.create_inner(id, intermediate_path, node_type, kind);

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                crate::log_op_end!("create_authorizable", duration_ms = duration_ms, authorizable_id = id);
            }
            Err(e) => crate::log_op_error!("create_authorizable", e.clone(), duration_ms = duration_ms),
        }
        result
    }

    fn create_inner(
        &mut self,
        id: &str,
        intermediate_path: &str,
        node_type: &str,
        kind: AuthorizableKind,
    ) -> Result<Authorizable> {
        if id.trim().is_empty() {
            return Err(RepoError::InvalidArgument {
                reason: "authorizable id must not be blank".to_string(),
            });
        }
        if self.membership.contains(id) {
            return Err(RepoError::AuthorizableExists { id: id.to_string() });
        }
        path::validate_name(id)?;
        let folder = path::normalize(intermediate_path)?;
        self.check_home_path(&folder, id)?;
        node_ops::resolve_auto_created(self.types, AUTHORIZABLE_FOLDER_TYPE)?;
        node_ops::resolve_auto_created(self.types, node_type)?;

        let home = self.ensure_home(&folder, id, node_type)?;
        let authorizable = Authorizable::new(id, id, home, kind);
        self.membership.insert(authorizable.clone())?;
        Ok(authorizable)
    }

    /// Every segment still to be created must be a valid name and every
    /// existing one a node
    fn check_home_path(&self, folder: &str, principal_name: &str) -> Result<()> {
        for depth in 1..=path::depth(folder) {
            let next = path::ancestor(folder, depth)?;
            if self.store.exists(&next) {
                self.store.get_container(&next)?;
            } else {
                path::validate_name(path::name(&next))?;
            }
        }
        let home = path::join(folder, principal_name);
        if self.store.exists(&home) {
            self.store.get_container(&home)?;
        }
        Ok(())
    }

    /// Create the folders of `folder` and the home node below them
    ///
    /// An existing home node is reused as is.
    fn ensure_home(&mut self, folder: &str, principal_name: &str, node_type: &str) -> Result<String> {
        let mut current = path::ROOT.to_string();
        for depth in 1..=path::depth(folder) {
            let next = path::ancestor(folder, depth)?;
            if !self.store.exists(&next) {
                node_ops::add_child(
                    self.store,
                    self.types,
                    self.user_id,
                    &current,
                    path::name(&next),
                    Some(AUTHORIZABLE_FOLDER_TYPE),
                )?;
            }
            current = next;
        }

        let home = path::join(&current, principal_name);
        if !self.store.exists(&home) {
            node_ops::add_child(self.store, self.types, self.user_id, &current, principal_name, Some(node_type))?;
            node_ops::set_property(self.store, &home, PRINCIPAL_NAME_PROPERTY, Value::from(principal_name))?;
            node_ops::set_property(self.store, &home, AUTHORIZABLE_ID_PROPERTY, Value::from(principal_name))?;
        }
        Ok(home)
    }

    /// Register authorizables whose home nodes already exist under `/home`
    ///
    /// Returns the number of authorizables registered. Nodes lacking an
    /// authorizable id are skipped.
    pub fn load_existing(&mut self) -> usize {
        if !self.store.exists(HOME_PATH) {
            return 0;
        }
        let mut loaded = 0;
        for record in self.store.subtree(HOME_PATH) {
            if !record.is_container() {
                continue;
            }
            let Some(kind) = self.home_kind(&record.path) else {
                continue;
            };
            let Some(id) = self.leaf_text(&record.path, AUTHORIZABLE_ID_PROPERTY) else {
                tracing::debug!(path = %record.path, "home node without authorizable id skipped");
                continue;
            };
            if self.membership.contains(&id) {
                continue;
            }
            let principal = self
                .leaf_text(&record.path, PRINCIPAL_NAME_PROPERTY)
                .unwrap_or_else(|| id.clone());
            if self
                .membership
                .insert(Authorizable::new(id, principal, record.path.clone(), kind))
                .is_ok()
            {
                loaded += 1;
            }
        }
        tracing::debug!(loaded, "loaded existing authorizables");
        loaded
    }

    fn home_kind(&self, node: &str) -> Option<AuthorizableKind> {
        let type_name = node_ops::primary_type(&*self.store, node).ok()?;
        let is_a = |candidate: &str| match self.types.mode() {
            ResolveMode::Strict => self.types.is_node_type(&type_name, candidate).unwrap_or(false),
            ResolveMode::Permissive => type_name == candidate,
        };
        if is_a(SYSTEM_USER_TYPE) {
            Some(AuthorizableKind::User { system: true })
        } else if is_a(USER_TYPE) {
            Some(AuthorizableKind::User { system: false })
        } else if is_a(GROUP_TYPE) {
            Some(AuthorizableKind::Group {
                declared_members: BTreeSet::new(),
            })
        } else {
            None
        }
    }

    fn leaf_text(&self, node: &str, name: &str) -> Option<String> {
        self.store
            .get(&path::join(node, name))
            .and_then(|leaf| leaf.value().map(ToString::to_string))
    }

    pub fn get_authorizable(&self, id: &str) -> Option<Authorizable> {
        self.membership.get(id).cloned()
    }

    /// Look up a user
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableTypeMismatch` if `id` names a group.
    pub fn get_user(&self, id: &str) -> Result<Option<Authorizable>> {
        self.typed(id, false)
    }

    /// Look up a group
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableTypeMismatch` if `id` names a user.
    pub fn get_group(&self, id: &str) -> Result<Option<Authorizable>> {
        self.typed(id, true)
    }

    fn typed(&self, id: &str, group: bool) -> Result<Option<Authorizable>> {
        match self.membership.get(id) {
            None => Ok(None),
            Some(a) if a.is_group() == group => Ok(Some(a.clone())),
            Some(_) => Err(RepoError::AuthorizableTypeMismatch {
                id: id.to_string(),
                expected: if group { "group" } else { "user" }.to_string(),
            }),
        }
    }

    pub fn get_authorizable_by_path(&self, path: &str) -> Option<Authorizable> {
        self.membership.by_path(path).cloned()
    }

    /// Remove an authorizable together with its home subtree
    ///
    /// Returns `false` when `id` is unknown.
    pub fn remove_authorizable(&mut self, id: &str) -> bool {
        let Some(removed) = self.membership.remove(id) else {
            return false;
        };
        self.store.remove_subtree(&removed.path);
        tracing::debug!(authorizable_id = id, path = %removed.path, "removed authorizable");
        true
    }

    pub fn find_authorizables(&self, rel_path: &str, value: Option<&str>, search_type: SearchType) -> Vec<Authorizable> {
        self.membership
            .find(rel_path, value, search_type)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn all(&self, search_type: SearchType) -> Vec<Authorizable> {
        self.membership.all(search_type).into_iter().cloned().collect()
    }

    /// Set an authorizable property
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableNotFound` if `id` is unknown.
    pub fn set_property(&mut self, id: &str, rel_path: &str, values: Vec<Value>) -> Result<()> {
        self.membership.get_required_mut(id)?.set_property(rel_path, values);
        Ok(())
    }

    /// Remove an authorizable property, returning whether it existed
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableNotFound` if `id` is unknown.
    pub fn remove_property(&mut self, id: &str, rel_path: &str) -> Result<bool> {
        Ok(self.membership.get_required_mut(id)?.remove_property(rel_path))
    }

    /// Disable a user with a reason, or re-enable it with `None`
    ///
    /// The reason is kept on the home node as `rep:disabled`.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableNotFound`, or `AuthorizableTypeMismatch` for groups.
    pub fn disable(&mut self, id: &str, reason: Option<&str>) -> Result<()> {
        let home = self.user_home(id)?;
        let flag = path::join(&home, DISABLED_PROPERTY);
        match reason {
            Some(reason) => {
                node_ops::set_property(self.store, &home, DISABLED_PROPERTY, Value::from(reason))?;
            }
            None if self.store.exists(&flag) => node_ops::remove_property(self.store, &home, DISABLED_PROPERTY)?,
            None => {}
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AuthorizableNotFound`, or `AuthorizableTypeMismatch` for groups.
    pub fn is_disabled(&self, id: &str) -> Result<bool> {
        Ok(self.disabled_reason(id)?.is_some())
    }

    /// # Errors
    ///
    /// Returns `AuthorizableNotFound`, or `AuthorizableTypeMismatch` for groups.
    pub fn disabled_reason(&self, id: &str) -> Result<Option<String>> {
        let home = self.user_home(id)?;
        Ok(self.leaf_text(&home, DISABLED_PROPERTY))
    }

    fn user_home(&self, id: &str) -> Result<String> {
        match self.typed(id, false)? {
            Some(user) => Ok(user.path),
            None => Err(RepoError::AuthorizableNotFound { id: id.to_string() }),
        }
    }

    pub fn declared_member_of(&self, id: &str) -> Vec<String> {
        self.membership.declared_member_of(id)
    }

    pub fn member_of(&self, id: &str) -> Vec<String> {
        self.membership.member_of(id)
    }

    pub fn declared_members(&self, group: &str) -> Vec<String> {
        self.membership.declared_members(group)
    }

    pub fn members(&self, group: &str) -> Vec<String> {
        self.membership.members(group)
    }

    pub fn is_member(&self, group: &str, id: &str) -> bool {
        self.membership.is_member(group, id)
    }

    pub fn is_declared_member(&self, group: &str, id: &str) -> bool {
        self.membership
            .get(group)
            .is_some_and(|g| g.is_declared_member(id))
    }

    /// # Errors
    ///
    /// See [`MembershipResolver::add_member`].
    pub fn add_member(&mut self, group: &str, id: &str) -> Result<bool> {
        self.membership.add_member(group, id)
    }

    /// # Errors
    ///
    /// See [`MembershipResolver::add_members`].
    pub fn add_members(&mut self, group: &str, ids: &[&str]) -> Result<BTreeSet<String>> {
        self.membership.add_members(group, ids)
    }

    /// # Errors
    ///
    /// See [`MembershipResolver::remove_member`].
    pub fn remove_member(&mut self, group: &str, id: &str) -> Result<bool> {
        self.membership.remove_member(group, id)
    }

    /// # Errors
    ///
    /// See [`MembershipResolver::remove_members`].
    pub fn remove_members(&mut self, group: &str, ids: &[&str]) -> Result<BTreeSet<String>> {
        self.membership.remove_members(group, ids)
    }
}
