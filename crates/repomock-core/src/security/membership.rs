//! In-memory authorizable registry and group membership resolution.
//!
//! Each group stores the ids of its declared members. Every other relation is
//! derived on demand: `declared_member_of` scans the groups, and `members` /
//! `member_of` are transitive closures over the declared edges. Membership
//! graphs may contain cycles.

use std::collections::{BTreeMap, BTreeSet};

use super::principal::{Principal, PrincipalKind};
use crate::closure::transitive_closure;
use crate::errors::{RepoError, Result};
use crate::model::Authorizable;

/// Which authorizables a search or listing considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    /// Users and groups
    #[default]
    Authorizable,
    User,
    Group,
}

impl SearchType {
    pub fn accepts(&self, authorizable: &Authorizable) -> bool {
        match self {
            SearchType::Authorizable => true,
            SearchType::User => !authorizable.is_group(),
            SearchType::Group => authorizable.is_group(),
        }
    }
}

/// Authorizables of one session, keyed by id
#[derive(Debug, Clone)]
pub struct MembershipResolver {
    authorizables: BTreeMap<String, Authorizable>,
    everyone: Principal,
}

impl Default for MembershipResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MembershipResolver {
    pub fn new() -> Self {
        Self {
            authorizables: BTreeMap::new(),
            everyone: Principal::new("everyone", PrincipalKind::Everyone),
        }
    }

    /// The "everyone" principal owned by this resolver
    pub fn everyone(&self) -> &Principal {
        &self.everyone
    }

    pub fn len(&self) -> usize {
        self.authorizables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorizables.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.authorizables.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Authorizable> {
        self.authorizables.get(id)
    }

    /// # Errors
    ///
    /// Returns `AuthorizableNotFound` if `id` is unknown.
    pub fn get_required(&self, id: &str) -> Result<&Authorizable> {
        self.get(id)
            .ok_or_else(|| RepoError::AuthorizableNotFound { id: id.to_string() })
    }

    /// # Errors
    ///
    /// Returns `AuthorizableNotFound` if `id` is unknown.
    pub fn get_required_mut(&mut self, id: &str) -> Result<&mut Authorizable> {
        self.authorizables
            .get_mut(id)
            .ok_or_else(|| RepoError::AuthorizableNotFound { id: id.to_string() })
    }

    /// Resolve a group, failing when `id` is a user
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableNotFound` or `AuthorizableTypeMismatch`.
    pub fn get_group(&self, id: &str) -> Result<&Authorizable> {
        let authorizable = self.get_required(id)?;
        if !authorizable.is_group() {
            return Err(RepoError::AuthorizableTypeMismatch {
                id: id.to_string(),
                expected: "group".to_string(),
            });
        }
        Ok(authorizable)
    }

    /// # Errors
    ///
    /// Returns `AuthorizableExists` if the id is taken.
    pub fn insert(&mut self, authorizable: Authorizable) -> Result<()> {
        if self.contains(&authorizable.id) {
            return Err(RepoError::AuthorizableExists { id: authorizable.id });
        }
        tracing::debug!(authorizable_id = %authorizable.id, group = authorizable.is_group(), "registered authorizable");
        self.authorizables.insert(authorizable.id.clone(), authorizable);
        Ok(())
    }

    /// Remove an authorizable and every declared membership edge pointing at it
    pub fn remove(&mut self, id: &str) -> Option<Authorizable> {
        let removed = self.authorizables.remove(id)?;
        for other in self.authorizables.values_mut() {
            if let Some(members) = other.declared_members_mut() {
                members.remove(id);
            }
        }
        Some(removed)
    }

    /// Authorizable whose home node sits at `path`
    pub fn by_path(&self, path: &str) -> Option<&Authorizable> {
        self.authorizables.values().find(|a| a.path == path)
    }

    /// Authorizable carrying principal name `principal_name`
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableNotFound` if no authorizable has that principal.
    pub fn by_principal(&self, principal_name: &str) -> Result<&Authorizable> {
        self.authorizables
            .values()
            .find(|a| a.principal_name == principal_name)
            .ok_or_else(|| RepoError::AuthorizableNotFound {
                id: principal_name.to_string(),
            })
    }

    /// Every authorizable accepted by `search_type`, by id
    pub fn all(&self, search_type: SearchType) -> Vec<&Authorizable> {
        self.authorizables
            .values()
            .filter(|a| search_type.accepts(a))
            .collect()
    }

    /// Authorizables having property `rel_path`, optionally with a value
    /// whose text equals `value`
    pub fn find(&self, rel_path: &str, value: Option<&str>, search_type: SearchType) -> Vec<&Authorizable> {
        self.authorizables
            .values()
            .filter(|a| search_type.accepts(a))
            .filter(|a| match (a.property(rel_path), value) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(values), Some(wanted)) => values.iter().any(|v| v.to_string() == wanted),
            })
            .collect()
    }

    /// Groups that declare `id` as a member
    pub fn declared_member_of(&self, id: &str) -> Vec<String> {
        self.authorizables
            .values()
            .filter(|a| a.is_declared_member(id))
            .map(|a| a.id.clone())
            .collect()
    }

    /// Groups `id` belongs to directly or through nested groups, `id` excluded
    pub fn member_of(&self, id: &str) -> Vec<String> {
        transitive_closure(&id.to_string(), |current| self.declared_member_of(current))
    }

    pub fn declared_members(&self, group: &str) -> Vec<String> {
        self.get(group)
            .map(|a| a.declared_members().cloned().collect())
            .unwrap_or_default()
    }

    /// Members of `group` directly or through nested groups, `group` excluded
    pub fn members(&self, group: &str) -> Vec<String> {
        transitive_closure(&group.to_string(), |current| self.declared_members(current))
    }

    /// Declared in `group`, or declared in a group directly declared in `group`
    ///
    /// Only one level of nesting is consulted; use [`Self::members`] for the
    /// full closure.
    pub fn is_member(&self, group: &str, id: &str) -> bool {
        let Some(group) = self.get(group) else {
            return false;
        };
        group.is_declared_member(id)
            || group
                .declared_members()
                .filter_map(|m| self.get(m))
                .any(|nested| nested.is_declared_member(id))
    }

    /// Declare `id` as a member of `group`; `false` when already a member
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableNotFound` if either id is unknown and
    /// `AuthorizableTypeMismatch` if `group` is a user.
    pub fn add_member(&mut self, group: &str, id: &str) -> Result<bool> {
        self.get_group(group)?;
        self.get_required(id)?;
        if self.is_member(group, id) {
            return Ok(false);
        }
        self.declared_set(group)?.insert(id.to_string());
        tracing::debug!(group, member = id, "added member");
        Ok(true)
    }

    /// Declare several members, skipping unknown and already declared ids
    ///
    /// Returns the ids that were added.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableNotFound` or `AuthorizableTypeMismatch` for `group`.
    pub fn add_members(&mut self, group: &str, ids: &[&str]) -> Result<BTreeSet<String>> {
        self.get_group(group)?;
        let mut added = BTreeSet::new();
        for id in ids {
            if self.declared_members(group).iter().any(|m| m.as_str() == *id) || !self.contains(id) {
                continue;
            }
            self.add_member(group, id)?;
            added.insert(id.to_string());
        }
        Ok(added)
    }

    /// Remove a declared member; `false` when `id` was not declared
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableNotFound` or `AuthorizableTypeMismatch` for `group`.
    pub fn remove_member(&mut self, group: &str, id: &str) -> Result<bool> {
        self.get_group(group)?;
        let removed = self.declared_set(group)?.remove(id);
        if removed {
            tracing::debug!(group, member = id, "removed member");
        }
        Ok(removed)
    }

    /// Remove several declared members, returning the ids that were removed
    ///
    /// # Errors
    ///
    /// Returns `AuthorizableNotFound` or `AuthorizableTypeMismatch` for `group`.
    pub fn remove_members(&mut self, group: &str, ids: &[&str]) -> Result<BTreeSet<String>> {
        let mut removed = BTreeSet::new();
        for id in ids {
            if self.remove_member(group, id)? {
                removed.insert(id.to_string());
            }
        }
        Ok(removed)
    }

    fn declared_set(&mut self, group: &str) -> Result<&mut BTreeSet<String>> {
        self.get_required_mut(group)?
            .declared_members_mut()
            .ok_or_else(|| RepoError::AuthorizableTypeMismatch {
                id: group.to_string(),
                expected: "group".to_string(),
            })
    }
}
