use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Property key holding an authorizable's principal name
pub const PRINCIPAL_NAME_PROPERTY: &str = "rep:principalName";

/// User or group specific state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuthorizableKind {
    User {
        system: bool,
    },
    Group {
        /// Ids of directly declared members
        declared_members: BTreeSet<String>,
    },
}

/// A user or group known to the membership resolver
///
/// Authorizable properties live in their own map keyed by relative path;
/// they are separate from the properties of the home node in the item store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorizable {
    pub id: String,
    pub principal_name: String,
    /// Path of the home node in the item store
    pub path: String,
    pub kind: AuthorizableKind,
    properties: BTreeMap<String, Vec<Value>>,
}

impl Authorizable {
    pub fn new(
        id: impl Into<String>,
        principal_name: impl Into<String>,
        path: impl Into<String>,
        kind: AuthorizableKind,
    ) -> Self {
        let principal_name = principal_name.into();
        let mut properties = BTreeMap::new();
        properties.insert(
            PRINCIPAL_NAME_PROPERTY.to_string(),
            vec![Value::String(principal_name.clone())],
        );
        Self {
            id: id.into(),
            principal_name,
            path: path.into(),
            kind,
            properties,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, AuthorizableKind::Group { .. })
    }

    pub fn is_system_user(&self) -> bool {
        matches!(self.kind, AuthorizableKind::User { system: true })
    }

    /// Only the built-in administrator id counts as admin
    pub fn is_admin(&self) -> bool {
        !self.is_group() && self.id == "admin"
    }

    /// Declared members of a group; empty for users
    pub fn declared_members(&self) -> impl Iterator<Item = &String> {
        let members = match &self.kind {
            AuthorizableKind::Group { declared_members } => Some(declared_members.iter()),
            AuthorizableKind::User { .. } => None,
        };
        members.into_iter().flatten()
    }

    pub fn is_declared_member(&self, id: &str) -> bool {
        match &self.kind {
            AuthorizableKind::Group { declared_members } => declared_members.contains(id),
            AuthorizableKind::User { .. } => false,
        }
    }

    pub(crate) fn declared_members_mut(&mut self) -> Option<&mut BTreeSet<String>> {
        match &mut self.kind {
            AuthorizableKind::Group { declared_members } => Some(declared_members),
            AuthorizableKind::User { .. } => None,
        }
    }

    /// Names of properties stored directly on the authorizable (no `/`)
    pub fn property_names(&self) -> Vec<&str> {
        self.properties
            .keys()
            .filter(|k| !k.contains('/'))
            .map(String::as_str)
            .collect()
    }

    /// Property keys stored under `rel_path`
    pub fn property_names_under(&self, rel_path: &str) -> Vec<&str> {
        self.properties
            .keys()
            .filter(|k| k.starts_with(rel_path))
            .map(String::as_str)
            .collect()
    }

    pub fn has_property(&self, rel_path: &str) -> bool {
        self.properties.contains_key(rel_path)
    }

    pub fn property(&self, rel_path: &str) -> Option<&[Value]> {
        self.properties.get(rel_path).map(Vec::as_slice)
    }

    pub fn set_property(&mut self, rel_path: impl Into<String>, values: Vec<Value>) {
        self.properties.insert(rel_path.into(), values);
    }

    /// Returns whether a property was removed
    pub fn remove_property(&mut self, rel_path: &str) -> bool {
        self.properties.remove(rel_path).is_some()
    }
}

impl std::fmt::Display for Authorizable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = if self.is_group() { "Group" } else { "User" };
        write!(f, "{} [id={}]", label, self.id)
    }
}
