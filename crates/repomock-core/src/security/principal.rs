//! Principal queries over the authorizables of one membership resolver.
//!
//! Every query here is best-effort: a lookup that fails is logged at debug
//! level and yields an empty result.

use super::membership::{MembershipResolver, SearchType};
use crate::model::authorizable::PRINCIPAL_NAME_PROPERTY;
use crate::model::Authorizable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalKind {
    User,
    SystemUser,
    Group,
    /// The implicit principal every authorizable belongs to
    Everyone,
}

/// Name under which an authorizable is known to access control
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    pub name: String,
    pub kind: PrincipalKind,
}

impl Principal {
    pub fn new(name: impl Into<String>, kind: PrincipalKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, PrincipalKind::Group | PrincipalKind::Everyone)
    }
}

impl From<&Authorizable> for Principal {
    fn from(authorizable: &Authorizable) -> Self {
        let kind = if authorizable.is_group() {
            PrincipalKind::Group
        } else if authorizable.is_system_user() {
            PrincipalKind::SystemUser
        } else {
            PrincipalKind::User
        };
        Principal::new(authorizable.principal_name.clone(), kind)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Read-only principal view of a membership resolver
#[derive(Debug, Clone, Copy)]
pub struct PrincipalManager<'a> {
    membership: &'a MembershipResolver,
}

impl<'a> PrincipalManager<'a> {
    pub fn new(membership: &'a MembershipResolver) -> Self {
        Self { membership }
    }

    pub fn everyone(&self) -> &'a Principal {
        self.membership.everyone()
    }

    /// Principals whose principal name equals `filter` (all when `None`)
    pub fn find_principals(&self, filter: Option<&str>, search_type: SearchType) -> Vec<Principal> {
        self.membership
            .find(PRINCIPAL_NAME_PROPERTY, filter, search_type)
            .into_iter()
            .map(Principal::from)
            .collect()
    }

    /// Group principals `principal` belongs to, directly or transitively
    pub fn group_membership(&self, principal: &Principal) -> Vec<Principal> {
        match self.membership.by_principal(&principal.name) {
            Ok(authorizable) => self
                .membership
                .member_of(&authorizable.id)
                .iter()
                .filter_map(|id| self.membership.get(id))
                .map(Principal::from)
                .collect(),
            Err(e) => {
                tracing::debug!(principal = %principal.name, error = %e, "group membership lookup failed");
                Vec::new()
            }
        }
    }

    pub fn principal(&self, name: &str) -> Option<Principal> {
        match self.membership.by_principal(name) {
            Ok(authorizable) => Some(Principal::from(authorizable)),
            Err(e) => {
                tracing::debug!(principal = name, error = %e, "principal lookup failed");
                None
            }
        }
    }

    pub fn has_principal(&self, name: &str) -> bool {
        self.principal(name).is_some()
    }

    pub fn principals(&self, search_type: SearchType) -> Vec<Principal> {
        self.membership
            .all(search_type)
            .into_iter()
            .map(Principal::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::AuthorizableKind;

    #[test]
    fn test_unknown_principal_degrades() {
        let membership = MembershipResolver::new();
        let pm = PrincipalManager::new(&membership);
        assert!(pm.principal("nobody").is_none());
        assert!(pm
            .group_membership(&Principal::new("nobody", PrincipalKind::User))
            .is_empty());
    }

    #[test]
    fn test_everyone_is_per_resolver() {
        let a = MembershipResolver::new();
        let b = MembershipResolver::new();
        assert_eq!(PrincipalManager::new(&a).everyone().name, "everyone");
        assert!(!std::ptr::eq(a.everyone(), b.everyone()));
    }

    #[test]
    fn test_group_principal_kind() {
        let g = Authorizable::new(
            "g",
            "g",
            "/home/groups/g",
            AuthorizableKind::Group {
                declared_members: BTreeSet::new(),
            },
        );
        assert_eq!(Principal::from(&g).kind, PrincipalKind::Group);
    }
}
