//! Type registry with permissive and strict resolution.
//!
//! In permissive mode every type name resolves to a synthesized type with no
//! declared supertypes, and the queries that need real declarations fail with
//! `UnsupportedInMode`. In strict mode only registered types resolve.
//!
//! Effective supertypes and definitions are always derived by walking the
//! declared supertype edges; nothing derived is cached.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{BASE_TYPE, UNSTRUCTURED_TYPE};
use crate::closure::try_transitive_closure;
use crate::errors::{RepoError, Result};
use crate::model::{ChildDefinition, PropertyDefinition, TypeDefinition};

/// How type names resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Any name resolves to a synthesized type
    #[default]
    Permissive,
    /// Only registered names resolve
    Strict,
}

impl std::fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveMode::Permissive => write!(f, "permissive"),
            ResolveMode::Strict => write!(f, "strict"),
        }
    }
}

/// Outcome of a successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,
    Updated,
}

/// A resolved type: synthesized on demand, or backed by a declaration
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    Synthesized { name: String },
    Declared(TypeDefinition),
}

impl NodeType {
    pub fn name(&self) -> &str {
        match self {
            NodeType::Synthesized { name } => name,
            NodeType::Declared(def) => &def.name,
        }
    }

    pub fn definition(&self) -> Option<&TypeDefinition> {
        match self {
            NodeType::Synthesized { .. } => None,
            NodeType::Declared(def) => Some(def),
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, NodeType::Synthesized { .. })
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeType [name={}]", self.name())
    }
}

/// Definitions merged by name across a type hierarchy
trait NamedDefinition: Clone {
    fn def_name(&self) -> &str;
}

impl NamedDefinition for ChildDefinition {
    fn def_name(&self) -> &str {
        &self.name
    }
}

impl NamedDefinition for PropertyDefinition {
    fn def_name(&self) -> &str {
        &self.name
    }
}

/// Registry of node types for one session
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    mode: ResolveMode,
    types: BTreeMap<String, TypeDefinition>,
}

impl TypeRegistry {
    pub fn new(mode: ResolveMode) -> Self {
        Self {
            mode,
            types: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> ResolveMode {
        self.mode
    }

    /// Switch resolution mode; reserved for the schema loading entry point
    pub(crate) fn set_mode(&mut self, mode: ResolveMode) {
        tracing::debug!(from = %self.mode, to = %mode, "type registry mode switch");
        self.mode = mode;
    }

    fn unsupported(&self, op: &str) -> RepoError {
        RepoError::UnsupportedInMode {
            op: op.to_string(),
            mode: self.mode,
        }
    }

    fn require_strict(&self, op: &str) -> Result<()> {
        match self.mode {
            ResolveMode::Strict => Ok(()),
            ResolveMode::Permissive => Err(self.unsupported(op)),
        }
    }

    /// Registered declaration for `name`
    ///
    /// # Errors
    ///
    /// Returns `NoSuchType` if `name` is not registered.
    pub fn definition(&self, name: &str) -> Result<&TypeDefinition> {
        self.types.get(name).ok_or_else(|| RepoError::NoSuchType {
            name: name.to_string(),
        })
    }

    /// Resolve a type name
    ///
    /// # Errors
    ///
    /// Returns `NoSuchType` for blank names, or in strict mode for names that
    /// are not registered.
    pub fn get_type(&self, name: &str) -> Result<NodeType> {
        if name.trim().is_empty() {
            return Err(RepoError::NoSuchType {
                name: name.to_string(),
            });
        }
        match self.mode {
            ResolveMode::Permissive => Ok(NodeType::Synthesized {
                name: name.to_string(),
            }),
            ResolveMode::Strict => self.definition(name).cloned().map(NodeType::Declared),
        }
    }

    pub fn has_type(&self, name: &str) -> bool {
        match self.mode {
            ResolveMode::Permissive => !name.trim().is_empty(),
            ResolveMode::Strict => self.types.contains_key(name),
        }
    }

    /// Every registered type, by name
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode.
    pub fn all_types(&self) -> Result<Vec<&TypeDefinition>> {
        self.require_strict("all_types")?;
        Ok(self.types.values().collect())
    }

    /// Registered non-mixin types
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode.
    pub fn primary_types(&self) -> Result<Vec<&TypeDefinition>> {
        self.require_strict("primary_types")?;
        Ok(self.types.values().filter(|t| !t.is_mixin).collect())
    }

    /// Registered mixin types
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode.
    pub fn mixin_types(&self) -> Result<Vec<&TypeDefinition>> {
        self.require_strict("mixin_types")?;
        Ok(self.types.values().filter(|t| t.is_mixin).collect())
    }

    /// Register one type
    ///
    /// # Errors
    ///
    /// - `UnsupportedInMode` in permissive mode
    /// - `TypeExists` if the name is registered and `allow_update` is false
    pub fn register_type(&mut self, definition: TypeDefinition, allow_update: bool) -> Result<Registration> {
        self.require_strict("register_type")?;
        if !allow_update && self.types.contains_key(&definition.name) {
            return Err(RepoError::TypeExists {
                name: definition.name,
            });
        }
        Ok(self.insert(definition))
    }

    /// Register several types; nothing is registered unless all can be
    ///
    /// # Errors
    ///
    /// - `UnsupportedInMode` in permissive mode
    /// - `TypeExists` if any name is taken (or repeated) and `allow_update` is false
    pub fn register_types(
        &mut self,
        definitions: Vec<TypeDefinition>,
        allow_update: bool,
    ) -> Result<Vec<Registration>> {
        self.require_strict("register_types")?;
        if !allow_update {
            let mut seen = HashSet::new();
            for def in &definitions {
                if self.types.contains_key(&def.name) || !seen.insert(def.name.as_str()) {
                    return Err(RepoError::TypeExists {
                        name: def.name.clone(),
                    });
                }
            }
        }
        Ok(definitions.into_iter().map(|def| self.insert(def)).collect())
    }

    fn insert(&mut self, mut definition: TypeDefinition) -> Registration {
        definition.stamp_declaring_type();
        let name = definition.name.clone();
        let outcome = match self.types.insert(name.clone(), definition) {
            Some(_) => Registration::Updated,
            None => Registration::Registered,
        };
        tracing::debug!(type_name = %name, outcome = ?outcome, "registered type");
        outcome
    }

    /// Remove a registered type
    ///
    /// # Errors
    ///
    /// - `UnsupportedInMode` in permissive mode
    /// - `NoSuchType` if `name` is not registered
    pub fn unregister_type(&mut self, name: &str) -> Result<()> {
        self.require_strict("unregister_type")?;
        self.definition(name)?;
        self.types.remove(name);
        tracing::debug!(type_name = name, "unregistered type");
        Ok(())
    }

    /// Remove several types; nothing is removed unless all are registered
    ///
    /// # Errors
    ///
    /// - `UnsupportedInMode` in permissive mode
    /// - `NoSuchType` for the first name that is not registered
    pub fn unregister_types(&mut self, names: &[&str]) -> Result<()> {
        self.require_strict("unregister_types")?;
        for name in names {
            self.definition(name)?;
        }
        for name in names {
            self.types.remove(*name);
        }
        Ok(())
    }

    /// Declared supertype names (empty for synthesized types)
    ///
    /// # Errors
    ///
    /// Returns `NoSuchType` if `name` does not resolve.
    pub fn declared_supertypes(&self, name: &str) -> Result<Vec<String>> {
        Ok(match self.get_type(name)? {
            NodeType::Synthesized { .. } => Vec::new(),
            NodeType::Declared(def) => def.supertypes,
        })
    }

    /// All supertypes of `name`, depth-first, each once, `name` excluded
    ///
    /// In strict mode the base type is appended for non-mixin types other
    /// than the base type itself.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchType` if `name`, or a supertype met during the walk,
    /// does not resolve.
    pub fn effective_supertypes(&self, name: &str) -> Result<Vec<String>> {
        let definition = match self.get_type(name)? {
            NodeType::Synthesized { .. } => return Ok(Vec::new()),
            NodeType::Declared(def) => def,
        };

        let mut supertypes = try_transitive_closure(&definition.name, |type_name| {
            self.definition(type_name).map(|def| def.supertypes.clone())
        })?;

        if !definition.is_mixin && name != BASE_TYPE && !supertypes.iter().any(|s| s == BASE_TYPE) {
            supertypes.push(BASE_TYPE.to_string());
        }
        Ok(supertypes)
    }

    /// True when `name` is `candidate` or has it among its effective supertypes
    ///
    /// # Errors
    ///
    /// Returns `NoSuchType` if `name` does not resolve.
    pub fn is_node_type(&self, name: &str, candidate: &str) -> Result<bool> {
        if name == candidate {
            self.get_type(name)?;
            return Ok(true);
        }
        Ok(self.effective_supertypes(name)?.iter().any(|s| s == candidate))
    }

    /// Child definitions of `name` merged over its effective supertypes
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode, `NoSuchType` in strict
    /// mode for unknown names.
    pub fn effective_child_definitions(&self, name: &str) -> Result<Vec<ChildDefinition>> {
        self.require_strict("effective_child_definitions")?;
        self.merged_definitions(name, |def| &def.child_definitions)
    }

    /// Property definitions of `name` merged over its effective supertypes
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode, `NoSuchType` in strict
    /// mode for unknown names.
    pub fn effective_property_definitions(&self, name: &str) -> Result<Vec<PropertyDefinition>> {
        self.require_strict("effective_property_definitions")?;
        self.merged_definitions(name, |def| &def.property_definitions)
    }

    /// Union by definition name: supertypes in walk order, then own
    /// declarations; a later definition overwrites an earlier one of the same
    /// name in place.
    fn merged_definitions<D, F>(&self, name: &str, declared: F) -> Result<Vec<D>>
    where
        D: NamedDefinition,
        F: Fn(&TypeDefinition) -> &Vec<D>,
    {
        let own = self.definition(name)?;
        let mut merged: Vec<D> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        let supertypes = self.effective_supertypes(name)?;
        let chain = supertypes
            .iter()
            .filter_map(|s| self.types.get(s))
            .chain(std::iter::once(own));
        for def in chain {
            for item in declared(def) {
                match positions.get(item.def_name()) {
                    Some(&idx) => merged[idx] = item.clone(),
                    None => {
                        positions.insert(item.def_name().to_string(), merged.len());
                        merged.push(item.clone());
                    }
                }
            }
        }
        Ok(merged)
    }

    /// Registered types having `name` among their effective supertypes
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode, `NoSuchType` if `name`
    /// or a supertype reached during the scan is not registered.
    pub fn subtypes(&self, name: &str) -> Result<Vec<String>> {
        self.require_strict("subtypes")?;
        self.definition(name)?;
        let mut found = Vec::new();
        for candidate in self.types.keys() {
            if candidate != name && self.effective_supertypes(candidate)?.iter().any(|s| s == name) {
                found.push(candidate.clone());
            }
        }
        Ok(found)
    }

    /// Registered types declaring `name` as a direct supertype
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode, `NoSuchType` if `name`
    /// is not registered.
    pub fn declared_subtypes(&self, name: &str) -> Result<Vec<String>> {
        self.require_strict("declared_subtypes")?;
        self.definition(name)?;
        Ok(self
            .types
            .values()
            .filter(|def| def.supertypes.iter().any(|s| s == name))
            .map(|def| def.name.clone())
            .collect())
    }

    /// Whether containers of this type keep a client-controlled child order
    ///
    /// Synthesized types are orderable only for the unstructured type.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchType` if `name` does not resolve.
    pub fn has_orderable_children(&self, name: &str) -> Result<bool> {
        Ok(match self.get_type(name)? {
            NodeType::Synthesized { name } => name == UNSTRUCTURED_TYPE,
            NodeType::Declared(def) => def.orderable_children,
        })
    }

    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode, `NoSuchType` otherwise
    /// for unknown names.
    pub fn is_mixin(&self, name: &str) -> Result<bool> {
        self.require_strict("is_mixin")?;
        Ok(self.definition(name)?.is_mixin)
    }

    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode, `NoSuchType` otherwise
    /// for unknown names.
    pub fn is_abstract(&self, name: &str) -> Result<bool> {
        self.require_strict("is_abstract")?;
        Ok(self.definition(name)?.is_abstract)
    }

    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode, `NoSuchType` otherwise
    /// for unknown names.
    pub fn is_queryable(&self, name: &str) -> Result<bool> {
        self.require_strict("is_queryable")?;
        Ok(self.definition(name)?.queryable)
    }

    /// # Errors
    ///
    /// Returns `UnsupportedInMode` in permissive mode, `NoSuchType` otherwise
    /// for unknown names.
    pub fn primary_item_name(&self, name: &str) -> Result<Option<String>> {
        self.require_strict("primary_item_name")?;
        Ok(self.definition(name)?.primary_item_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    fn strict() -> TypeRegistry {
        TypeRegistry::new(ResolveMode::Strict)
    }

    #[test]
    fn test_permissive_synthesizes_any_name() {
        let registry = TypeRegistry::new(ResolveMode::Permissive);
        let t = registry.get_type("anything:goes").unwrap();
        assert!(t.is_synthesized());
        assert_eq!(t.to_string(), "NodeType [name=anything:goes]");
        assert!(registry.has_type("anything:goes"));
    }

    #[test]
    fn test_blank_name_never_resolves() {
        let registry = TypeRegistry::new(ResolveMode::Permissive);
        let err = registry.get_type("  ").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }

    #[test]
    fn test_register_duplicate_without_update() {
        let mut registry = strict();
        registry
            .register_type(TypeDefinition::new("a:one"), false)
            .unwrap();
        let err = registry
            .register_type(TypeDefinition::new("a:one"), false)
            .unwrap_err();
        assert_eq!(err.to_string(), "a:one already exists");
        assert_eq!(
            registry
                .register_type(TypeDefinition::new("a:one"), true)
                .unwrap(),
            Registration::Updated
        );
    }

    #[test]
    fn test_register_types_is_all_or_nothing() {
        let mut registry = strict();
        registry
            .register_type(TypeDefinition::new("a:taken"), false)
            .unwrap();
        let err = registry
            .register_types(
                vec![TypeDefinition::new("a:fresh"), TypeDefinition::new("a:taken")],
                false,
            )
            .unwrap_err();
        assert!(matches!(err, RepoError::TypeExists { .. }));
        assert!(!registry.has_type("a:fresh"));
    }

    #[test]
    fn test_unregister_types_validates_first() {
        let mut registry = strict();
        registry
            .register_type(TypeDefinition::new("a:one"), false)
            .unwrap();
        let err = registry.unregister_types(&["a:one", "a:missing"]).unwrap_err();
        assert!(matches!(err, RepoError::NoSuchType { .. }));
        assert!(registry.has_type("a:one"));
    }

    #[test]
    fn test_mixin_gets_no_base() {
        let mut registry = strict();
        registry
            .register_type(TypeDefinition::new("mix:m").mixin(), false)
            .unwrap();
        assert!(registry.effective_supertypes("mix:m").unwrap().is_empty());
    }

    #[test]
    fn test_declaring_type_stamped_on_register() {
        let mut registry = strict();
        registry
            .register_type(
                TypeDefinition::new("a:one").with_child(ChildDefinition::new("c")),
                false,
            )
            .unwrap();
        let defs = registry.effective_child_definitions("a:one").unwrap();
        assert_eq!(defs[0].declaring_type.as_deref(), Some("a:one"));
    }
}
