//! Type declarations: node types with their child and property definitions.

use serde::{Deserialize, Serialize};

use super::value::{Value, ValueType};

/// What happens to a child item when its parent is versioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnParentVersion {
    #[default]
    Copy,
    Version,
    Initialize,
    Compute,
    Ignore,
    Abort,
}

/// Definition of a child container slot declared by a type.
///
/// The name `*` declares a residual slot matching any child name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDefinition {
    pub name: String,
    /// Type names a child in this slot must be (or extend)
    pub required_primary_types: Vec<String>,
    /// Type used when the child is auto-created or added without a type
    pub default_primary_type: Option<String>,
    pub auto_created: bool,
    pub mandatory: bool,
    pub protected: bool,
    pub allows_same_name_siblings: bool,
    pub on_parent_version: OnParentVersion,
    /// Type that declared this definition; set on registration
    pub declaring_type: Option<String>,
}

impl ChildDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_primary_types: Vec::new(),
            default_primary_type: None,
            auto_created: false,
            mandatory: false,
            protected: false,
            allows_same_name_siblings: false,
            on_parent_version: OnParentVersion::default(),
            declaring_type: None,
        }
    }

    /// Residual definition matching any child name
    pub fn residual() -> Self {
        Self::new("*")
    }

    pub fn is_residual(&self) -> bool {
        self.name == "*"
    }

    pub fn auto_created(mut self) -> Self {
        self.auto_created = true;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn allowing_same_name_siblings(mut self) -> Self {
        self.allows_same_name_siblings = true;
        self
    }

    pub fn with_required_type(mut self, type_name: impl Into<String>) -> Self {
        self.required_primary_types.push(type_name.into());
        self
    }

    pub fn with_default_type(mut self, type_name: impl Into<String>) -> Self {
        self.default_primary_type = Some(type_name.into());
        self
    }

    pub fn with_on_parent_version(mut self, action: OnParentVersion) -> Self {
        self.on_parent_version = action;
        self
    }
}

/// Definition of a leaf (property) slot declared by a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    pub required_type: ValueType,
    pub default_values: Vec<Value>,
    pub value_constraints: Vec<String>,
    pub multiple: bool,
    pub auto_created: bool,
    pub mandatory: bool,
    pub protected: bool,
    pub full_text_searchable: bool,
    pub query_orderable: bool,
    pub on_parent_version: OnParentVersion,
    pub declaring_type: Option<String>,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, required_type: ValueType) -> Self {
        Self {
            name: name.into(),
            required_type,
            default_values: Vec::new(),
            value_constraints: Vec::new(),
            multiple: false,
            auto_created: false,
            mandatory: false,
            protected: false,
            full_text_searchable: true,
            query_orderable: true,
            on_parent_version: OnParentVersion::default(),
            declaring_type: None,
        }
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn auto_created(mut self) -> Self {
        self.auto_created = true;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_values.push(value);
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.value_constraints.push(constraint.into());
        self
    }
}

/// A registered (or registrable) node type.
///
/// Effective supertypes and definitions are never stored here; the type
/// registry derives them by walking declared supertype edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    pub is_mixin: bool,
    pub is_abstract: bool,
    pub queryable: bool,
    pub orderable_children: bool,
    /// Declared supertype names, in declaration order
    pub supertypes: Vec<String>,
    pub primary_item_name: Option<String>,
    pub child_definitions: Vec<ChildDefinition>,
    pub property_definitions: Vec<PropertyDefinition>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_mixin: false,
            is_abstract: false,
            queryable: true,
            orderable_children: false,
            supertypes: Vec::new(),
            primary_item_name: None,
            child_definitions: Vec::new(),
            property_definitions: Vec::new(),
        }
    }

    pub fn mixin(mut self) -> Self {
        self.is_mixin = true;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn not_queryable(mut self) -> Self {
        self.queryable = false;
        self
    }

    pub fn orderable(mut self) -> Self {
        self.orderable_children = true;
        self
    }

    pub fn with_supertype(mut self, name: impl Into<String>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    pub fn with_primary_item(mut self, name: impl Into<String>) -> Self {
        self.primary_item_name = Some(name.into());
        self
    }

    pub fn with_child(mut self, definition: ChildDefinition) -> Self {
        self.child_definitions.push(definition);
        self
    }

    pub fn with_property(mut self, definition: PropertyDefinition) -> Self {
        self.property_definitions.push(definition);
        self
    }

    /// Stamp this type's name as the declaring type on every own definition
    pub(crate) fn stamp_declaring_type(&mut self) {
        for def in &mut self.child_definitions {
            def.declaring_type = Some(self.name.clone());
        }
        for def in &mut self.property_definitions {
            def.declaring_type = Some(self.name.clone());
        }
    }
}

impl std::fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeDefinition [name={}]", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_stamp() {
        let mut def = TypeDefinition::new("nt:folder")
            .with_supertype("nt:hierarchyNode")
            .with_child(ChildDefinition::residual().with_required_type("nt:hierarchyNode"))
            .with_property(PropertyDefinition::new("jcr:title", ValueType::String));
        def.stamp_declaring_type();

        assert_eq!(def.supertypes, vec!["nt:hierarchyNode".to_string()]);
        assert!(def.child_definitions[0].is_residual());
        assert_eq!(
            def.property_definitions[0].declaring_type.as_deref(),
            Some("nt:folder")
        );
    }
}
