//! Built-in type declarations loaded into strict registries by default.

use super::{
    BASE_TYPE, CONTENT_NODE, CREATED_BY_PROPERTY, CREATED_MIXIN, CREATED_PROPERTY, DATA_PROPERTY,
    FILE_TYPE, FOLDER_TYPE, HIERARCHY_TYPE, MIXIN_TYPES_PROPERTY, PRIMARY_TYPE_PROPERTY,
    REFERENCEABLE_MIXIN, ROOT_TYPE, UNSTRUCTURED_TYPE, UUID_PROPERTY,
};
use crate::model::authorizable::PRINCIPAL_NAME_PROPERTY;
use crate::model::{ChildDefinition, PropertyDefinition, TypeDefinition, ValueType};

pub const RESOURCE_TYPE: &str = "nt:resource";
pub const AUTHORIZABLE_FOLDER_TYPE: &str = "rep:AuthorizableFolder";
pub const AUTHORIZABLE_TYPE: &str = "rep:Authorizable";
pub const USER_TYPE: &str = "rep:User";
pub const SYSTEM_USER_TYPE: &str = "rep:SystemUser";
pub const GROUP_TYPE: &str = "rep:Group";

pub const AUTHORIZABLE_ID_PROPERTY: &str = "rep:authorizableId";
pub const DISABLED_PROPERTY: &str = "rep:disabled";

/// The standard type set: base, unstructured, hierarchy, file and folder
/// types, the created/referenceable mixins, and the authorizable home types
pub fn standard_types() -> Vec<TypeDefinition> {
    vec![
        TypeDefinition::new(BASE_TYPE)
            .abstract_type()
            .with_property(
                PropertyDefinition::new(PRIMARY_TYPE_PROPERTY, ValueType::Name)
                    .mandatory()
                    .auto_created()
                    .protected(),
            )
            .with_property(PropertyDefinition::new(MIXIN_TYPES_PROPERTY, ValueType::Name).multiple().protected()),
        TypeDefinition::new(UNSTRUCTURED_TYPE)
            .orderable()
            .with_child(
                ChildDefinition::residual()
                    .with_default_type(UNSTRUCTURED_TYPE)
                    .allowing_same_name_siblings(),
            )
            .with_property(PropertyDefinition::new("*", ValueType::Undefined)),
        TypeDefinition::new(CREATED_MIXIN)
            .mixin()
            .with_property(
                PropertyDefinition::new(CREATED_PROPERTY, ValueType::Date)
                    .auto_created()
                    .protected(),
            )
            .with_property(
                PropertyDefinition::new(CREATED_BY_PROPERTY, ValueType::String)
                    .auto_created()
                    .protected(),
            ),
        TypeDefinition::new(HIERARCHY_TYPE)
            .abstract_type()
            .with_supertype(CREATED_MIXIN),
        TypeDefinition::new(FOLDER_TYPE)
            .with_supertype(HIERARCHY_TYPE)
            .with_child(ChildDefinition::residual().with_required_type(HIERARCHY_TYPE)),
        TypeDefinition::new(FILE_TYPE)
            .with_supertype(HIERARCHY_TYPE)
            .with_primary_item(CONTENT_NODE)
            .with_child(ChildDefinition::new(CONTENT_NODE).mandatory().with_required_type(BASE_TYPE)),
        TypeDefinition::new(RESOURCE_TYPE)
            .with_primary_item(DATA_PROPERTY)
            .with_property(PropertyDefinition::new(DATA_PROPERTY, ValueType::String).mandatory())
            .with_property(PropertyDefinition::new("jcr:mimeType", ValueType::String)),
        TypeDefinition::new(REFERENCEABLE_MIXIN).mixin().with_property(
            PropertyDefinition::new(UUID_PROPERTY, ValueType::String)
                .mandatory()
                .auto_created()
                .protected(),
        ),
        TypeDefinition::new(ROOT_TYPE).with_supertype(UNSTRUCTURED_TYPE),
        TypeDefinition::new(AUTHORIZABLE_FOLDER_TYPE)
            .with_supertype(HIERARCHY_TYPE)
            .with_child(ChildDefinition::residual().with_default_type(AUTHORIZABLE_FOLDER_TYPE)),
        TypeDefinition::new(AUTHORIZABLE_TYPE)
            .abstract_type()
            .with_property(PropertyDefinition::new(PRINCIPAL_NAME_PROPERTY, ValueType::String).protected())
            .with_property(PropertyDefinition::new(AUTHORIZABLE_ID_PROPERTY, ValueType::String).protected())
            .with_property(PropertyDefinition::new("*", ValueType::Undefined)),
        TypeDefinition::new(USER_TYPE)
            .with_supertype(AUTHORIZABLE_TYPE)
            .with_property(PropertyDefinition::new(DISABLED_PROPERTY, ValueType::String).protected()),
        TypeDefinition::new(SYSTEM_USER_TYPE).with_supertype(USER_TYPE),
        TypeDefinition::new(GROUP_TYPE)
            .with_supertype(AUTHORIZABLE_TYPE)
            .with_property(PropertyDefinition::new("rep:members", ValueType::Reference).multiple()),
    ]
}
