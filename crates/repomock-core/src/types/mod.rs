//! Type graph resolution: named node types, inheritance, and definitions.

pub mod registry;
pub mod standard;

pub use registry::{NodeType, Registration, ResolveMode, TypeRegistry};
pub use standard::standard_types;

/// Universal base type appended to every non-mixin type's supertypes
pub const BASE_TYPE: &str = "nt:base";
/// Default primary type for new containers
pub const UNSTRUCTURED_TYPE: &str = "nt:unstructured";
pub const FOLDER_TYPE: &str = "nt:folder";
pub const FILE_TYPE: &str = "nt:file";
pub const HIERARCHY_TYPE: &str = "nt:hierarchyNode";
pub const CREATED_MIXIN: &str = "mix:created";
pub const REFERENCEABLE_MIXIN: &str = "mix:referenceable";
pub const ROOT_TYPE: &str = "rep:root";

// Item names with built-in meaning
pub const PRIMARY_TYPE_PROPERTY: &str = "jcr:primaryType";
pub const MIXIN_TYPES_PROPERTY: &str = "jcr:mixinTypes";
pub const CREATED_PROPERTY: &str = "jcr:created";
pub const CREATED_BY_PROPERTY: &str = "jcr:createdBy";
pub const UUID_PROPERTY: &str = "jcr:uuid";
pub const CONTENT_NODE: &str = "jcr:content";
pub const DATA_PROPERTY: &str = "jcr:data";
