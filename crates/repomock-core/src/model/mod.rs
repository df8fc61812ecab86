pub mod authorizable;
pub mod item;
pub mod type_def;
pub mod value;

pub use authorizable::{Authorizable, AuthorizableKind};
pub use item::{DirtyState, ItemKind, ItemRecord};
pub use type_def::{ChildDefinition, OnParentVersion, PropertyDefinition, TypeDefinition};
pub use value::{Value, ValueType};
