use chrono::Utc;
use regex_lite::Regex;

use super::store::ItemStore;
use crate::errors::{RepoError, Result};
use crate::model::{ChildDefinition, ItemKind, ItemRecord, Value};
use crate::path;
use crate::types::{
    ResolveMode, TypeRegistry, CONTENT_NODE, CREATED_BY_PROPERTY, CREATED_PROPERTY, DATA_PROPERTY,
    FILE_TYPE, MIXIN_TYPES_PROPERTY, PRIMARY_TYPE_PROPERTY, UNSTRUCTURED_TYPE, UUID_PROPERTY,
};

/// Add a container `name` under `parent` with the given primary type
///
/// Without a type name the parent's matching child definition supplies the
/// default type (strict mode), falling back to `nt:unstructured`. The new
/// node carries its type in `jcr:primaryType`; auto-created properties and
/// children declared by the type are populated as well.
///
/// # Errors
/// * `InvalidPath` - If `name` is not a valid segment name
/// * `PathNotFound` / `NotAContainer` - If `parent` is missing or a leaf
/// * `ItemExists` - If `parent` already has an item called `name`
/// * `NoSuchType` - If the type does not resolve
pub fn add_child(
    store: &mut ItemStore,
    types: &TypeRegistry,
    user_id: &str,
    parent: &str,
    name: &str,
    type_name: Option<&str>,
) -> Result<ItemRecord> {
    path::validate_name(name)?;
    store.get_container(parent)?;
    let child_path = path::join(parent, name);
    if store.exists(&child_path) {
        return Err(RepoError::ItemExists { path: child_path });
    }

    let primary_type = match type_name {
        Some(t) => t.to_string(),
        None => default_child_type(store, types, parent, name)?,
    };
    resolve_auto_created(types, &primary_type)?;

    let record = ItemRecord::container(child_path.as_str());
    store.put(record.clone());
    store.put(ItemRecord::leaf(
        path::join(&child_path, PRIMARY_TYPE_PROPERTY),
        Value::Name(primary_type.clone()),
    ));
    mark_changed(store, parent)?;

    let mut chain = vec![primary_type.clone()];
    populate_auto_created(store, types, user_id, &record, &primary_type, &mut chain)?;

    tracing::debug!(path = %child_path, type_name = %primary_type, "added child node");
    Ok(record)
}

fn default_child_type(store: &ItemStore, types: &TypeRegistry, parent: &str, name: &str) -> Result<String> {
    if types.mode() == ResolveMode::Strict {
        let definition = matching_child_definition(store, types, parent, name)?;
        if let Some(default) = definition.and_then(|d| d.default_primary_type) {
            return Ok(default);
        }
    }
    Ok(UNSTRUCTURED_TYPE.to_string())
}

/// Resolve `type_name` and every definition its auto-created items read
///
/// Callers run this before their first write, so a type whose inheritance
/// does not resolve fails with the store untouched.
///
/// # Errors
/// * `NoSuchType` - If the type or a type on its auto-created chain does not
///   resolve
pub(crate) fn resolve_auto_created(types: &TypeRegistry, type_name: &str) -> Result<()> {
    types.get_type(type_name)?;
    check_auto_created(types, type_name, &mut vec![type_name.to_string()])
}

fn check_auto_created(types: &TypeRegistry, type_name: &str, chain: &mut Vec<String>) -> Result<()> {
    if types.mode() == ResolveMode::Permissive {
        return Ok(());
    }
    types.effective_property_definitions(type_name)?;
    for def in types.effective_child_definitions(type_name)? {
        if !def.auto_created || def.is_residual() {
            continue;
        }
        let child_type = def
            .default_primary_type
            .clone()
            .unwrap_or_else(|| UNSTRUCTURED_TYPE.to_string());
        if chain.contains(&child_type) {
            continue;
        }
        types.get_type(&child_type)?;
        chain.push(child_type.clone());
        check_auto_created(types, &child_type, chain)?;
        chain.pop();
    }
    Ok(())
}

/// Create the auto-created items `type_name` declares on `node`
///
/// `chain` holds the types being populated above this call; a child whose
/// default type is already on the chain is skipped so recursive type
/// declarations terminate.
fn populate_auto_created(
    store: &mut ItemStore,
    types: &TypeRegistry,
    user_id: &str,
    node: &ItemRecord,
    type_name: &str,
    chain: &mut Vec<String>,
) -> Result<()> {
    match types.mode() {
        ResolveMode::Permissive => {
            if type_name == FILE_TYPE {
                put_if_absent(store, &node.path, CREATED_PROPERTY, Value::Date(Utc::now()));
                put_if_absent(store, &node.path, CREATED_BY_PROPERTY, Value::String(user_id.to_string()));
            }
            Ok(())
        }
        ResolveMode::Strict => {
            for def in types.effective_property_definitions(type_name)? {
                if !def.auto_created || def.name == "*" {
                    continue;
                }
                let value = match def.name.as_str() {
                    PRIMARY_TYPE_PROPERTY | MIXIN_TYPES_PROPERTY => continue,
                    CREATED_PROPERTY => Value::Date(Utc::now()),
                    CREATED_BY_PROPERTY => Value::String(user_id.to_string()),
                    UUID_PROPERTY => Value::String(node.identity.clone()),
                    _ => {
                        let leaf_path = path::join(&node.path, &def.name);
                        if def.default_values.is_empty() || store.exists(&leaf_path) {
                            continue;
                        }
                        let leaf = if def.multiple {
                            ItemRecord::multi_leaf(leaf_path, def.default_values.clone())
                        } else {
                            ItemRecord::leaf(leaf_path, def.default_values[0].clone())
                        };
                        store.put(leaf);
                        continue;
                    }
                };
                put_if_absent(store, &node.path, &def.name, value);
            }

            for def in types.effective_child_definitions(type_name)? {
                if !def.auto_created || def.is_residual() {
                    continue;
                }
                let child_path = path::join(&node.path, &def.name);
                if store.exists(&child_path) {
                    continue;
                }
                let child_type = def
                    .default_primary_type
                    .clone()
                    .unwrap_or_else(|| UNSTRUCTURED_TYPE.to_string());
                if chain.contains(&child_type) {
                    tracing::debug!(path = %child_path, type_name = %child_type, "skipping recursive auto-created child");
                    continue;
                }
                let child = ItemRecord::container(child_path.as_str());
                store.put(child.clone());
                store.put(ItemRecord::leaf(
                    path::join(&child_path, PRIMARY_TYPE_PROPERTY),
                    Value::Name(child_type.clone()),
                ));
                chain.push(child_type.clone());
                populate_auto_created(store, types, user_id, &child, &child_type, chain)?;
                chain.pop();
            }
            Ok(())
        }
    }
}

fn put_if_absent(store: &mut ItemStore, node: &str, name: &str, value: Value) {
    let leaf_path = path::join(node, name);
    if !store.exists(&leaf_path) {
        store.put(ItemRecord::leaf(leaf_path, value));
    }
}

fn mark_changed(store: &mut ItemStore, path: &str) -> Result<()> {
    store.update(path, ItemRecord::mark_changed)
}

/// Primary type name stored on a node
///
/// # Errors
/// * `PathNotFound` / `NotAContainer` - If `node` is missing or a leaf
pub fn primary_type(store: &ItemStore, node: &str) -> Result<String> {
    store.get_container(node)?;
    let stored = store
        .get(&path::join(node, PRIMARY_TYPE_PROPERTY))
        .and_then(|leaf| leaf.value().and_then(Value::as_str).map(str::to_string));
    Ok(stored.unwrap_or_else(|| UNSTRUCTURED_TYPE.to_string()))
}

/// Mixin type names stored on a node, in the order they were added
///
/// # Errors
/// * `PathNotFound` / `NotAContainer` - If `node` is missing or a leaf
pub fn mixin_types(store: &ItemStore, node: &str) -> Result<Vec<String>> {
    store.get_container(node)?;
    let mixins = store
        .get(&path::join(node, MIXIN_TYPES_PROPERTY))
        .and_then(|leaf| leaf.values().map(<[Value]>::to_vec))
        .unwrap_or_default();
    Ok(mixins
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}

/// Replace a node's primary type
///
/// # Errors
/// * `PathNotFound` / `NotAContainer` - If `node` is missing or a leaf
/// * `NoSuchType` - If the type does not resolve
pub fn set_primary_type(
    store: &mut ItemStore,
    types: &TypeRegistry,
    user_id: &str,
    node: &str,
    type_name: &str,
) -> Result<()> {
    let record = store.get_container(node)?;
    resolve_auto_created(types, type_name)?;
    write_leaf(
        store,
        &path::join(node, PRIMARY_TYPE_PROPERTY),
        ItemKind::Leaf {
            values: vec![Value::Name(type_name.to_string())],
            multiple: false,
        },
    );
    mark_changed(store, node)?;
    populate_auto_created(store, types, user_id, &record, type_name, &mut vec![type_name.to_string()])
}

/// Add a mixin type to a node; adding a present mixin changes nothing
///
/// # Errors
/// * `NoSuchType` - If `mixin` is blank, or (strict mode) not registered
/// * `InvalidArgument` - If (strict mode) the type is not a mixin
/// * `PathNotFound` / `NotAContainer` - If `node` is missing or a leaf
pub fn add_mixin(
    store: &mut ItemStore,
    types: &TypeRegistry,
    user_id: &str,
    node: &str,
    mixin: &str,
) -> Result<()> {
    let record = store.get_container(node)?;
    resolve_auto_created(types, mixin)?;
    if types.mode() == ResolveMode::Strict && !types.is_mixin(mixin)? {
        return Err(RepoError::InvalidArgument {
            reason: format!("{} is not a mixin type", mixin),
        });
    }

    let mut mixins = mixin_types(store, node)?;
    if mixins.iter().any(|m| m == mixin) {
        return Ok(());
    }
    mixins.push(mixin.to_string());
    write_mixins(store, node, mixins);
    mark_changed(store, node)?;
    populate_auto_created(store, types, user_id, &record, mixin, &mut vec![mixin.to_string()])
}

/// Remove a mixin type from a node
///
/// # Errors
/// * `NoSuchType` - If `mixin` is blank or not present on the node
/// * `PathNotFound` / `NotAContainer` - If `node` is missing or a leaf
pub fn remove_mixin(store: &mut ItemStore, node: &str, mixin: &str) -> Result<()> {
    let mut mixins = mixin_types(store, node)?;
    let Some(idx) = mixins.iter().position(|m| m == mixin && !mixin.trim().is_empty()) else {
        return Err(RepoError::NoSuchType {
            name: mixin.to_string(),
        });
    };
    mixins.remove(idx);
    if mixins.is_empty() {
        store.remove_subtree(&path::join(node, MIXIN_TYPES_PROPERTY));
    } else {
        write_mixins(store, node, mixins);
    }
    mark_changed(store, node)
}

fn write_mixins(store: &mut ItemStore, node: &str, mixins: Vec<String>) {
    write_leaf(
        store,
        &path::join(node, MIXIN_TYPES_PROPERTY),
        ItemKind::Leaf {
            values: mixins.into_iter().map(Value::Name).collect(),
            multiple: true,
        },
    );
}

/// Overwrite a leaf's values in place, or add it when absent
fn write_leaf(store: &mut ItemStore, leaf_path: &str, kind: ItemKind) {
    let updated = store.update(leaf_path, |record| {
        record.kind = kind.clone();
        record.mark_changed();
    });
    if updated.is_err() {
        store.put(ItemRecord {
            kind,
            ..ItemRecord::container(leaf_path)
        });
    }
}

/// Set a single-valued property on a node
///
/// An existing property is overwritten in place and marked changed; the node
/// is marked changed either way.
///
/// # Errors
/// * `PathNotFound` / `NotAContainer` - If `node` is missing or a leaf
/// * `InvalidPath` - If `name` is not a valid segment name
/// * `NotALeaf` - If a child node already uses `name`
pub fn set_property(store: &mut ItemStore, node: &str, name: &str, value: Value) -> Result<ItemRecord> {
    set_values(
        store,
        node,
        name,
        ItemKind::Leaf {
            values: vec![value],
            multiple: false,
        },
    )
}

/// Set a multi-valued property on a node
///
/// # Errors
/// Same as [`set_property`].
pub fn set_multi_property(store: &mut ItemStore, node: &str, name: &str, values: Vec<Value>) -> Result<ItemRecord> {
    set_values(store, node, name, ItemKind::Leaf { values, multiple: true })
}

fn set_values(store: &mut ItemStore, node: &str, name: &str, kind: ItemKind) -> Result<ItemRecord> {
    store.get_container(node)?;
    path::validate_name(name)?;
    let leaf_path = path::join(node, name);
    if let Some(existing) = store.get(&leaf_path) {
        if existing.is_container() {
            return Err(RepoError::NotALeaf { path: leaf_path });
        }
    }
    write_leaf(store, &leaf_path, kind);
    mark_changed(store, node)?;
    tracing::debug!(path = %leaf_path, "set property");
    store.get_required(&leaf_path)
}

/// Remove a property from a node
///
/// # Errors
/// * `PathNotFound` - If the node or the property is missing
/// * `NotALeaf` - If `name` names a child node
pub fn remove_property(store: &mut ItemStore, node: &str, name: &str) -> Result<()> {
    store.get_container(node)?;
    let leaf_path = path::join(node, name);
    if !store.get_required(&leaf_path)?.is_leaf() {
        return Err(RepoError::NotALeaf { path: leaf_path });
    }
    store.remove_subtree(&leaf_path);
    mark_changed(store, node)
}

/// The item a node designates as its primary item
///
/// Strict mode uses the primary item name declared by the node's type.
/// Otherwise a `jcr:content` child node or a `jcr:data` property qualifies.
///
/// # Errors
/// * `PathNotFound` - If the node is missing or has no primary item
/// * `NotAContainer` - If `node` is a leaf
pub fn primary_item(store: &ItemStore, types: &TypeRegistry, node: &str) -> Result<ItemRecord> {
    let type_name = primary_type(store, node)?;
    let candidates: Vec<String> = match types.mode() {
        ResolveMode::Strict => types.primary_item_name(&type_name)?.into_iter().collect(),
        ResolveMode::Permissive => vec![CONTENT_NODE.to_string(), DATA_PROPERTY.to_string()],
    };

    let found = candidates.iter().find_map(|name| {
        let record = store.get(&path::join(node, name))?;
        let qualifies = match name.as_str() {
            CONTENT_NODE => record.is_container(),
            DATA_PROPERTY => record.is_leaf(),
            _ => true,
        };
        qualifies.then_some(record)
    });
    found.ok_or_else(|| RepoError::PathNotFound {
        path: format!("{} (primary item)", node),
    })
}

/// Definition governing the node at `node` within its parent
///
/// Looks up the parent's effective child definitions (primary type and
/// mixins) by exact name, then the residual definition. Permissive mode,
/// the root, and parents declaring no match get an unprotected residual
/// definition.
///
/// # Errors
/// * `PathNotFound` / `NotAContainer` - If `node` is missing or a leaf
pub fn node_definition(store: &ItemStore, types: &TypeRegistry, node: &str) -> Result<ChildDefinition> {
    store.get_container(node)?;
    let declared = match path::parent(node) {
        Some(parent) if types.mode() == ResolveMode::Strict => {
            matching_child_definition(store, types, &parent, path::name(node))?
        }
        _ => None,
    };
    Ok(declared.unwrap_or_else(|| ChildDefinition::residual().with_default_type(UNSTRUCTURED_TYPE)))
}

fn matching_child_definition(
    store: &ItemStore,
    types: &TypeRegistry,
    parent: &str,
    name: &str,
) -> Result<Option<ChildDefinition>> {
    let mut owners = vec![primary_type(store, parent)?];
    owners.extend(mixin_types(store, parent)?);

    let mut definitions = Vec::new();
    for owner in &owners {
        definitions.extend(types.effective_child_definitions(owner)?);
    }
    let exact = definitions.iter().position(|d| d.name == name);
    let residual = definitions.iter().position(ChildDefinition::is_residual);
    Ok(exact.or(residual).map(|idx| definitions.swap_remove(idx)))
}

/// Child nodes of `node`, in order, whose names match `pattern`
///
/// # Errors
/// * `PathNotFound` / `NotAContainer` - If `node` is missing or a leaf
/// * `InvalidArgument` - If the name pattern cannot be compiled
pub fn child_nodes(store: &ItemStore, node: &str, pattern: Option<&str>) -> Result<Vec<ItemRecord>> {
    filtered_children(store, node, pattern, ItemRecord::is_container)
}

/// Properties of `node`, in order, whose names match `pattern`
///
/// # Errors
/// Same as [`child_nodes`].
pub fn properties(store: &ItemStore, node: &str, pattern: Option<&str>) -> Result<Vec<ItemRecord>> {
    filtered_children(store, node, pattern, ItemRecord::is_leaf)
}

fn filtered_children(
    store: &ItemStore,
    node: &str,
    pattern: Option<&str>,
    kind: fn(&ItemRecord) -> bool,
) -> Result<Vec<ItemRecord>> {
    store.get_container(node)?;
    let matcher = pattern.map(name_pattern).transpose()?;
    let predicate: &dyn Fn(&ItemRecord) -> bool =
        &|record| kind(record) && matcher.as_ref().map_or(true, |m| m.is_match(record.name()));
    store.list_children(node, Some(predicate))
}

/// Compile a name glob: `|`-separated alternatives where `*` matches any run
///
/// # Errors
/// * `InvalidArgument` - If the resulting expression does not compile
pub fn name_pattern(glob: &str) -> Result<Regex> {
    let alternatives: Vec<String> = glob
        .split('|')
        .map(|alt| regex_lite::escape(alt.trim()).replace(r"\*", ".*"))
        .collect();
    Regex::new(&format!("^(?:{})$", alternatives.join("|"))).map_err(|e| RepoError::InvalidArgument {
        reason: format!("name pattern '{}': {}", glob, e),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ops::item_map::ItemMap;
    use crate::types::standard_types;

    fn setup(mode: ResolveMode) -> (ItemStore, TypeRegistry) {
        let mut map = ItemMap::new();
        map.insert(ItemRecord::container("/"));
        let store = ItemStore::new(Rc::new(RefCell::new(map)), false);
        let mut types = TypeRegistry::new(mode);
        if mode == ResolveMode::Strict {
            types.register_types(standard_types(), false).unwrap();
        }
        (store, types)
    }

    #[test]
    fn test_add_child_defaults_to_unstructured() {
        let (mut store, types) = setup(ResolveMode::Permissive);
        add_child(&mut store, &types, "admin", "/", "a", None).unwrap();
        assert_eq!(primary_type(&store, "/a").unwrap(), UNSTRUCTURED_TYPE);
    }

    #[test]
    fn test_add_child_duplicate_rejected() {
        let (mut store, types) = setup(ResolveMode::Permissive);
        add_child(&mut store, &types, "admin", "/", "a", None).unwrap();
        let err = add_child(&mut store, &types, "admin", "/", "a", None).unwrap_err();
        assert!(matches!(err, RepoError::ItemExists { .. }));
    }

    #[test]
    fn test_name_pattern_alternatives() {
        let re = name_pattern("jcr:* | foo").unwrap();
        assert!(re.is_match("jcr:title"));
        assert!(re.is_match("foo"));
        assert!(!re.is_match("foobar"));
    }

    #[test]
    fn test_set_property_on_child_node_name() {
        let (mut store, types) = setup(ResolveMode::Permissive);
        add_child(&mut store, &types, "admin", "/", "a", None).unwrap();
        add_child(&mut store, &types, "admin", "/a", "b", None).unwrap();
        let err = set_property(&mut store, "/a", "b", Value::from("x")).unwrap_err();
        assert!(matches!(err, RepoError::NotALeaf { .. }));
    }

    #[test]
    fn test_remove_last_mixin_drops_leaf() {
        let (mut store, types) = setup(ResolveMode::Strict);
        add_child(&mut store, &types, "admin", "/", "a", None).unwrap();
        add_mixin(&mut store, &types, "admin", "/a", "mix:referenceable").unwrap();
        assert!(store.exists("/a/jcr:uuid"));
        remove_mixin(&mut store, "/a", "mix:referenceable").unwrap();
        assert!(!store.exists("/a/jcr:mixinTypes"));
    }
}
