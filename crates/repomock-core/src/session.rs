//! Session: the public façade over one workspace.
//!
//! A session owns its type registry and membership resolver; only the item
//! map is shared with other sessions on the same workspace. Structural
//! mutations are boundary operations and emit start/end log events carrying
//! the session id.

use std::time::Instant;

use repomock_core_types::SessionId;

use crate::config::RepositoryConfig;
use crate::errors::{ExError, RepoError, Result};
use crate::model::{ChildDefinition, ItemRecord, TypeDefinition, Value};
use crate::ops::{node_ops, ItemStore, SharedItems};
use crate::path;
use crate::security::{MembershipResolver, PrincipalManager, UserManager};
use crate::types::{standard_types, Registration, ResolveMode, TypeRegistry};
use crate::{log_op_end, log_op_error, log_op_start};

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    user_id: String,
    workspace: String,
    live: bool,
    store: ItemStore,
    types: TypeRegistry,
    membership: MembershipResolver,
}

impl Session {
    /// Open a session over a workspace's items
    ///
    /// Strict registries start with the standard types; existing
    /// authorizable home nodes under `/home` are registered.
    pub(crate) fn open(
        user_id: &str,
        workspace: &str,
        items: SharedItems,
        config: &RepositoryConfig,
    ) -> Result<Self> {
        let mut types = TypeRegistry::new(config.resolve_mode);
        if config.resolve_mode == ResolveMode::Strict {
            types.register_types(standard_types(), false)?;
        }
        let mut session = Self {
            id: SessionId::new(),
            user_id: user_id.to_string(),
            workspace: workspace.to_string(),
            live: true,
            store: ItemStore::new(items, config.same_name_siblings_supported),
            types,
            membership: MembershipResolver::new(),
        };
        session.user_manager()?.load_existing();
        Ok(session)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn workspace_name(&self) -> &str {
        &self.workspace
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// End the session; every later operation fails with `SessionClosed`
    pub fn logout(&mut self) {
        tracing::debug!(session_id = %self.id, "logout");
        self.live = false;
    }

    fn ensure_live(&self) -> Result<()> {
        if self.live {
            Ok(())
        } else {
            Err(RepoError::SessionClosed)
        }
    }

    /// Run `f` as a logged boundary operation
    fn boundary<T>(&mut self, op: &'static str, path: &str, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let start = Instant::now();
        log_op_start!(op, session_id = self.id.as_str(), path = path);

        let result = self.ensure_live().and_then(|()| f(self));

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                log_op_end!(op, duration_ms = duration_ms, session_id = self.id.as_str());
            }
            Err(e) => log_op_error!(
                op,
                self.error_context(op, e.clone()),
                duration_ms = duration_ms,
                session_id = self.id.as_str()
            ),
        }
        result
    }

    /// Structured form of an error raised by `op` on this session
    ///
    /// Carries this session's id; `op` fills in only when the error does
    /// not name its operation already.
    pub fn error_context(&self, op: &str, err: RepoError) -> ExError {
        let ex_err = ExError::from(err).with_session_id(self.id.clone());
        if ex_err.op().is_some() {
            ex_err
        } else {
            ex_err.with_op(op)
        }
    }

    // ===== Item access =====

    /// # Errors
    ///
    /// Returns `SessionClosed` after logout.
    pub fn root(&self) -> Result<ItemRecord> {
        self.get(path::ROOT)
    }

    /// Item at an absolute path
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for malformed paths and `PathNotFound` when
    /// nothing is stored there.
    pub fn get(&self, abs_path: &str) -> Result<ItemRecord> {
        self.ensure_live()?;
        self.store.get_required(&path::normalize(abs_path)?)
    }

    /// # Errors
    ///
    /// As [`Self::get`], plus `NotAContainer` for properties.
    pub fn get_node(&self, abs_path: &str) -> Result<ItemRecord> {
        self.ensure_live()?;
        self.store.get_container(&path::normalize(abs_path)?)
    }

    /// # Errors
    ///
    /// As [`Self::get`], plus `NotALeaf` for nodes.
    pub fn get_property(&self, abs_path: &str) -> Result<ItemRecord> {
        let record = self.get(abs_path)?;
        if !record.is_leaf() {
            return Err(RepoError::NotALeaf { path: record.path });
        }
        Ok(record)
    }

    /// Node carrying the identity token `identifier`
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` when no node carries it.
    pub fn get_by_identity(&self, identifier: &str) -> Result<ItemRecord> {
        self.ensure_live()?;
        self.store
            .find_by_identity(identifier)
            .ok_or_else(|| RepoError::ItemNotFound {
                identifier: identifier.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns `SessionClosed` after logout or `InvalidPath` for malformed paths.
    pub fn item_exists(&self, abs_path: &str) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.store.exists(&path::normalize(abs_path)?))
    }

    /// # Errors
    ///
    /// See [`Self::item_exists`].
    pub fn node_exists(&self, abs_path: &str) -> Result<bool> {
        self.ensure_live()?;
        Ok(self
            .store
            .get(&path::normalize(abs_path)?)
            .is_some_and(|r| r.is_container()))
    }

    /// # Errors
    ///
    /// See [`Self::item_exists`].
    pub fn property_exists(&self, abs_path: &str) -> Result<bool> {
        self.ensure_live()?;
        Ok(self
            .store
            .get(&path::normalize(abs_path)?)
            .is_some_and(|r| r.is_leaf()))
    }

    /// Direct children of `parent` in order, optionally filtered
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` / `NotAContainer` for a missing or leaf parent.
    pub fn list_children(
        &self,
        parent: &str,
        filter: Option<&dyn Fn(&ItemRecord) -> bool>,
    ) -> Result<Vec<ItemRecord>> {
        self.ensure_live()?;
        let parent = path::normalize(parent)?;
        self.store.get_container(&parent)?;
        self.store.list_children(&parent, filter)
    }

    /// Child nodes whose names match a glob such as `jcr:*|foo`
    ///
    /// # Errors
    ///
    /// See [`node_ops::child_nodes`].
    pub fn child_nodes(&self, node: &str, pattern: Option<&str>) -> Result<Vec<ItemRecord>> {
        self.ensure_live()?;
        node_ops::child_nodes(&self.store, &path::normalize(node)?, pattern)
    }

    /// Properties whose names match a glob such as `jcr:*|foo`
    ///
    /// # Errors
    ///
    /// See [`node_ops::properties`].
    pub fn properties(&self, node: &str, pattern: Option<&str>) -> Result<Vec<ItemRecord>> {
        self.ensure_live()?;
        node_ops::properties(&self.store, &path::normalize(node)?, pattern)
    }

    /// # Errors
    ///
    /// Returns `PathNotFound` when nothing is stored at `abs_path`.
    pub fn is_new(&self, abs_path: &str) -> Result<bool> {
        Ok(self.get(abs_path)?.is_new())
    }

    /// # Errors
    ///
    /// Returns `PathNotFound` when nothing is stored at `abs_path`.
    pub fn is_modified(&self, abs_path: &str) -> Result<bool> {
        Ok(self.get(abs_path)?.is_modified())
    }

    // ===== Structural mutations =====

    /// Add a child node, defaulting its type as described in
    /// [`node_ops::add_child`]
    ///
    /// # Errors
    ///
    /// See [`node_ops::add_child`].
    pub fn add_child(&mut self, parent: &str, name: &str, type_name: Option<&str>) -> Result<ItemRecord> {
        self.boundary("add_child", parent, |s| {
            let parent = path::normalize(parent)?;
            node_ops::add_child(&mut s.store, &s.types, &s.user_id, &parent, name, type_name)
        })
    }

    /// Delete the item at `abs_path` with everything beneath it
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` when absent and `InvalidArgument` for the root.
    pub fn remove(&mut self, abs_path: &str) -> Result<()> {
        self.boundary("remove", abs_path, |s| {
            let target = path::normalize(abs_path)?;
            let parent = path::parent(&target).ok_or_else(|| RepoError::InvalidArgument {
                reason: "the root cannot be removed".to_string(),
            })?;
            s.store.get_required(&target)?;
            s.store.remove_subtree(&target);
            s.store.update(&parent, ItemRecord::mark_changed)
        })
    }

    /// Move the node at `src` (with its subtree) to `dst`
    ///
    /// # Errors
    ///
    /// See [`ItemStore::move_subtree`].
    pub fn move_item(&mut self, src: &str, dst: &str) -> Result<()> {
        self.boundary("move", src, |s| {
            let src = path::normalize(src)?;
            let dst = path::normalize(dst)?;
            let moved = s.store.move_subtree(&src, &dst)?;
            tracing::debug!(src = %src, dest_path = %dst, moved_count = moved, "move applied");
            Ok(())
        })
    }

    /// Place child `moved` of `parent` directly before sibling `before`, or
    /// last when `before` is `None`
    ///
    /// # Errors
    ///
    /// See [`ItemStore::reorder_siblings`].
    pub fn order_before(&mut self, parent: &str, moved: &str, before: Option<&str>) -> Result<()> {
        self.boundary("order_before", parent, |s| {
            let parent = path::normalize(parent)?;
            s.store.reorder_siblings(&parent, moved, before)?;
            s.store.update(&parent, ItemRecord::mark_changed)
        })
    }

    /// # Errors
    ///
    /// See [`node_ops::set_property`].
    pub fn set_property(&mut self, node: &str, name: &str, value: impl Into<Value>) -> Result<ItemRecord> {
        self.ensure_live()?;
        node_ops::set_property(&mut self.store, &path::normalize(node)?, name, value.into())
    }

    /// # Errors
    ///
    /// See [`node_ops::set_multi_property`].
    pub fn set_multi_property(&mut self, node: &str, name: &str, values: Vec<Value>) -> Result<ItemRecord> {
        self.ensure_live()?;
        node_ops::set_multi_property(&mut self.store, &path::normalize(node)?, name, values)
    }

    /// # Errors
    ///
    /// See [`node_ops::remove_property`].
    pub fn remove_property(&mut self, node: &str, name: &str) -> Result<()> {
        self.ensure_live()?;
        node_ops::remove_property(&mut self.store, &path::normalize(node)?, name)
    }

    // ===== Node typing =====

    /// # Errors
    ///
    /// Returns `PathNotFound` / `NotAContainer` for a missing node or a leaf.
    pub fn primary_type(&self, node: &str) -> Result<String> {
        self.ensure_live()?;
        node_ops::primary_type(&self.store, &path::normalize(node)?)
    }

    /// # Errors
    ///
    /// Returns `PathNotFound` / `NotAContainer` for a missing node or a leaf.
    pub fn mixin_types(&self, node: &str) -> Result<Vec<String>> {
        self.ensure_live()?;
        node_ops::mixin_types(&self.store, &path::normalize(node)?)
    }

    /// True when the node's primary type or one of its mixins is, or extends,
    /// `type_name`
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` / `NotAContainer` for a missing node or a leaf,
    /// and `NoSuchType` in strict mode for unregistered stored types.
    pub fn is_node_type(&self, node: &str, type_name: &str) -> Result<bool> {
        let mut own = vec![self.primary_type(node)?];
        own.extend(self.mixin_types(node)?);
        for t in &own {
            if self.types.is_node_type(t, type_name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// # Errors
    ///
    /// See [`node_ops::set_primary_type`].
    pub fn set_primary_type(&mut self, node: &str, type_name: &str) -> Result<()> {
        self.ensure_live()?;
        let node = path::normalize(node)?;
        node_ops::set_primary_type(&mut self.store, &self.types, &self.user_id, &node, type_name)
    }

    /// # Errors
    ///
    /// See [`node_ops::add_mixin`].
    pub fn add_mixin(&mut self, node: &str, mixin: &str) -> Result<()> {
        self.ensure_live()?;
        let node = path::normalize(node)?;
        node_ops::add_mixin(&mut self.store, &self.types, &self.user_id, &node, mixin)
    }

    /// # Errors
    ///
    /// See [`node_ops::remove_mixin`].
    pub fn remove_mixin(&mut self, node: &str, mixin: &str) -> Result<()> {
        self.ensure_live()?;
        node_ops::remove_mixin(&mut self.store, &path::normalize(node)?, mixin)
    }

    /// # Errors
    ///
    /// See [`node_ops::primary_item`].
    pub fn primary_item(&self, node: &str) -> Result<ItemRecord> {
        self.ensure_live()?;
        node_ops::primary_item(&self.store, &self.types, &path::normalize(node)?)
    }

    /// # Errors
    ///
    /// See [`node_ops::node_definition`].
    pub fn node_definition(&self, node: &str) -> Result<ChildDefinition> {
        self.ensure_live()?;
        node_ops::node_definition(&self.store, &self.types, &path::normalize(node)?)
    }

    // ===== Type registry =====

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// # Errors
    ///
    /// See [`TypeRegistry::register_type`].
    pub fn register_type(&mut self, definition: TypeDefinition, allow_update: bool) -> Result<Registration> {
        let name = definition.name.clone();
        self.boundary("register_type", &name, |s| s.types.register_type(definition, allow_update))
    }

    /// # Errors
    ///
    /// See [`TypeRegistry::register_types`].
    pub fn register_types(&mut self, definitions: Vec<TypeDefinition>, allow_update: bool) -> Result<Vec<Registration>> {
        self.boundary("register_types", path::ROOT, |s| s.types.register_types(definitions, allow_update))
    }

    /// # Errors
    ///
    /// See [`TypeRegistry::unregister_type`].
    pub fn unregister_type(&mut self, name: &str) -> Result<()> {
        self.boundary("unregister_type", name, |s| s.types.unregister_type(name))
    }

    /// # Errors
    ///
    /// See [`TypeRegistry::unregister_types`].
    pub fn unregister_types(&mut self, names: &[&str]) -> Result<()> {
        self.boundary("unregister_types", path::ROOT, |s| s.types.unregister_types(names))
    }

    /// Switch the registry to strict mode and register `definitions` over
    /// the standard types, replacing same-named declarations
    ///
    /// This is the entry point for definitions produced by a schema parser.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` after logout.
    pub fn load_type_definitions(&mut self, definitions: Vec<TypeDefinition>) -> Result<Vec<Registration>> {
        self.boundary("load_type_definitions", path::ROOT, |s| {
            s.types.set_mode(ResolveMode::Strict);
            s.types.register_types(standard_types(), true)?;
            s.types.register_types(definitions, true)
        })
    }

    // ===== Security =====

    /// User manager over this session's authorizables and workspace
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` after logout.
    pub fn user_manager(&mut self) -> Result<UserManager<'_>> {
        self.ensure_live()?;
        Ok(UserManager::new(&mut self.membership, &mut self.store, &self.types, &self.user_id))
    }

    /// # Errors
    ///
    /// Returns `SessionClosed` after logout.
    pub fn principal_manager(&self) -> Result<PrincipalManager<'_>> {
        self.ensure_live()?;
        Ok(PrincipalManager::new(&self.membership))
    }

    // ===== Lifecycle =====

    /// # Errors
    ///
    /// Returns `SessionClosed` after logout.
    pub fn has_pending_changes(&self) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.store.has_pending_changes())
    }

    /// Mark every item saved and clear the pending-change flag
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` after logout.
    pub fn save(&mut self) -> Result<()> {
        self.boundary("save", path::ROOT, |s| {
            s.store.commit();
            Ok(())
        })
    }

    /// Only `keep_changes = true` is supported, and it changes nothing
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` for `keep_changes = false`.
    pub fn refresh(&mut self, keep_changes: bool) -> Result<()> {
        self.ensure_live()?;
        if keep_changes {
            Ok(())
        } else {
            Err(RepoError::Unsupported {
                op: "refresh without keeping changes".to_string(),
            })
        }
    }
}
