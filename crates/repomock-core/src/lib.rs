//! repomock core - in-memory hierarchical content repository
//!
//! This crate provides an ephemeral, path-addressed item tree for tests that
//! need a content repository without a real backend, including:
//! - A flat ordered item store with atomic subtree moves and sibling ordering
//! - A type registry resolving inheritance in permissive or strict mode
//! - Users, groups and principals with transitive membership
//! - Sessions sharing a workspace's items within one repository
//!
//! Type inheritance and group membership are both resolved through the
//! cycle-safe walk in [`closure`].

pub mod closure;
pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod path;
pub mod repository;
pub mod security;
pub mod session;
pub mod types;

pub use repomock_core_types as core_types;

// Re-export commonly used types
pub use config::RepositoryConfig;
pub use errors::{ExError, ExErrorKind, RepoError, Result};
pub use model::{ItemRecord, TypeDefinition, Value};
pub use ops::ItemStore;
pub use repository::Repository;
pub use security::SearchType;
pub use session::Session;
pub use types::{ResolveMode, TypeRegistry};
