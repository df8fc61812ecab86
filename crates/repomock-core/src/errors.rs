use repomock_core_types::SessionId;
use thiserror::Error;

use crate::types::ResolveMode;

/// Result type alias using RepoError
pub type Result<T> = std::result::Result<T, RepoError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Stable classification of every failure a repository operation can raise.
/// Each kind maps to a stable error code usable for programmatic handling and
/// test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    /// Path, identity, type or authorizable does not resolve
    NotFound,
    /// Destination path, type name or authorizable id is taken
    AlreadyExists,
    /// Operation applied to the wrong kind of item or authorizable
    TypeMismatch,
    /// Malformed path, name or argument
    InvalidArgument,
    /// Query not available in the type registry's current resolve mode
    UnsupportedInCurrentMode,
    /// Operation never supported by the in-memory repository
    Unsupported,
    /// Session was logged out
    SessionClosed,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::InvalidArgument => "ERR_INVALID_ARGUMENT",
            ExErrorKind::UnsupportedInCurrentMode => "ERR_UNSUPPORTED_IN_CURRENT_MODE",
            ExErrorKind::Unsupported => "ERR_UNSUPPORTED",
            ExErrorKind::SessionClosed => "ERR_SESSION_CLOSED",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus whatever context the failing operation
/// could attach (operation name, path, type or authorizable name, session).
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    path: Option<String>,
    name: Option<String>,
    session_id: Option<SessionId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            path: None,
            name: None,
            session_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add item path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add type name or authorizable id context
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add session context
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(name) = &self.name {
            write!(f, " (name: {})", name)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for repository operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepoError {
    // ===== Item Errors =====
    /// No item at the given path
    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    /// No container carries the given identity token
    #[error("No item with identifier: {identifier}")]
    ItemNotFound { identifier: String },

    /// An item already occupies the destination path
    #[error("Item exists: {path}")]
    ItemExists { path: String },

    /// Operation needs a container but found a leaf
    #[error("Not a container: {path}")]
    NotAContainer { path: String },

    /// Operation needs a leaf but found a container
    #[error("Not a leaf: {path}")]
    NotALeaf { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Move destination carries a same-name-sibling index
    #[error("Destination path must not carry a sibling index: {path}")]
    IndexedDestination { path: String },

    // ===== Type Errors =====
    #[error("{name} does not exist")]
    NoSuchType { name: String },

    #[error("{name} already exists")]
    TypeExists { name: String },

    #[error("{op} is not supported in {mode} mode")]
    UnsupportedInMode { op: String, mode: ResolveMode },

    #[error("{op} is not supported")]
    Unsupported { op: String },

    // ===== Membership Errors =====
    #[error("Authorizable already exists: {id}")]
    AuthorizableExists { id: String },

    #[error("Authorizable not found: {id}")]
    AuthorizableNotFound { id: String },

    /// Authorizable exists but is of the other kind (user vs group)
    #[error("Authorizable {id} is not a {expected}")]
    AuthorizableTypeMismatch { id: String, expected: String },

    // ===== Generic Errors =====
    #[error("Session is not live")]
    SessionClosed,

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RepoError {
    /// Classify this error against the canonical taxonomy
    pub fn kind(&self) -> ExErrorKind {
        match self {
            RepoError::PathNotFound { .. }
            | RepoError::ItemNotFound { .. }
            | RepoError::NoSuchType { .. }
            | RepoError::AuthorizableNotFound { .. } => ExErrorKind::NotFound,
            RepoError::ItemExists { .. }
            | RepoError::TypeExists { .. }
            | RepoError::AuthorizableExists { .. } => ExErrorKind::AlreadyExists,
            RepoError::NotAContainer { .. }
            | RepoError::NotALeaf { .. }
            | RepoError::AuthorizableTypeMismatch { .. } => ExErrorKind::TypeMismatch,
            RepoError::InvalidPath { .. }
            | RepoError::IndexedDestination { .. }
            | RepoError::InvalidArgument { .. }
            | RepoError::Config { .. } => ExErrorKind::InvalidArgument,
            RepoError::UnsupportedInMode { .. } => ExErrorKind::UnsupportedInCurrentMode,
            RepoError::Unsupported { .. } => ExErrorKind::Unsupported,
            RepoError::SessionClosed => ExErrorKind::SessionClosed,
            RepoError::Internal { .. } => ExErrorKind::Internal,
        }
    }
}

/// Conversion from RepoError to ExError
impl From<RepoError> for ExError {
    fn from(err: RepoError) -> Self {
        let base = ExError::new(err.kind()).with_message(err.to_string());
        match err {
            RepoError::PathNotFound { path }
            | RepoError::ItemExists { path }
            | RepoError::NotAContainer { path }
            | RepoError::NotALeaf { path }
            | RepoError::InvalidPath { path, .. } => base.with_path(path),

            RepoError::IndexedDestination { path } => base.with_op("move").with_path(path),

            RepoError::ItemNotFound { identifier } => {
                base.with_op("get_by_identity").with_name(identifier)
            }

            RepoError::NoSuchType { name } | RepoError::TypeExists { name } => base.with_name(name),

            RepoError::UnsupportedInMode { op, .. } | RepoError::Unsupported { op } => {
                base.with_op(op)
            }

            RepoError::AuthorizableExists { id }
            | RepoError::AuthorizableNotFound { id }
            | RepoError::AuthorizableTypeMismatch { id, .. } => base.with_name(id),

            RepoError::SessionClosed
            | RepoError::InvalidArgument { .. }
            | RepoError::Config { .. }
            | RepoError::Internal { .. } => base,
        }
    }
}

/// Conversion from toml deserialization errors to RepoError
impl From<toml::de::Error> for RepoError {
    fn from(err: toml::de::Error) -> Self {
        RepoError::Config {
            message: err.to_string(),
        }
    }
}
