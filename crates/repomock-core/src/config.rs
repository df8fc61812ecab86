//! Repository configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{RepoError, Result};
use crate::types::ResolveMode;

pub const DEFAULT_USER_ID: &str = "admin";
pub const DEFAULT_WORKSPACE: &str = "mockedWorkspace";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// User id of sessions opened without explicit credentials
    pub default_user_id: String,

    /// Workspace of sessions opened without a workspace name
    pub default_workspace: String,

    /// Resolve mode of each new session's type registry
    pub resolve_mode: ResolveMode,

    /// Repository descriptor flag; moves onto an occupied path are rejected
    /// regardless
    pub same_name_siblings_supported: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_user_id: DEFAULT_USER_ID.to_string(),
            default_workspace: DEFAULT_WORKSPACE.to_string(),
            resolve_mode: ResolveMode::Permissive,
            same_name_siblings_supported: false,
        }
    }
}

impl RepositoryConfig {
    /// Parse a config from TOML text
    ///
    /// # Errors
    ///
    /// Returns `Config` for malformed TOML or unknown enum values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RepositoryConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, or the defaults when it does not exist
    ///
    /// # Errors
    ///
    /// Returns `Config` when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| RepoError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.default_workspace.trim().is_empty() {
            return Err(RepoError::Config {
                message: "default_workspace must not be blank".to_string(),
            });
        }
        if self.default_user_id.trim().is_empty() {
            return Err(RepoError::Config {
                message: "default_user_id must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(RepositoryConfig::from_toml_str("").unwrap(), RepositoryConfig::default());
    }

    #[test]
    fn test_strict_mode_parsed() {
        let config = RepositoryConfig::from_toml_str("resolve_mode = \"strict\"\n").unwrap();
        assert_eq!(config.resolve_mode, ResolveMode::Strict);
        assert_eq!(config.default_user_id, "admin");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err = RepositoryConfig::from_toml_str("resolve_mode = \"lenient\"\n").unwrap_err();
        assert!(matches!(err, RepoError::Config { .. }));
    }

    #[test]
    fn test_missing_file_defaults() {
        let config = RepositoryConfig::load(Path::new("/nonexistent/repomock.toml")).unwrap();
        assert_eq!(config.default_workspace, "mockedWorkspace");
    }
}
