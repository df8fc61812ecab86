#![allow(clippy::unwrap_used, clippy::expect_used)]

use repomock_core::{Repository, RepositoryConfig, ResolveMode, Session};

/// Open a session on a fresh repository in the given mode
#[allow(dead_code)]
pub fn new_session(mode: ResolveMode) -> Session {
    let config = RepositoryConfig {
        resolve_mode: mode,
        ..RepositoryConfig::default()
    };
    Repository::new(config)
        .new_session()
        .expect("Should open session")
}

/// Open a permissive session and create `paths` as unstructured nodes
///
/// Paths are created in the given order, so parents must come first.
#[allow(dead_code)]
pub fn session_with(paths: &[&str]) -> Session {
    let mut session = new_session(ResolveMode::Permissive);
    for p in paths {
        let (parent, name) = p.rsplit_once('/').expect("absolute path");
        let parent = if parent.is_empty() { "/" } else { parent };
        session
            .add_child(parent, name, None)
            .expect("Should add node");
    }
    session
}

/// Names of the child nodes of `parent`, in order
#[allow(dead_code)]
pub fn child_names(session: &Session, parent: &str) -> Vec<String> {
    session
        .child_nodes(parent, None)
        .expect("Should list children")
        .iter()
        .map(|r| r.name().to_string())
        .collect()
}
