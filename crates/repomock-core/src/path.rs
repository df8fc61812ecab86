//! Path algebra over slash-delimited absolute item paths
//!
//! Paths are ASCII, `/`-delimited and absolute. The root is `/`; no other
//! path carries a trailing slash. Segment names never contain `/`.

use crate::errors::{RepoError, Result};

/// Path of the root container
pub const ROOT: &str = "/";

/// Normalize an absolute path
///
/// Collapses repeated slashes, drops `.` segments, resolves `..` segments and
/// strips a trailing slash.
///
/// # Errors
///
/// Returns `InvalidPath` for relative paths or `..` escaping the root.
pub fn normalize(path: &str) -> Result<String> {
    if !path.starts_with('/') {
        return Err(RepoError::InvalidPath {
            path: path.to_string(),
            reason: "path must be absolute".to_string(),
        });
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(RepoError::InvalidPath {
                        path: path.to_string(),
                        reason: "'..' escapes the root".to_string(),
                    });
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        Ok(ROOT.to_string())
    } else {
        Ok(format!("/{}", segments.join("/")))
    }
}

/// Parent path, or `None` for the root
pub fn parent(path: &str) -> Option<String> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT.to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

/// Final segment of the path; empty for the root
pub fn name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Child path of `parent` named `name`
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Number of segments below the root (root = 0)
pub fn depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

/// Ancestor of `path` at `depth` (0 = root, `depth(path)` = the path itself)
///
/// # Errors
///
/// Returns `PathNotFound` when `depth` is deeper than the path.
pub fn ancestor(path: &str, depth: usize) -> Result<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if depth > segments.len() {
        return Err(RepoError::PathNotFound {
            path: format!("{} (ancestor at depth {})", path, depth),
        });
    }
    if depth == 0 {
        return Ok(ROOT.to_string());
    }
    Ok(format!("/{}", segments[..depth].join("/")))
}

/// True when `path` equals `ancestor` or lies anywhere beneath it
pub fn is_self_or_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT {
        return path.starts_with('/');
    }
    path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

/// Rewrite `path` (which lies at or under `src`) to lie at or under `dst`
pub fn relocate(path: &str, src: &str, dst: &str) -> String {
    format!("{}{}", dst, &path[src.len()..])
}

/// True when a segment name carries a same-name-sibling index, e.g. `item[2]`
pub fn has_sibling_index(name: &str) -> bool {
    let Some(body) = name.strip_suffix(']') else {
        return false;
    };
    match body.rfind('[') {
        Some(open) => {
            let digits = &body[open + 1..];
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Validate a single segment name for a new item
///
/// # Errors
///
/// Returns `InvalidPath` for empty names, `.`/`..`, or names containing `/`.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name must not be empty")
    } else if name == "." || name == ".." {
        Some("name must not be a relative segment")
    } else if name.contains('/') {
        Some("name must not contain '/'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RepoError::InvalidPath {
            path: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Anchored pattern matching exactly the direct children of `parent`
///
/// Built from the escaped parent path so `/a/child1` never matches children
/// of `/a/child10`.
pub fn child_pattern(parent: &str) -> String {
    let base = if parent == ROOT { "" } else { parent };
    format!("^{}/[^/]+$", regex_lite::escape(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/").unwrap(), "/");
        assert_eq!(normalize("/a/b/").unwrap(), "/a/b");
        assert_eq!(normalize("//a//b").unwrap(), "/a/b");
        assert_eq!(normalize("/a/./b/../c").unwrap(), "/a/c");
        assert!(normalize("a/b").is_err());
        assert!(normalize("/..").is_err());
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(parent("/"), None);
        assert_eq!(parent("/a"), Some("/".to_string()));
        assert_eq!(parent("/a/b"), Some("/a".to_string()));
        assert_eq!(name("/a/b"), "b");
        assert_eq!(name("/"), "");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
    }

    #[test]
    fn test_depth_and_ancestor() {
        assert_eq!(depth("/"), 0);
        assert_eq!(depth("/a/b/c"), 3);
        assert_eq!(ancestor("/a/b/c", 0).unwrap(), "/");
        assert_eq!(ancestor("/a/b/c", 2).unwrap(), "/a/b");
        assert_eq!(ancestor("/a/b/c", 3).unwrap(), "/a/b/c");
        assert!(ancestor("/a/b/c", 4).is_err());
    }

    #[test]
    fn test_self_or_descendant_respects_segment_boundary() {
        assert!(is_self_or_descendant("/a/child1", "/a/child1"));
        assert!(is_self_or_descendant("/a/child1/x", "/a/child1"));
        assert!(!is_self_or_descendant("/a/child10", "/a/child1"));
        assert!(is_self_or_descendant("/anything", "/"));
    }

    #[test]
    fn test_sibling_index_detection() {
        assert!(has_sibling_index("item[1]"));
        assert!(has_sibling_index("item[12]"));
        assert!(!has_sibling_index("item"));
        assert!(!has_sibling_index("item[]"));
        assert!(!has_sibling_index("item[a]"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("child").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn test_child_pattern() {
        let re = regex_lite::Regex::new(&child_pattern("/a/child1")).unwrap();
        assert!(re.is_match("/a/child1/x"));
        assert!(!re.is_match("/a/child10/x"));
        assert!(!re.is_match("/a/child1/x/y"));

        let root = regex_lite::Regex::new(&child_pattern("/")).unwrap();
        assert!(root.is_match("/a"));
        assert!(!root.is_match("/a/b"));
    }
}
