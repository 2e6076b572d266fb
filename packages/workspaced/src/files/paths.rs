use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path escapes the workspace root")]
    Escape,
}

/// Normalize a client-supplied path into a relative path inside the
/// workspace: leading slashes are stripped, `.` components dropped, and any
/// `..` rejected outright. Works on paths that do not exist yet, unlike
/// canonicalize-based checks.
pub fn clean_relative(path: &str) -> Result<PathBuf, PathError> {
    let trimmed = path.trim_start_matches('/');
    let mut clean = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::Escape);
            }
        }
    }
    Ok(clean)
}

/// Resolve a client-supplied path against the workspace root, guaranteeing
/// the result stays under it.
pub fn resolve_within(root: &Path, path: &str) -> Result<PathBuf, PathError> {
    Ok(root.join(clean_relative(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_slash() {
        assert_eq!(clean_relative("/src/main.rs").unwrap(), PathBuf::from("src/main.rs"));
    }

    #[test]
    fn drops_current_dir_components() {
        assert_eq!(clean_relative("./a/./b").unwrap(), PathBuf::from("a/b"));
    }

    #[test]
    fn empty_and_root_resolve_to_root_itself() {
        assert_eq!(clean_relative("").unwrap(), PathBuf::new());
        assert_eq!(clean_relative("/").unwrap(), PathBuf::new());
    }

    #[test]
    fn rejects_parent_traversal() {
        assert_eq!(clean_relative("../etc/passwd"), Err(PathError::Escape));
        assert_eq!(clean_relative("a/../../b"), Err(PathError::Escape));
        assert_eq!(clean_relative("/a/.."), Err(PathError::Escape));
    }

    #[test]
    fn resolves_under_root() {
        let root = Path::new("/code");
        assert_eq!(
            resolve_within(root, "/src/lib.rs").unwrap(),
            PathBuf::from("/code/src/lib.rs")
        );
        assert!(resolve_within(root, "../outside").is_err());
    }
}
