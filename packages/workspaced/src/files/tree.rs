use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use super::types::{FileNode, NodeKind};

/// Directories never shown to the client.
const EXCLUDED_DIRS: &[&str] = &[
    "__pycache__",
    "node_modules",
    ".git",
    ".github",
    ".vscode",
    ".idea",
];

/// Recursively build the workspace tree rooted at `abs`. `rel` is the path
/// relative to the workspace root, used for the client-facing `path` field.
pub fn build_file_tree(abs: &Path, rel: &Path) -> Result<FileNode> {
    let name = abs
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| abs.to_string_lossy().into_owned());

    let mut children: Vec<FileNode> = Vec::new();
    let entries = std::fs::read_dir(abs)
        .with_context(|| format!("cannot read directory {}", abs.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("cannot read entry in {}", abs.display()))?;
        let entry_name = entry.file_name().to_string_lossy().into_owned();
        let entry_abs = entry.path();
        let entry_rel = rel.join(&entry_name);

        if entry_abs.is_dir() {
            if EXCLUDED_DIRS.contains(&entry_name.as_str()) {
                continue;
            }
            children.push(build_file_tree(&entry_abs, &entry_rel)?);
        } else {
            children.push(FileNode {
                id: node_id(&entry_abs),
                name: entry_name.clone(),
                kind: NodeKind::File,
                path: client_path(&entry_rel),
                children: None,
                language: detect_language(&entry_name),
            });
        }
    }

    // Folders first, then case-insensitive by name.
    children.sort_by(|a, b| match (a.kind, b.kind) {
        (NodeKind::Folder, NodeKind::File) => std::cmp::Ordering::Less,
        (NodeKind::File, NodeKind::Folder) => std::cmp::Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });

    Ok(FileNode {
        id: node_id(abs),
        name,
        kind: NodeKind::Folder,
        path: client_path(rel),
        children: if children.is_empty() {
            None
        } else {
            Some(children)
        },
        language: None,
    })
}

fn client_path(rel: &Path) -> String {
    format!("/{}", rel.display())
}

/// Stable short identifier for a node, derived from its absolute path.
fn node_id(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}

pub fn detect_language(name: &str) -> Option<String> {
    let ext = Path::new(name)
        .extension()?
        .to_string_lossy()
        .to_lowercase();
    let lang = match ext.as_str() {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" => "javascript",
        "go" => "go",
        "py" => "python",
        "java" => "java",
        "rs" => "rust",
        "css" => "css",
        "html" => "html",
        "json" => "json",
        "md" => "markdown",
        _ => return None,
    };
    Some(lang.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_languages() {
        assert_eq!(detect_language("app.TSX").as_deref(), Some("typescript"));
        assert_eq!(detect_language("main.go").as_deref(), Some("go"));
        assert_eq!(detect_language("lib.rs").as_deref(), Some("rust"));
        assert_eq!(detect_language("notes.md").as_deref(), Some("markdown"));
        assert_eq!(detect_language("data.bin"), None);
        assert_eq!(detect_language("Makefile"), None);
    }

    #[test]
    fn node_id_is_stable_and_short() {
        let a = node_id(Path::new("/code/src/main.rs"));
        let b = node_id(Path::new("/code/src/main.rs"));
        let c = node_id(Path::new("/code/src/lib.rs"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn builds_sorted_tree_with_exclusions() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("zebra.txt"), "z").unwrap();
        std::fs::write(tmp.path().join("Alpha.py"), "a").unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::create_dir(tmp.path().join("node_modules")).unwrap();
        std::fs::write(tmp.path().join("node_modules/x.js"), "x").unwrap();

        let root = build_file_tree(tmp.path(), Path::new("")).unwrap();
        assert_eq!(root.kind, NodeKind::Folder);
        assert_eq!(root.path, "/");

        let children = root.children.unwrap();
        // node_modules is excluded; folders sort before files.
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].name, "src");
        assert_eq!(children[0].kind, NodeKind::Folder);
        assert_eq!(children[1].name, "Alpha.py");
        assert_eq!(children[1].language.as_deref(), Some("python"));
        assert_eq!(children[2].name, "zebra.txt");

        let src_children = children[0].children.as_ref().unwrap();
        assert_eq!(src_children[0].path, "/src/main.rs");
        assert_eq!(src_children[0].language.as_deref(), Some("rust"));
    }

    #[test]
    fn empty_folder_has_no_children_field() {
        let tmp = tempfile::tempdir().unwrap();
        let root = build_file_tree(tmp.path(), Path::new("")).unwrap();
        assert!(root.children.is_none());
    }

    #[test]
    fn missing_directory_errors() {
        assert!(build_file_tree(Path::new("/definitely/not/here"), Path::new("")).is_err());
    }
}
