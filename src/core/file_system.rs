//! Vault file tree

use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::{DirEntry, WalkDir};

use super::project::MARKER_FILE;

const MAX_DEPTH: usize = 10;

/// Directories that never hold source documents
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "_site", "_book", "_freeze"];

/// Extensions quarto can render
const DOCUMENT_EXTENSIONS: &[&str] = &["qmd", "md", "ipynb", "rmd"];

/// Represents a file or directory in the tree
#[derive(Debug, Clone)]
pub struct FileNode {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub children: Vec<FileNode>,
    pub expanded: bool,
}

impl FileNode {
    /// Create a new file node
    pub fn new(path: PathBuf, is_dir: bool) -> Self {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Self {
            name,
            path,
            is_dir,
            children: Vec::new(),
            expanded: false,
        }
    }

    /// Check if this is a document quarto can render
    pub fn is_document(&self) -> bool {
        !self.is_dir && is_document(&self.path)
    }

    /// Directory holding a quarto project marker
    pub fn is_project_root(&self) -> bool {
        self.is_dir
            && self
                .children
                .iter()
                .any(|c| !c.is_dir && c.name == MARKER_FILE)
    }

    /// Sort children: directories first, then files, alphabetically
    pub fn sort_children(&mut self) {
        self.children.sort_by(|a, b| match (a.is_dir, b.is_dir) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        });
        for child in &mut self.children {
            child.sort_children();
        }
    }
}

/// Check a path's extension against the renderable document types
pub fn is_document(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            DOCUMENT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Hidden entries and build output; the walk root itself is never skipped
fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
}

/// File tree representing a vault structure
#[derive(Debug, Clone, Default)]
pub struct FileTree {
    pub root: Option<FileNode>,
    pub root_path: Option<PathBuf>,
}

impl FileTree {
    /// Create a file tree from a directory path
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut root = FileNode::new(path.to_path_buf(), true);
        root.expanded = true;

        // Entries arrive depth-first; `stack[d]` is the open directory at depth d.
        let mut stack = vec![root];
        let walker = WalkDir::new(path)
            .min_depth(1)
            .max_depth(MAX_DEPTH)
            .into_iter()
            .filter_entry(|e| !is_skipped(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            fold_into_parent(&mut stack, entry.depth());
            stack.push(FileNode::new(
                entry.path().to_path_buf(),
                entry.file_type().is_dir(),
            ));
        }
        fold_into_parent(&mut stack, 1);

        let mut root = stack.pop().ok_or_else(|| anyhow::anyhow!("Empty file tree"))?;
        root.sort_children();

        Ok(Self {
            root: Some(root),
            root_path: Some(path.to_path_buf()),
        })
    }

    /// Refresh the file tree
    pub fn refresh(&mut self) -> Result<()> {
        if let Some(root_path) = self.root_path.clone() {
            *self = Self::from_path(&root_path)?;
        }
        Ok(())
    }

    /// Find a node by path
    #[allow(dead_code)]
    pub fn find_node(&self, path: &Path) -> Option<&FileNode> {
        self.root.as_ref().and_then(|root| Self::find_in_node(root, path))
    }

    fn find_in_node<'a>(node: &'a FileNode, path: &Path) -> Option<&'a FileNode> {
        if node.path == path {
            return Some(node);
        }

        node.children
            .iter()
            .find_map(|child| Self::find_in_node(child, path))
    }

    /// Toggle expansion state of a directory
    pub fn toggle_expanded(&mut self, path: &Path) {
        if let Some(ref mut root) = self.root {
            Self::toggle_in_node(root, path);
        }
    }

    fn toggle_in_node(node: &mut FileNode, path: &Path) {
        if node.path == path {
            node.expanded = !node.expanded;
            return;
        }

        for child in &mut node.children {
            Self::toggle_in_node(child, path);
        }
    }
}

/// Close every open node deeper than `depth - 1`, attaching each to its parent
fn fold_into_parent(stack: &mut Vec<FileNode>, depth: usize) {
    while stack.len() > depth {
        let Some(node) = stack.pop() else { break };
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => {
                stack.push(node);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_nesting_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("reports/sub")).unwrap();
        std::fs::write(root.join("reports/_quarto.yml"), "").unwrap();
        std::fs::write(root.join("reports/sub/analysis.qmd"), "").unwrap();
        std::fs::write(root.join("b.md"), "").unwrap();
        std::fs::write(root.join("A.md"), "").unwrap();

        let tree = FileTree::from_path(root).unwrap();
        let node = tree.root.as_ref().unwrap();
        let names: Vec<_> = node.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["reports", "A.md", "b.md"]);

        let analysis = tree.find_node(&root.join("reports/sub/analysis.qmd")).unwrap();
        assert!(analysis.is_document());
    }

    #[test]
    fn test_hidden_and_build_dirs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".obsidian")).unwrap();
        std::fs::create_dir_all(root.join("site/_site")).unwrap();
        std::fs::write(root.join("site/_site/index.html"), "").unwrap();
        std::fs::write(root.join("site/index.qmd"), "").unwrap();

        let tree = FileTree::from_path(root).unwrap();
        assert!(tree.find_node(&root.join(".obsidian")).is_none());
        assert!(tree.find_node(&root.join("site/_site/index.html")).is_none());
        assert!(tree.find_node(&root.join("site/index.qmd")).is_some());
    }

    #[test]
    fn test_project_roots_are_marked() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("reports/sub")).unwrap();
        std::fs::write(root.join("reports").join(MARKER_FILE), "").unwrap();
        std::fs::write(root.join("reports/sub/analysis.qmd"), "").unwrap();

        let tree = FileTree::from_path(root).unwrap();
        assert!(tree.find_node(&root.join("reports")).unwrap().is_project_root());
        assert!(!tree.find_node(&root.join("reports/sub")).unwrap().is_project_root());
        assert!(!tree.root.as_ref().unwrap().is_project_root());
    }

    #[test]
    fn test_document_extensions() {
        assert!(is_document(Path::new("a.qmd")));
        assert!(is_document(Path::new("a.Rmd")));
        assert!(is_document(Path::new("a.ipynb")));
        assert!(!is_document(Path::new("_quarto.yml")));
    }
}
