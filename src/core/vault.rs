//! Vault root and vault-relative path resolution

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// An open note collection rooted at an absolute directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    /// Open a vault at `root`, which must be an existing directory
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("Not a directory: {}", root.display());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve vault path: {}", root.display()))?;
        Ok(Self { root })
    }

    /// Wrap an already absolute root without touching the filesystem
    #[allow(dead_code)]
    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a vault-relative path; the empty path is the vault root
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        if relative.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    /// Vault-relative form of an absolute path, `None` when outside the vault
    pub fn relative(&self, absolute: &Path) -> Option<PathBuf> {
        absolute
            .strip_prefix(&self.root)
            .ok()
            .map(Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_relative_path_is_root() {
        let vault = Vault::at(PathBuf::from("/vault"));
        assert_eq!(vault.absolute(Path::new("")), PathBuf::from("/vault"));
    }

    #[test]
    fn test_absolute_and_relative() {
        let vault = Vault::at(PathBuf::from("/vault"));
        let abs = vault.absolute(Path::new("reports/sub/analysis.qmd"));
        assert_eq!(abs, PathBuf::from("/vault/reports/sub/analysis.qmd"));
        assert_eq!(
            vault.relative(&abs),
            Some(PathBuf::from("reports/sub/analysis.qmd"))
        );
        assert_eq!(vault.relative(Path::new("/elsewhere/a.qmd")), None);
    }

    #[test]
    fn test_open_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("note.md");
        std::fs::write(&file, "").unwrap();
        assert!(Vault::open(&file).is_err());
        assert!(Vault::open(dir.path()).is_ok());
    }
}
