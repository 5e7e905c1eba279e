//! Quarto project root detection

use std::path::{Path, PathBuf};

use super::vault::Vault;

/// Presence of this file marks a directory as a Quarto project root
pub const MARKER_FILE: &str = "_quarto.yml";

/// Walk upward from `start` looking for [`MARKER_FILE`].
///
/// Every level from `start` up to and including `boundary` is checked,
/// the boundary itself included. Returns the nearest directory holding
/// the marker. When `start` is not below `boundary` the walk continues to
/// the filesystem root.
pub fn locate(start: &Path, boundary: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        if dir.join(MARKER_FILE).is_file() {
            return Some(dir.to_path_buf());
        }
        if dir == boundary {
            break;
        }
    }
    None
}

/// Project root of a vault-relative `file`, as a vault-relative directory.
///
/// The search starts in the folder containing the file and never leaves
/// the vault. A project at the vault root is the empty path.
pub fn find_project_root(vault: &Vault, file: &Path) -> Option<PathBuf> {
    let folder = file.parent().unwrap_or(Path::new(""));
    let found = locate(&vault.absolute(folder), vault.root())?;
    vault.relative(&found)
}
