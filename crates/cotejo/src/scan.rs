//! Recursive file-tree scanning.
//!
//! Both test discovery and output comparison need a flat view of a directory
//! tree; paths come back relative to the scanned root and are joined with
//! forward slashes on every platform so golden and generated trees compare
//! byte-for-byte.

use crate::result::CotejoResult;
use std::path::Path;

/// List every plain file under `root`, depth first.
///
/// Returned paths are relative to `root` and use `/` as the separator
/// regardless of platform. Directory entries themselves are not returned.
///
/// # Errors
///
/// Returns error if `root` does not exist or is not a directory, or if any
/// subdirectory cannot be read.
pub fn scan_tree(root: &Path) -> CotejoResult<Vec<String>> {
    let mut files = Vec::new();
    scan_into(root, "", &mut files)?;
    Ok(files)
}

fn scan_into(dir: &Path, prefix: &str, files: &mut Vec<String>) -> CotejoResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        if entry.file_type()?.is_dir() {
            scan_into(&entry.path(), &relative, files)?;
        } else {
            files.push(relative);
        }
    }
    Ok(())
}
