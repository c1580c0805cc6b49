use std::path::PathBuf;

use anyhow::{Error, Result};

/// Walks up the directory tree looking for a sweep manifest.
pub(crate) fn find_manifest(path: PathBuf, recursion_levels: usize) -> Result<PathBuf> {
    let mut recursion_levels = recursion_levels;
    let mut path = path;
    while recursion_levels > 0 {
        let candidate = path.join(sweep_core::SWEEP_MANIFEST_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
        recursion_levels -= 1;
        match path.parent() {
            Some(parent_path) => path = parent_path.to_path_buf(),
            None => break,
        }
    }
    Err(Error::msg(format!(
        "{} not found, pass one with --manifest",
        sweep_core::SWEEP_MANIFEST_FILE
    )))
}
