//! Contains a collection of useful utility functions.

use std::fs::read;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::Result;

/// Create a static deser object from given path using serde.
///
/// Format is picked based on the file extension.
pub fn deser_struct_from_path<T>(file_path: &Path) -> Result<T>
where
    for<'de> T: serde::Deserialize<'de>,
{
    let bytes = read(file_path).map_err(|e| {
        Error::ConfigError(format!(
            "failed reading {}: {}",
            file_path.to_string_lossy(),
            e
        ))
    })?;
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let d: T = match ext {
        "toml" => toml::from_slice(&bytes)?,
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yaml::from_slice(&bytes)?,
        _ => {
            return Err(Error::ConfigError(format!(
                "unsupported file format: {}",
                file_path.to_string_lossy()
            )))
        }
    };
    Ok(d)
}

/// Resolves a possibly relative path against the directory of a manifest.
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        match base.parent() {
            Some(parent) => parent.join(path),
            None => path.to_path_buf(),
        }
    } else {
        path.to_path_buf()
    }
}

#[test]
fn resolve_relative_to_manifest_dir() {
    let base = Path::new("/projects/abc/sweep.toml");
    assert_eq!(
        resolve_relative(base, Path::new("design.toml")),
        PathBuf::from("/projects/abc/design.toml")
    );
    assert_eq!(
        resolve_relative(base, Path::new("/tmp/model.nlogo")),
        PathBuf::from("/tmp/model.nlogo")
    );
}
