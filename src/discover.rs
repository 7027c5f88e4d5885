//! Finding log files beneath a root directory.

use std::path::{Path, PathBuf};

use glob::glob;

use crate::error::PipelineError;

/// Default discovery pattern: every `access-log*` file at any depth.
pub const DEFAULT_PATTERN: &str = "**/access-log*";

/// Regular files under `root` matching `pattern`, sorted by path.
///
/// A directory that cannot be read while walking is an error: the logs
/// inside it would otherwise be missing from the run.
pub fn discover(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let pattern = resolve_glob(root, pattern);
    let mut paths = glob(&pattern)
        .map_err(|source| PipelineError::Glob {
            pattern: pattern.clone(),
            source,
        })?
        .filter(|entry| match entry {
            Ok(path) => path.is_file(),
            Err(_) => true,
        })
        .collect::<Result<Vec<PathBuf>, _>>()?;

    paths.sort();
    Ok(paths)
}

/// Join `pattern` onto `root` as a single glob string.
pub fn resolve_glob(root: &Path, pattern: &str) -> String {
    root.join(pattern).to_string_lossy().into_owned()
}
