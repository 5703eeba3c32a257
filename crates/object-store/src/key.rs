use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::errors::{StoreError, StoreErrorKind, StoreResult};

pub const SEPARATOR: char = '/';

/// Checks a key before any filesystem access.
///
/// Rejects empty keys, leading or trailing separators, backslashes and NUL
/// bytes, and any key whose `..` segments climb out of the root or land on
/// the root itself.
pub fn ensure_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreErrorKind::EmptyKey.into());
    }
    if key.starts_with(SEPARATOR) {
        return Err(StoreError::invalid_key(key, "leading separator"));
    }
    if key.ends_with(SEPARATOR) {
        return Err(StoreError::invalid_key(key, "trailing separator"));
    }
    if key.contains('\\') {
        return Err(StoreError::invalid_key(key, "backslash in key"));
    }
    if key.contains('\0') {
        return Err(StoreError::invalid_key(key, "nul byte in key"));
    }

    let mut depth = 0usize;
    for segment in key.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| StoreError::invalid_key(key, "path escapes storage root"))?;
            }
            _ => depth += 1,
        }
    }
    if depth == 0 {
        return Err(StoreError::invalid_key(key, "key resolves to storage root"));
    }
    Ok(())
}

/// Maps a validated key onto a path under `root`.
///
/// `root` is expected to be clean already (the backend stores its
/// canonical root).
pub fn object_path(root: &Path, key: &str) -> StoreResult<PathBuf> {
    let path = root.join(key).clean();
    if path == root || !path.starts_with(root) {
        return Err(StoreError::invalid_key(key, "path escapes storage root"));
    }
    Ok(path)
}
