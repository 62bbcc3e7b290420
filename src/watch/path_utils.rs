// src/watch/path_utils.rs

use std::path::{Component, Path};

/// Forward-slash form of a relative path, as glob patterns expect.
pub fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// `path` relative to `root` with forward slashes.
///
/// Watcher events may carry a different absolute spelling of the root
/// (symlinked temp dirs, `/private/var` on macOS), so a failed plain
/// `strip_prefix`, or one that leaves `..` in the remainder, is retried on
/// canonical paths. A path that has been deleted cannot be canonicalized;
/// in that case its parent is.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        if rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Some(to_slash(rel));
        }
    }

    let root = root.canonicalize().ok()?;
    if let Ok(canon) = path.canonicalize() {
        return canon.strip_prefix(&root).ok().map(to_slash);
    }

    let parent = path.parent()?.canonicalize().ok()?;
    let rel_parent = parent.strip_prefix(&root).ok()?;
    Some(to_slash(&rel_parent.join(path.file_name()?)))
}
