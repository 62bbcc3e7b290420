// src/watch/hash.rs

//! Content hashes used to ignore events that did not change a file.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;

/// blake3 hex digest of a file's contents.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Canonical spelling of `path`, so that seeded paths and watcher events
/// share a key. A deleted file cannot be canonicalized; its parent is.
fn canonical_key(path: &Path) -> PathBuf {
    if let Ok(canon) = path.canonicalize() {
        return canon;
    }
    match (path.parent().and_then(|p| p.canonicalize().ok()), path.file_name()) {
        (Some(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}

/// Last seen content hash per file, kept in memory for the life of the
/// watch process. Keys are canonical paths.
#[derive(Debug, Default)]
pub struct ContentHashes {
    seen: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current contents of `path` and report whether they
    /// differ from the last recorded version.
    ///
    /// A file that cannot be read (deleted, mid-rename) counts as changed
    /// and is forgotten, so its next appearance is also a change.
    pub fn changed(&mut self, path: &Path) -> bool {
        let key = canonical_key(path);
        match compute_file_hash(&key) {
            Ok(hash) => match self.seen.insert(key, hash.clone()) {
                Some(previous) => previous != hash,
                None => true,
            },
            Err(_) => {
                self.seen.remove(&key);
                true
            }
        }
    }

    /// Seed the store without reporting a change, e.g. at watch startup.
    pub fn remember(&mut self, path: &Path) {
        let key = canonical_key(path);
        if let Ok(hash) = compute_file_hash(&key) {
            self.seen.insert(key, hash);
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
