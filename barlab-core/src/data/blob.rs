//! Key/value blob stores backing the day cache.
//!
//! Keys are `/`-separated relative paths produced by [`CacheKey`](super::cache::CacheKey).
//! Stores are best-effort: the day cache treats read failures as misses and
//! write failures as warnings.

use crate::error::{BarlabError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Pluggable byte store.
pub trait BlobStore: Send + Sync {
    /// Bytes stored under `key`, or `None` when absent.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `bytes` under `key`, replacing any previous value.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Filesystem store rooted at a directory. Each key is a file path below the root.
///
/// Writes are atomic: write to `.tmp`, then rename into place. Concurrent
/// writers of the same key race benignly; the last rename wins.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for part in key.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return Err(BarlabError::Cache(format!("invalid blob key '{key}'")));
            }
            path.push(part);
        }
        Ok(path)
    }
}

impl BlobStore for FsBlobStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BarlabError::Cache(format!("read {}: {e}", path.display()))),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| BarlabError::Cache(format!("failed to create dir: {e}")))?;
        }

        // Unique temp name so parallel writers never share a temp file.
        let id = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = path.with_extension(format!("{}.{id}.tmp", std::process::id()));
        fs::write(&tmp_path, bytes)
            .map_err(|e| BarlabError::Cache(format!("write {}: {e}", tmp_path.display())))?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            BarlabError::Cache(format!("atomic rename failed: {e}"))
        })
    }
}

/// In-process store. Used by tests and cache-less sessions.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map still holds whole entries; keep using it.
        self.blobs.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_roundtrip_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        assert_eq!(store.read("a/b/c.parquet").unwrap(), None);
        store.write("a/b/c.parquet", b"hello").unwrap();
        assert_eq!(store.read("a/b/c.parquet").unwrap(), Some(b"hello".to_vec()));

        store.write("a/b/c.parquet", b"again").unwrap();
        assert_eq!(store.read("a/b/c.parquet").unwrap(), Some(b"again".to_vec()));
        assert!(dir.path().join("a/b/c.parquet").is_file());
    }

    #[test]
    fn fs_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.write("k/v.parquet", b"x").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path().join("k"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["v.parquet".to_string()]);
    }

    #[test]
    fn fs_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.write("../evil", b"x").is_err());
        assert!(store.read("a//b").is_err());
    }

    #[test]
    fn memory_roundtrip() {
        let store = MemoryBlobStore::new();
        assert!(store.is_empty());
        store.write("k", b"v").unwrap();
        assert_eq!(store.read("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.keys(), vec!["k".to_string()]);
    }
}
