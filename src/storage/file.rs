//! File-based progress storage.
//!
//! All keys live in a single JSON object on disk (`~/.levelup/progress.json`
//! by default). The file is read once when the store is opened and rewritten
//! on every mutation. Atomic writes are achieved via temp file + rename.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::config::default_progress_path;
use crate::error::{LevelUpError, Result};
use crate::storage::KeyValueStore;

/// File-based key-value store.
#[derive(Debug)]
pub struct FileStore {
    /// Path of the JSON file holding every key.
    path: PathBuf,
    /// In-memory copy of the file contents.
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at the default location.
    ///
    /// Uses `~/.levelup/progress.json` or `$LEVELUP_HOME/progress.json`.
    pub fn new() -> Result<Self> {
        let path = default_progress_path().ok_or_else(|| {
            LevelUpError::config("Could not determine progress file location (no home directory)")
        })?;
        Self::open(path)
    }

    /// Open the store backed by the given file.
    ///
    /// The parent directory is created if needed. A missing file is an empty
    /// store; a file that is not a JSON object of strings is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| LevelUpError::storage(parent, e))?;
            }
        }

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| LevelUpError::storage(&path, e))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path for a temp file used during atomic writes.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "progress.json".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    /// Write all entries atomically using temp file + rename.
    ///
    /// Callers commit to `entries` only after this succeeds, so a failed
    /// write leaves the in-memory view matching the file.
    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let temp_path = self.temp_path();
        let json = serde_json::to_string_pretty(entries)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| LevelUpError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| LevelUpError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| LevelUpError::storage(&temp_path, e))?;
        }

        // Rename temp file to final path (atomic on POSIX)
        fs::rename(&temp_path, &self.path).map_err(|e| LevelUpError::storage(&self.path, e))?;

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
