//! JSON file store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::KeyValueStore;
use crate::Result;
use crate::error::StorageError;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// A [`KeyValueStore`] persisted as one JSON object file.
///
/// Every write reads the current file, applies the change and replaces the
/// file through a rename, so a multi-key write is never half applied. The
/// file holds bearer tokens and is created with mode `0600` on Unix.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the file at `path`. Nothing is touched until
    /// the first read or write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let json = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&json).map_err(|e| {
            StorageError::Corrupt {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(entries).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let staging = self.path.with_extension("tmp");
        fs::write(&staging, json).map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&staging)
                .map_err(|e| self.io_error(e))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&staging, perms).map_err(|e| self.io_error(e))?;
        }

        fs::rename(&staging, &self.path).map_err(|e| self.io_error(e))?;
        trace!(path = %self.path.display(), keys = entries.len(), "store written");
        Ok(())
    }

    fn io_error(&self, err: std::io::Error) -> crate::Error {
        StorageError::Io {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
        .into()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<()> {
        let mut entries = self.load()?;
        for (key, value) in pairs {
            entries.insert((*key).to_string(), (*value).to_string());
        }
        self.persist(&entries)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.load()?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() == before {
            return Ok(());
        }
        debug!(path = %self.path.display(), "removing keys from store");
        self.persist(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        assert!(store.get("access_token").unwrap().is_none());
        store.remove("access_token").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn values_survive_a_new_handle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        FileStore::new(&path)
            .set_many(&[("access_token", "a.b.c"), ("refresh_token", "d.e.f")])
            .unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("access_token").unwrap().as_deref(),
            Some("a.b.c")
        );
        assert_eq!(
            reopened.get("refresh_token").unwrap().as_deref(),
            Some("d.e.f")
        );
    }

    #[test]
    fn remove_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store
            .set_many(&[("access_token", "a.b.c"), ("lang", "en")])
            .unwrap();

        store.remove_many(&["access_token", "refresh_token"]).unwrap();

        assert!(store.get("access_token").unwrap().is_none());
        assert_eq!(store.get("lang").unwrap().as_deref(), Some("en"));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "[not a map").unwrap();

        let err = FileStore::new(&path).get("lang").unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store.set("access_token", "a.b.c").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
