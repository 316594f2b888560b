//! Persistent backend that keeps entries in a JSON document on disk.
//!
//! The whole document is rewritten on every mutation: written to a sibling
//! temporary file, then renamed over the original. Another process editing
//! the same file is not observed, so no change notifications are produced.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;
use webstash_core::{Backend, BackendError, BackendKind, ChangeEvent};

pub struct FileBackend {
    path: PathBuf,
    kind: BackendKind,
    entries: BTreeMap<String, String>,
}

impl FileBackend {
    /// Open the document at `path`. A missing file is an empty backend.
    pub fn open(path: impl Into<PathBuf>, kind: BackendKind) -> Result<Self, BackendError> {
        let path = path.into();
        let entries: BTreeMap<String, String> = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| BackendError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = entries.len(), "opened file backend");
        Ok(Self { path, kind, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text =
            serde_json::to_string_pretty(&self.entries).map_err(|e| BackendError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Backend for FileBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        let old = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist() {
            match old {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), BackendError> {
        let Some(old) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.persist() {
            self.entries.insert(key.to_string(), old);
            return Err(e);
        }
        Ok(())
    }

    /// Removes every key and rewrites the document once.
    fn remove_items(&mut self, keys: &[String]) -> Result<(), BackendError> {
        let removed: Vec<(String, String)> = keys
            .iter()
            .filter_map(|k| self.entries.remove_entry(k.as_str()))
            .collect();
        if removed.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.persist() {
            self.entries.extend(removed);
            return Err(e);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), BackendError> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let old = std::mem::take(&mut self.entries);
        if let Err(e) = self.persist() {
            self.entries = old;
            return Err(e);
        }
        Ok(())
    }

    fn len(&self) -> Result<usize, BackendError> {
        Ok(self.entries.len())
    }

    fn key(&self, index: usize) -> Result<Option<String>, BackendError> {
        Ok(self.entries.keys().nth(index).cloned())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn take_changes(&mut self) -> Vec<ChangeEvent> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webstash_core::{Store, StoreConfig};

    #[test]
    fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("persistent.json");

        let mut backend = FileBackend::open(&path, BackendKind::Persistent).unwrap();
        backend.set_item("app:theme", "\"dark\"").unwrap();
        backend.set_item("app:size", "14").unwrap();
        backend.remove_item("app:size").unwrap();
        drop(backend);

        let reopened = FileBackend::open(&path, BackendKind::Persistent).unwrap();
        assert_eq!(reopened.keys().unwrap(), ["app:theme"]);
        assert_eq!(reopened.get_item("app:theme").unwrap().as_deref(), Some("\"dark\""));
    }

    #[test]
    fn missing_and_empty_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing =
            FileBackend::open(dir.path().join("none.json"), BackendKind::Persistent).unwrap();
        assert!(missing.is_empty().unwrap());

        let blank = dir.path().join("blank.json");
        fs::write(&blank, "  \n").unwrap();
        let backend = FileBackend::open(&blank, BackendKind::Persistent).unwrap();
        assert!(backend.is_empty().unwrap());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2").unwrap();
        let err = FileBackend::open(&path, BackendKind::Persistent).err().unwrap();
        assert!(matches!(err, BackendError::Corrupt { .. }));
    }

    #[test]
    fn clear_writes_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let mut backend = FileBackend::open(&path, BackendKind::Persistent).unwrap();
        backend.set_item("k", "1").unwrap();
        backend.clear().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "{}");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn remove_items_skips_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let mut backend = FileBackend::open(&path, BackendKind::Persistent).unwrap();
        backend.set_item("a", "1").unwrap();
        backend.set_item("b", "2").unwrap();
        backend.set_item("c", "3").unwrap();
        backend
            .remove_items(&["a".to_string(), "c".to_string(), "zz".to_string()])
            .unwrap();

        let reopened = FileBackend::open(&path, BackendKind::Persistent).unwrap();
        assert_eq!(reopened.keys().unwrap(), ["b"]);
    }

    #[test]
    fn store_scoped_clear_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let backend = FileBackend::open(&path, BackendKind::Persistent).unwrap();
        let mut store = Store::new(Box::new(backend), &StoreConfig::default());
        store.set(("foo", "a"), &1).unwrap();
        store.set(("foobar", "b"), &2).unwrap();
        store.clear(Some("foo")).unwrap();

        let reopened = FileBackend::open(&path, BackendKind::Persistent).unwrap();
        assert_eq!(reopened.keys().unwrap(), ["foobar:b"]);
    }
}
