//! Host storage capability.
//!
//! A backend stores raw strings under raw keys. Serialization and namespacing
//! are the [`Store`](crate::Store)'s responsibility, not the backend's; this
//! keeps the backend contract free of serde or any key convention.
//!
//! Implementations: in-memory areas shared between contexts ([`memory`]),
//! a JSON file on disk, browser `localStorage`/`sessionStorage`, etc.

pub mod memory;

use std::fmt;

use crate::error::BackendError;
use crate::events::ChangeEvent;

pub use memory::{MemoryArea, MemoryBackend, MemoryHost};

/// Which of the two independent backends an instance is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Cleared when the browsing session ends.
    Session,
    /// Survives restarts.
    Persistent,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Session => "session",
            BackendKind::Persistent => "persistent",
        }
    }

    /// Parse a backend name. `local` is an alias for `persistent`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "session" => Some(BackendKind::Session),
            "persistent" | "local" => Some(BackendKind::Persistent),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key-value string storage provided by the host.
pub trait Backend {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Read the raw value stored under `key`. Returns None if not found.
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Write `value` under `key`, replacing any existing value.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove_item(&mut self, key: &str) -> Result<(), BackendError>;

    /// Remove every entry.
    fn clear(&mut self) -> Result<(), BackendError>;

    /// Remove each of `keys`, one at a time. Not atomic: an error leaves the
    /// earlier keys removed.
    fn remove_items(&mut self, keys: &[String]) -> Result<(), BackendError> {
        for key in keys {
            self.remove_item(key)?;
        }
        Ok(())
    }

    /// Number of entries.
    fn len(&self) -> Result<usize, BackendError>;

    /// Key at position `index` in the backend's key index.
    ///
    /// Positions shift as entries are added or removed.
    fn key(&self, index: usize) -> Result<Option<String>, BackendError>;

    /// Drain native change notifications waiting for this context.
    fn take_changes(&mut self) -> Vec<ChangeEvent>;

    fn is_empty(&self) -> Result<bool, BackendError> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of every key currently stored.
    ///
    /// Callers that remove entries must iterate this snapshot, never the
    /// live index, since positions shift on removal. The default walks
    /// [`Backend::key`]; backends with a cheaper enumeration override it.
    fn keys(&self) -> Result<Vec<String>, BackendError> {
        let len = self.len()?;
        let mut keys = Vec::with_capacity(len);
        for index in 0..len {
            if let Some(key) = self.key(index)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// The environment a [`WebStorage`](crate::WebStorage) runs in.
///
/// A host missing either backend puts both stores into degraded mode.
pub trait Host {
    fn session_backend(&self) -> Option<Box<dyn Backend>>;

    fn persistent_backend(&self) -> Option<Box<dyn Backend>>;
}
