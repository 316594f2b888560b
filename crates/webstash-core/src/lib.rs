//! webstash - a namespaced JSON key-value store over host storage.
//!
//! Values are stored as JSON under composite keys of the form
//! `<namespace><separator><key>` in one of two backends: a session-scoped
//! one and a persistent one. A namespace can be cleared as a unit, and each
//! store re-emits the host's change notifications through its own
//! subscription surface.
//!
//! ```ignore
//! use webstash_core::{MemoryHost, StoreConfig, WebStorage};
//!
//! let mut storage = WebStorage::new(&MemoryHost::new(), StoreConfig::default());
//! storage.persistent().set(("app", "theme"), "dark")?;
//! let theme: Option<String> = storage.persistent().get(("app", "theme"))?;
//! storage.persistent().clear(Some("app"))?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod key;
pub mod storage;
pub mod store;

pub use backend::{Backend, BackendKind, Host, MemoryArea, MemoryBackend, MemoryHost};
pub use config::StoreConfig;
pub use error::{BackendError, Result, StoreError};
pub use events::{ChangeEvent, Emitter, Event, HandlerId, STORAGE_EVENT};
pub use key::EntryKey;
pub use storage::WebStorage;
pub use store::Store;
