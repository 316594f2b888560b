//! Change notification.
//!
//! Every store owns an [`Emitter`]. Native backend notifications are
//! re-emitted through it as [`STORAGE_EVENT`] so application code has a
//! single channel per backend; application code may also emit its own
//! named events on the same emitter.

pub mod echo;
pub mod emitter;

use crate::backend::BackendKind;

pub use echo::{fingerprint, EchoFilter};
pub use emitter::{Emitter, HandlerId};

/// Name under which native change notifications are re-emitted.
pub const STORAGE_EVENT: &str = "storage";

/// A mutation of a backend, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub backend: BackendKind,
    /// Composite key that changed, or None when the whole backend was cleared.
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// Identifies the context that made the change.
    pub source: String,
}

/// What handlers receive.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    /// Set for events that originate from a backend change.
    pub change: Option<ChangeEvent>,
    /// Arbitrary payload passed to [`Emitter::emit`] by application code.
    pub data: Option<serde_json::Value>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            change: None,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// A [`STORAGE_EVENT`] wrapping a native change.
    pub fn storage(change: ChangeEvent) -> Self {
        Self {
            name: STORAGE_EVENT.to_string(),
            change: Some(change),
            data: None,
        }
    }
}
